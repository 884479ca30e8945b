//! Gateway configuration: routing tables, retry constants, attribution and Bedrock settings.
//!
//! Loaded once (built-in defaults, a YAML file, or env) and then shared read-only.
//!
//! | Env var | Effect |
//! |---------|--------|
//! | `AI_GATEWAY_CONFIG` | Path to a YAML file replacing the built-in defaults |
//! | `OR_SITE_URL` | OpenRouter `HTTP-Referer` attribution |
//! | `OR_APP_NAME` | OpenRouter `X-Title` attribution |
//! | `AI_GATEWAY_BEDROCK_PROFILE_PREFIX` | ARN prefix for derived Bedrock inference profiles |

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::ProviderFamily;
use crate::{Error, ErrorContext, Result};

/// Built-in defaults, parsed once.
pub static DEFAULT_CONFIG: Lazy<GatewayConfig> = Lazy::new(GatewayConfig::builtin);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub from: String,
    pub to: String,
}

impl AliasEntry {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Route used when an identifier contains any of `contains` (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyDefault {
    pub contains: Vec<String>,
    pub route: String,
}

impl FamilyDefault {
    pub fn new(contains: &[&str], route: impl Into<String>) -> Self {
        Self {
            contains: contains.iter().map(|s| s.to_string()).collect(),
            route: route.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreemptiveChainConfig {
    pub name: String,
    #[serde(default)]
    pub match_substrings: Vec<String>,
    #[serde(default)]
    pub match_exact: Vec<String>,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactiveChainConfig {
    pub family: ProviderFamily,
    pub name: String,
    pub candidates: Vec<String>,
}

/// Retry controller constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicyConfig {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub rate_limit_delay_ms: u64,
    /// Ceiling for an upstream `Retry-After` hint.
    pub max_rate_limit_delay_ms: u64,
    /// Pause between fallback candidates.
    pub candidate_delay_ms: u64,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_delay_ms: 100,
            rate_limit_delay_ms: 30_000,
            max_rate_limit_delay_ms: 120_000,
            candidate_delay_ms: 0,
        }
    }
}

impl RetryPolicyConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }

    pub fn max_rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.max_rate_limit_delay_ms)
    }

    pub fn candidate_delay(&self) -> Duration {
        Duration::from_millis(self.candidate_delay_ms)
    }
}

/// OpenRouter attribution headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionConfig {
    pub site_url: Option<String>,
    pub app_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BedrockConfig {
    /// Prepended to derived profile ids, e.g. `arn:aws:bedrock:us-west-2:123456789012:inference-profile/`.
    pub inference_profile_prefix: Option<String>,
    /// Routing-id fragments whose Bedrock targets need an inference profile.
    pub profile_models: Vec<String>,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            inference_profile_prefix: None,
            profile_models: vec!["anthropic.claude-3-7-sonnet".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Ordered: substring matching walks this list front to back.
    pub aliases: Vec<AliasEntry>,
    pub family_defaults: Vec<FamilyDefault>,
    pub passthrough_prefixes: Vec<String>,
    pub preemptive_chains: Vec<PreemptiveChainConfig>,
    pub reactive_chains: Vec<ReactiveChainConfig>,
    pub retry: RetryPolicyConfig,
    pub attribution: AttributionConfig,
    pub bedrock: BedrockConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        DEFAULT_CONFIG.clone()
    }
}

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl GatewayConfig {
    fn builtin() -> Self {
        let aliases = [
            ("claude-sonnet-4", "openrouter/anthropic/claude-sonnet-4"),
            ("anthropic/claude-sonnet-4-20250514", "openrouter/anthropic/claude-sonnet-4"),
            ("anthropic/claude-sonnet-4", "openrouter/anthropic/claude-sonnet-4"),
            ("claude-3.5-sonnet", "openrouter/anthropic/claude-3.5-sonnet"),
            ("anthropic/claude-3.5-sonnet", "openrouter/anthropic/claude-3.5-sonnet"),
            ("kimi-k2", "openrouter/moonshotai/kimi-k2"),
            ("moonshotai/kimi-k2", "openrouter/moonshotai/kimi-k2"),
            ("qwen3", "openrouter/qwen/qwen3-235b-a22b"),
            ("qwen3-32b", "openrouter/qwen/qwen3-32b"),
            ("qwen3-30b", "openrouter/qwen/qwen3-30b-a3b"),
            ("qwen3-30b-free", "openrouter/qwen/qwen3-30b-a3b:free"),
            ("qwen/qwen3-32b", "openrouter/qwen/qwen3-32b"),
            ("qwen/qwen3-30b-a3b", "openrouter/qwen/qwen3-30b-a3b"),
            ("qwen/qwen3-30b-a3b:free", "openrouter/qwen/qwen3-30b-a3b:free"),
            ("qwen/qwen3-235b-a22b", "openrouter/qwen/qwen3-235b-a22b"),
        ]
        .into_iter()
        .map(|(from, to)| AliasEntry::new(from, to))
        .collect();

        let family_defaults = vec![
            FamilyDefault::new(&["claude", "anthropic"], "openrouter/anthropic/claude-sonnet-4"),
            FamilyDefault::new(&["xai", "grok"], "openrouter/x-ai/grok-4"),
            FamilyDefault::new(&["kimi", "moonshot"], "openrouter/moonshotai/kimi-k2"),
            FamilyDefault::new(&["qwen"], "openrouter/qwen/qwen3-32b"),
        ];

        let preemptive_chains = vec![PreemptiveChainConfig {
            name: "claude-sonnet-4".to_string(),
            match_substrings: strings(&["claude-sonnet-4"]),
            match_exact: strings(&["anthropic/claude-sonnet-4-20250514"]),
            candidates: strings(&[
                "openrouter/anthropic/claude-sonnet-4",
                "groq/claude-sonnet-4",
                "anthropic/claude-sonnet-4-20250514",
                "openrouter/anthropic/claude-3.5-sonnet",
                "openrouter/qwen/qwen3-32b",
                "openrouter/x-ai/grok-2",
            ]),
        }];

        let reactive_chains = vec![ReactiveChainConfig {
            family: ProviderFamily::Anthropic,
            name: "anthropic-overload".to_string(),
            candidates: strings(&[
                "openrouter/anthropic/claude-3.5-sonnet",
                "openrouter/qwen/qwen3-32b",
                "openrouter/x-ai/grok-2",
                "openrouter/deepseek/deepseek-v3",
            ]),
        }];

        Self {
            aliases,
            family_defaults,
            passthrough_prefixes: strings(&["openrouter/"]),
            preemptive_chains,
            reactive_chains,
            retry: RetryPolicyConfig::default(),
            attribution: AttributionConfig::default(),
            bedrock: BedrockConfig::default(),
        }
    }

    /// Parse YAML. Omitted sections keep their built-in defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).map_err(|e| {
            Error::configuration_with_context(
                "failed to parse gateway config",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config_loader"),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::configuration_with_context(
                format!("failed to read gateway config '{}'", path.display()),
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config_loader")
            )
        })?;
        Self::from_yaml_str(&content)
    }

    /// File from `AI_GATEWAY_CONFIG` (or built-in defaults), then env overrides.
    pub async fn from_env() -> Result<Self> {
        let mut config = match std::env::var("AI_GATEWAY_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim()).await?,
            _ => Self::default(),
        };

        if let Ok(site) = std::env::var("OR_SITE_URL") {
            if !site.is_empty() {
                config.attribution.site_url = Some(site);
            }
        }
        if let Ok(app) = std::env::var("OR_APP_NAME") {
            if !app.is_empty() {
                config.attribution.app_name = Some(app);
            }
        }
        if let Ok(prefix) = std::env::var("AI_GATEWAY_BEDROCK_PROFILE_PREFIX") {
            if !prefix.is_empty() {
                config.bedrock.inference_profile_prefix = Some(prefix);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let retry = &self.retry;
        if retry.max_attempts == 0 {
            return Err(Error::configuration_with_context(
                "max_attempts must be at least 1",
                ErrorContext::new()
                    .with_field_path("retry.max_attempts")
                    .with_source("config_validator"),
            ));
        }
        if retry.rate_limit_delay_ms <= retry.retry_delay_ms {
            return Err(Error::configuration_with_context(
                "rate_limit_delay_ms must be strictly greater than retry_delay_ms",
                ErrorContext::new()
                    .with_field_path("retry.rate_limit_delay_ms")
                    .with_details(format!(
                        "rate_limit_delay_ms={}, retry_delay_ms={}",
                        retry.rate_limit_delay_ms, retry.retry_delay_ms
                    ))
                    .with_source("config_validator"),
            ));
        }
        if retry.max_rate_limit_delay_ms < retry.rate_limit_delay_ms {
            return Err(Error::configuration_with_context(
                "max_rate_limit_delay_ms must not be below rate_limit_delay_ms",
                ErrorContext::new()
                    .with_field_path("retry.max_rate_limit_delay_ms")
                    .with_source("config_validator"),
            ));
        }

        for (i, alias) in self.aliases.iter().enumerate() {
            if alias.from.is_empty() || alias.to.is_empty() {
                return Err(Error::configuration_with_context(
                    "alias entries need non-empty 'from' and 'to'",
                    ErrorContext::new()
                        .with_field_path(format!("aliases[{}]", i))
                        .with_source("config_validator"),
                ));
            }
        }

        for (i, chain) in self.preemptive_chains.iter().enumerate() {
            if chain.match_substrings.is_empty() && chain.match_exact.is_empty() {
                return Err(Error::configuration_with_context(
                    format!("pre-emptive chain '{}' has no trigger", chain.name),
                    ErrorContext::new()
                        .with_field_path(format!("preemptive_chains[{}]", i))
                        .with_source("config_validator"),
                ));
            }
        }

        let mut families = std::collections::HashSet::new();
        for (i, chain) in self.reactive_chains.iter().enumerate() {
            if !families.insert(chain.family) {
                return Err(Error::configuration_with_context(
                    format!("duplicate reactive chain for family '{}'", chain.family),
                    ErrorContext::new()
                        .with_field_path(format!("reactive_chains[{}].family", i))
                        .with_source("config_validator"),
                ));
            }
        }

        if let Some(site) = &self.attribution.site_url {
            url::Url::parse(site).map_err(|e| {
                Error::configuration_with_context(
                    "attribution site_url is not a valid URL",
                    ErrorContext::new()
                        .with_field_path("attribution.site_url")
                        .with_details(e.to_string())
                        .with_source("config_validator"),
                )
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_defaults_match_routing_tables() {
        let cfg = GatewayConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.retry.max_attempts, 2);
        assert_eq!(cfg.retry.retry_delay(), Duration::from_millis(100));
        assert_eq!(cfg.retry.rate_limit_delay(), Duration::from_secs(30));
        assert_eq!(cfg.aliases[0].from, "claude-sonnet-4");
        assert_eq!(cfg.reactive_chains[0].candidates.len(), 4);
        assert_eq!(cfg.preemptive_chains[0].candidates.len(), 6);
    }

    #[test]
    fn yaml_overrides_only_named_sections() {
        let yaml = r#"
retry:
  max_attempts: 4
  retry_delay_ms: 5
  rate_limit_delay_ms: 50
attribution:
  site_url: "https://example.com"
  app_name: "Demo"
"#;
        let cfg = GatewayConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.retry.max_attempts, 4);
        assert_eq!(cfg.retry.candidate_delay_ms, 0);
        assert_eq!(cfg.attribution.app_name.as_deref(), Some("Demo"));
        assert_eq!(cfg.aliases, GatewayConfig::default().aliases);
    }

    #[test]
    fn reactive_chain_family_parses_lowercase() {
        let yaml = r#"
reactive_chains:
  - family: openai
    name: openai-backup
    candidates: ["openrouter/openai/gpt-4o", "groq/llama-3.3-70b-versatile"]
"#;
        let cfg = GatewayConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.reactive_chains.len(), 1);
        assert_eq!(cfg.reactive_chains[0].family, ProviderFamily::OpenAi);
    }

    #[test]
    fn rate_limit_delay_must_exceed_retry_delay() {
        let yaml = "retry:\n  retry_delay_ms: 100\n  rate_limit_delay_ms: 100\n";
        let err = GatewayConfig::from_yaml_str(yaml).unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("retry.rate_limit_delay_ms")
        );
    }

    #[test]
    fn retry_after_ceiling_cannot_undercut_the_long_delay() {
        let yaml = "retry:\n  rate_limit_delay_ms: 5000\n  max_rate_limit_delay_ms: 1000\n";
        let err = GatewayConfig::from_yaml_str(yaml).unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("retry.max_rate_limit_delay_ms")
        );
    }

    #[test]
    fn invalid_site_url_rejected() {
        let mut cfg = GatewayConfig::default();
        cfg.attribution.site_url = Some("not a url".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn malformed_yaml_is_configuration_error() {
        let err = GatewayConfig::from_yaml_str("retry: [1, 2").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_configuration_error() {
        let err = GatewayConfig::from_file("/definitely/not/here.yaml")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to read gateway config"));
    }
}
