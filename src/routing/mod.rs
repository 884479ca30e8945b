//! Model routing: provider families, alias resolution and fallback chains.
//!
//! This module is intentionally **pure logic**: it doesn't perform network calls and holds no
//! mutable state. Everything here is derived from the static [`GatewayConfig`] once, when the
//! gateway is built.
//!
//! Design note:
//! - Provider-specific behavior hangs off the closed [`ProviderFamily`] enum (one variant per
//!   upstream route) so adapters and classifiers never branch on raw strings.
//! - Model-lineage rules (Claude, xAI) apply across routes, e.g. Claude served via OpenRouter
//!   still gets Claude's cache-control and reasoning rules.

pub mod alias;
pub mod chain;
pub mod config;

pub use alias::AliasResolver;
pub use chain::{FallbackChain, PreemptiveRule};
pub use config::{GatewayConfig, RetryPolicyConfig};

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Distinguishable upstream route with its own parameter dialect and failure signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFamily {
    Anthropic,
    Bedrock,
    OpenRouter,
    OpenAi,
    Xai,
    Groq,
    Generic,
}

impl ProviderFamily {
    /// Derive the family from a routing identifier (`"<route>/<model>"` or a bare model name).
    pub fn from_routing_id(routing_id: &str) -> Self {
        if let Some((prefix, _)) = routing_id.split_once('/') {
            match prefix.to_ascii_lowercase().as_str() {
                "anthropic" => return Self::Anthropic,
                "bedrock" => return Self::Bedrock,
                "openrouter" => return Self::OpenRouter,
                "openai" => return Self::OpenAi,
                "xai" => return Self::Xai,
                "groq" => return Self::Groq,
                _ => {}
            }
        }

        let lower = routing_id.to_ascii_lowercase();
        if lower.starts_with("claude") {
            Self::Anthropic
        } else if lower.starts_with("gpt-") || lower.starts_with("o1") || lower.starts_with("o3") {
            Self::OpenAi
        } else if lower.starts_with("grok") {
            Self::Xai
        } else {
            Self::Generic
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Bedrock => "bedrock",
            Self::OpenRouter => "openrouter",
            Self::OpenAi => "openai",
            Self::Xai => "xai",
            Self::Groq => "groq",
            Self::Generic => "generic",
        }
    }

    /// Environment variable holding this family's API key. Bedrock signs with AWS credentials.
    pub fn credential_env(&self) -> Option<&'static str> {
        match self {
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::OpenRouter => Some("OPENROUTER_API_KEY"),
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Xai => Some("XAI_API_KEY"),
            Self::Groq => Some("GROQ_API_KEY"),
            Self::Bedrock | Self::Generic => None,
        }
    }

    /// Output-token field for this route, or `None` when the bound must be omitted.
    pub fn token_limit_field(&self, routing_id: &str) -> Option<&'static str> {
        match self {
            // Inference profiles reject max_tokens / max_tokens_to_sample for 3.7.
            Self::Bedrock if routing_id.contains("claude-3-7") => None,
            _ if model_segment(routing_id).starts_with("o1") => Some("max_completion_tokens"),
            _ => Some("max_tokens"),
        }
    }

    /// Message fragments identifying a capacity-exhaustion failure from this route.
    pub fn overload_signatures(&self) -> &'static [&'static str] {
        match self {
            Self::Anthropic => &["overloaded_error", "overloaded"],
            _ => &[],
        }
    }

    /// Non-standard status some routes use for overload.
    pub fn overload_status(&self) -> Option<u16> {
        match self {
            Self::Anthropic => Some(529),
            _ => None,
        }
    }

    pub fn sends_attribution_headers(&self) -> bool {
        matches!(self, Self::OpenRouter)
    }

    pub fn accepts_inference_profile(&self) -> bool {
        matches!(self, Self::Bedrock)
    }
}

impl fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a target treats extended reasoning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasoningRule {
    Unsupported,
    Effort,
    /// Effort level plus temperature pinned to the maximum. Provider constraint, not tunable.
    EffortWithMaxTemperature,
}

/// Concrete `(family, routing identifier)` pair a request is dispatched against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedTarget {
    pub family: ProviderFamily,
    pub routing_id: String,
}

impl ResolvedTarget {
    pub fn new(routing_id: impl Into<String>) -> Self {
        let routing_id = routing_id.into();
        Self {
            family: ProviderFamily::from_routing_id(&routing_id),
            routing_id,
        }
    }

    pub fn is_claude_lineage(&self) -> bool {
        let lower = self.routing_id.to_ascii_lowercase();
        lower.contains("claude") || lower.contains("anthropic")
    }

    pub fn is_xai_lineage(&self) -> bool {
        self.family == ProviderFamily::Xai || self.routing_id.to_ascii_lowercase().contains("xai")
    }

    pub fn supports_prompt_cache(&self) -> bool {
        self.is_claude_lineage()
    }

    /// Family whose overload signatures and reactive chain apply to this target.
    ///
    /// Claude fails the way Anthropic does whichever route serves it, so a Claude model behind
    /// OpenRouter still reports `Overloaded` and still escalates to the Anthropic chain.
    pub fn failure_family(&self) -> ProviderFamily {
        if self.is_claude_lineage() && self.family != ProviderFamily::Bedrock {
            ProviderFamily::Anthropic
        } else {
            self.family
        }
    }

    pub fn reasoning_rule(&self) -> ReasoningRule {
        if self.is_claude_lineage() {
            ReasoningRule::EffortWithMaxTemperature
        } else if self.is_xai_lineage() {
            ReasoningRule::Effort
        } else {
            ReasoningRule::Unsupported
        }
    }
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.routing_id)
    }
}

fn model_segment(routing_id: &str) -> &str {
    routing_id.rsplit('/').next().unwrap_or(routing_id)
}

/// Compiled, read-only routing state derived from a [`GatewayConfig`].
#[derive(Debug, Clone)]
pub struct RoutingTable {
    resolver: AliasResolver,
    preemptive: Vec<PreemptiveRule>,
    reactive: HashMap<ProviderFamily, FallbackChain>,
}

impl RoutingTable {
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        config.validate()?;

        let resolver = AliasResolver::from_config(config);
        let preemptive = config
            .preemptive_chains
            .iter()
            .map(PreemptiveRule::from_config)
            .collect();
        let reactive = config
            .reactive_chains
            .iter()
            .map(|c| (c.family, FallbackChain::new(&c.name, &c.candidates)))
            .collect();

        Ok(Self {
            resolver,
            preemptive,
            reactive,
        })
    }

    pub fn resolve(&self, model: &str) -> ResolvedTarget {
        self.resolver.resolve_target(model)
    }

    /// First pre-emptive chain whose trigger matches the requested identifier.
    pub fn preemptive_chain(&self, requested: &str) -> Option<&FallbackChain> {
        self.preemptive
            .iter()
            .find(|r| r.matches(requested))
            .map(|r| &r.chain)
    }

    pub fn reactive_chain(&self, family: ProviderFamily) -> Option<&FallbackChain> {
        self.reactive.get(&family)
    }

    /// Reactive chain for a target: its own route first, then its failure family.
    pub fn reactive_chain_for(&self, target: &ResolvedTarget) -> Option<&FallbackChain> {
        self.reactive_chain(target.family)
            .or_else(|| self.reactive_chain(target.failure_family()))
    }
}
