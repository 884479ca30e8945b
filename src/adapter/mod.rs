//! 参数适配模块：将统一请求转换为特定提供商的参数形态。
//!
//! # Parameter Adapter
//!
//! Turns a [`CanonicalRequest`] into the wire parameters for one [`ResolvedTarget`].
//! Every dispatch attempt calls [`adapt`] again so that header injection and cache-control
//! annotation can never accumulate across retries or fallback candidates.
//!
//! | Rule | Applies to | Effect |
//! |------|------------|--------|
//! | Token limit | Bedrock Claude 3.7 | bound omitted |
//! | Token limit | `o1` models | `max_completion_tokens` |
//! | Tools | non-empty tool list | `tools` + `tool_choice` |
//! | Extended output | Claude lineage | `anthropic-beta` header |
//! | Attribution | OpenRouter | `HTTP-Referer` / `X-Title` headers |
//! | Inference profile | Bedrock Claude 3.7 Sonnet | derived `model_id` |
//! | Prompt cache | Claude lineage | first 4 text blocks marked ephemeral |
//! | Reasoning | Claude lineage | `reasoning_effort`, temperature pinned to 1.0 |
//! | Reasoning | xAI lineage | `reasoning_effort` |

pub mod cache_control;

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use crate::routing::{GatewayConfig, ReasoningRule, ResolvedTarget};
use crate::types::CanonicalRequest;
use crate::{Error, ErrorContext, Result};

pub use cache_control::{apply_cache_control, CACHE_CONTROL_QUOTA};

/// Extended-output capability header sent to Claude-lineage targets.
pub const ANTHROPIC_BETA_HEADER: (&str, &str) = ("anthropic-beta", "output-128k-2025-02-19");

/// Claude's maximum sampling temperature. Required whenever extended reasoning is on.
pub const CLAUDE_THINKING_TEMPERATURE: f64 = 1.0;

/// Provider-specific parameters for exactly one dispatch attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptedParameters {
    pub target: ResolvedTarget,
    /// OpenAI-compatible chat-completions body.
    pub body: Value,
    pub headers: BTreeMap<String, String>,
    pub stream: bool,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
}

impl AdaptedParameters {
    pub fn model(&self) -> &str {
        &self.target.routing_id
    }

    pub fn temperature(&self) -> Option<f64> {
        self.body.get("temperature").and_then(Value::as_f64)
    }
}

/// Build fresh provider parameters from the canonical request.
pub fn adapt(
    request: &CanonicalRequest,
    target: &ResolvedTarget,
    config: &GatewayConfig,
) -> Result<AdaptedParameters> {
    request.validate()?;

    let routing_id = target.routing_id.as_str();
    let family = target.family;
    let mut body = Map::new();
    let mut headers = BTreeMap::new();

    let mut messages = request.messages.clone();
    if target.supports_prompt_cache() {
        let marked = apply_cache_control(&mut messages);
        debug!(model = routing_id, marked, "applied prompt cache control");
    }

    body.insert("model".into(), json!(routing_id));
    body.insert("messages".into(), to_value(&messages, "messages")?);
    body.insert("temperature".into(), json!(request.temperature));
    if let Some(top_p) = request.top_p {
        body.insert("top_p".into(), json!(top_p));
    }
    body.insert("stream".into(), json!(request.stream));
    if let Some(format) = &request.response_format {
        body.insert("response_format".into(), format.clone());
    }

    if let Some(limit) = request.max_tokens {
        match family.token_limit_field(routing_id) {
            Some(field) => {
                body.insert(field.into(), json!(limit));
            }
            None => debug!(model = routing_id, "omitting max_tokens for this route"),
        }
    }

    if let Some(tools) = request.tools.as_ref().filter(|t| !t.is_empty()) {
        body.insert("tools".into(), to_value(tools, "tools")?);
        body.insert("tool_choice".into(), to_value(&request.tool_choice, "tool_choice")?);
        debug!(model = routing_id, tools = tools.len(), "added tools to parameters");
    }

    if target.is_claude_lineage() {
        headers.insert(
            ANTHROPIC_BETA_HEADER.0.to_string(),
            ANTHROPIC_BETA_HEADER.1.to_string(),
        );
    }

    if family.sends_attribution_headers() {
        if let Some(site) = &config.attribution.site_url {
            headers.insert("HTTP-Referer".into(), site.clone());
        }
        if let Some(app) = &config.attribution.app_name {
            headers.insert("X-Title".into(), app.clone());
        }
    }

    if let Some(profile) = request
        .inference_profile
        .clone()
        .or_else(|| derive_inference_profile(target, config))
    {
        debug!(model = routing_id, model_id = profile.as_str(), "set inference profile");
        body.insert("model_id".into(), json!(profile));
    }

    if request.enable_thinking {
        let effort = request.reasoning_effort.as_str();
        match target.reasoning_rule() {
            ReasoningRule::EffortWithMaxTemperature => {
                body.insert("reasoning_effort".into(), json!(effort));
                body.insert("temperature".into(), json!(CLAUDE_THINKING_TEMPERATURE));
                debug!(model = routing_id, effort, "thinking enabled, temperature pinned");
            }
            ReasoningRule::Effort => {
                body.insert("reasoning_effort".into(), json!(effort));
                debug!(model = routing_id, effort, "thinking enabled");
            }
            ReasoningRule::Unsupported => {
                debug!(model = routing_id, "thinking requested but unsupported by route")
            }
        }
    }

    Ok(AdaptedParameters {
        target: target.clone(),
        body: Value::Object(body),
        headers,
        stream: request.stream,
        api_key: request.api_key.clone(),
        api_base: request.api_base.clone(),
    })
}

/// Cross-region inference profile for Bedrock models that cannot be invoked on demand.
fn derive_inference_profile(target: &ResolvedTarget, config: &GatewayConfig) -> Option<String> {
    if !target.family.accepts_inference_profile() {
        return None;
    }
    let routing_id = target.routing_id.as_str();
    if !config
        .bedrock
        .profile_models
        .iter()
        .any(|m| routing_id.contains(m.as_str()))
    {
        return None;
    }
    let model = routing_id.strip_prefix("bedrock/").unwrap_or(routing_id);
    let prefix = config.bedrock.inference_profile_prefix.as_deref().unwrap_or("");
    Some(format!("{}us.{}", prefix, model))
}

fn to_value<T: serde::Serialize>(value: &T, field: &str) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| {
        Error::configuration_with_context(
            "failed to serialize request field",
            ErrorContext::new()
                .with_field_path(format!("request.{}", field))
                .with_details(e.to_string())
                .with_source("parameter_adapter"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, ReasoningEffort, ToolDefinition};

    fn request(model: &str) -> CanonicalRequest {
        CanonicalRequest::new(model, vec![Message::system("sys"), Message::user("hi")])
    }

    fn adapt_for(req: &CanonicalRequest, routing_id: &str) -> AdaptedParameters {
        adapt(req, &ResolvedTarget::new(routing_id), &GatewayConfig::default()).unwrap()
    }

    #[test]
    fn copies_core_fields() {
        let req = request("openai/gpt-4o").temperature(0.3).top_p(0.9).max_tokens(256);
        let p = adapt_for(&req, "openai/gpt-4o");
        assert_eq!(p.body["model"], "openai/gpt-4o");
        assert_eq!(p.body["temperature"], 0.3);
        assert_eq!(p.body["top_p"], 0.9);
        assert_eq!(p.body["max_tokens"], 256);
        assert_eq!(p.body["stream"], false);
        assert_eq!(p.body["messages"][1], json!({"role": "user", "content": "hi"}));
        assert!(p.headers.is_empty());
        assert!(p.body.get("reasoning_effort").is_none());
    }

    #[test]
    fn bedrock_claude_37_omits_token_bound_and_derives_profile() {
        let id = "bedrock/anthropic.claude-3-7-sonnet-20250219-v1:0";
        let p = adapt_for(&request(id).max_tokens(1000), id);
        assert!(p.body.get("max_tokens").is_none());
        assert!(p.body.get("max_completion_tokens").is_none());
        assert_eq!(p.body["model_id"], "us.anthropic.claude-3-7-sonnet-20250219-v1:0");
    }

    #[test]
    fn caller_profile_wins_and_prefix_applies_to_derived() {
        let id = "bedrock/anthropic.claude-3-7-sonnet-20250219-v1:0";
        let p = adapt_for(&request(id).inference_profile("arn:custom"), id);
        assert_eq!(p.body["model_id"], "arn:custom");

        let mut config = GatewayConfig::default();
        config.bedrock.inference_profile_prefix =
            Some("arn:aws:bedrock:us-west-2:111122223333:inference-profile/".into());
        let p = adapt(&request(id), &ResolvedTarget::new(id), &config).unwrap();
        assert_eq!(
            p.body["model_id"],
            "arn:aws:bedrock:us-west-2:111122223333:inference-profile/us.anthropic.claude-3-7-sonnet-20250219-v1:0"
        );
    }

    #[test]
    fn o1_uses_max_completion_tokens() {
        let p = adapt_for(&request("openai/o1-mini").max_tokens(64), "openai/o1-mini");
        assert_eq!(p.body["max_completion_tokens"], 64);
        assert!(p.body.get("max_tokens").is_none());
    }

    #[test]
    fn tools_only_when_present() {
        let p = adapt_for(&request("openai/gpt-4o").tools(vec![]), "openai/gpt-4o");
        assert!(p.body.get("tools").is_none());

        let tool = ToolDefinition::function("lookup", None, json!({"type": "object"}));
        let p = adapt_for(&request("openai/gpt-4o").tools(vec![tool]), "openai/gpt-4o");
        assert_eq!(p.body["tools"][0]["function"]["name"], "lookup");
        assert_eq!(p.body["tool_choice"], "auto");
    }

    #[test]
    fn claude_gets_beta_header_and_cache_control() {
        let p = adapt_for(&request("anthropic/claude-3-5-haiku"), "anthropic/claude-3-5-haiku");
        assert_eq!(
            p.headers.get("anthropic-beta").map(String::as_str),
            Some("output-128k-2025-02-19")
        );
        assert_eq!(
            p.body["messages"][0]["content"][0]["cache_control"],
            json!({"type": "ephemeral"})
        );
    }

    #[test]
    fn openrouter_attribution_when_configured() {
        let mut config = GatewayConfig::default();
        config.attribution.site_url = Some("https://example.com".into());
        config.attribution.app_name = Some("Demo".into());
        let target = ResolvedTarget::new("openrouter/qwen/qwen3-32b");
        let p = adapt(&request("qwen3-32b"), &target, &config).unwrap();
        assert_eq!(p.headers["HTTP-Referer"], "https://example.com");
        assert_eq!(p.headers["X-Title"], "Demo");

        let p = adapt(&request("groq/llama"), &ResolvedTarget::new("groq/llama"), &config).unwrap();
        assert!(p.headers.is_empty());
    }

    #[test]
    fn claude_thinking_pins_temperature() {
        let req = request("anthropic/claude-3-7-sonnet-latest")
            .temperature(0.2)
            .thinking(ReasoningEffort::High);
        let p = adapt_for(&req, "anthropic/claude-3-7-sonnet-latest");
        assert_eq!(p.temperature(), Some(CLAUDE_THINKING_TEMPERATURE));
        assert_eq!(p.body["reasoning_effort"], "high");
    }

    #[test]
    fn xai_thinking_keeps_temperature() {
        let req = request("xai/grok-3-mini").temperature(0.2).thinking(ReasoningEffort::Low);
        let p = adapt_for(&req, "xai/grok-3-mini");
        assert_eq!(p.temperature(), Some(0.2));
        assert_eq!(p.body["reasoning_effort"], "low");
    }

    #[test]
    fn adapting_twice_yields_identical_parameters() {
        let req = request("anthropic/claude-3-5-haiku");
        let a = adapt_for(&req, "anthropic/claude-3-5-haiku");
        let b = adapt_for(&req, "anthropic/claude-3-5-haiku");
        assert_eq!(a, b);
        assert_eq!(req.messages[0], Message::system("sys"));
    }

    #[test]
    fn invalid_request_is_configuration_error() {
        let req = CanonicalRequest::new("openai/gpt-4o", vec![]);
        let err = adapt(&req, &ResolvedTarget::new("openai/gpt-4o"), &GatewayConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn overrides_travel_with_parameters() {
        let req = request("openai/gpt-4o").api_key("sk-test").api_base("http://localhost:4000");
        let p = adapt_for(&req, "openai/gpt-4o");
        assert_eq!(p.api_key.as_deref(), Some("sk-test"));
        assert_eq!(p.api_base.as_deref(), Some("http://localhost:4000"));
    }
}
