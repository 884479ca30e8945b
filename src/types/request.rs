//! Canonical chat completion request

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::message::Message;
use super::tool::{ToolChoice, ToolDefinition};
use crate::{Error, ErrorContext, Result};

/// Upper bound accepted for the sampling temperature.
pub const MAX_TEMPERATURE: f64 = 2.0;

/// Effort level for extended reasoning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    #[default]
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Provider-agnostic chat completion request.
///
/// Passed by value into the gateway and never mutated there; every dispatch attempt derives
/// its own provider parameters from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(default)]
    pub tool_choice: ToolChoice,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<serde_json::Value>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub enable_thinking: bool,
    #[serde(default)]
    pub reasoning_effort: ReasoningEffort,
    /// Bedrock inference-profile identifier (ARN or cross-region profile id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_profile: Option<String>,
    /// Per-call credential override.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Per-call base URL override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

impl CanonicalRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: 0.0,
            top_p: None,
            max_tokens: None,
            tools: None,
            tool_choice: ToolChoice::Auto,
            response_format: None,
            stream: false,
            enable_thinking: false,
            reasoning_effort: ReasoningEffort::Low,
            inference_profile: None,
            api_key: None,
            api_base: None,
        }
    }

    pub fn temperature(mut self, t: f64) -> Self {
        self.temperature = t;
        self
    }

    pub fn top_p(mut self, p: f64) -> Self {
        self.top_p = Some(p);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = choice;
        self
    }

    pub fn response_format(mut self, format: serde_json::Value) -> Self {
        self.response_format = Some(format);
        self
    }

    pub fn stream(mut self) -> Self {
        self.stream = true;
        self
    }

    pub fn thinking(mut self, effort: ReasoningEffort) -> Self {
        self.enable_thinking = true;
        self.reasoning_effort = effort;
        self
    }

    pub fn inference_profile(mut self, profile: impl Into<String>) -> Self {
        self.inference_profile = Some(profile.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Structural validation. Failures are configuration errors and are never retried.
    pub fn validate(&self) -> Result<()> {
        if self.messages.is_empty() {
            return Err(invalid("messages must not be empty", "request.messages"));
        }
        for (i, message) in self.messages.iter().enumerate() {
            if message.content.is_none() && !message.has_tool_calls() {
                return Err(invalid(
                    "message needs content or tool_calls",
                    &format!("request.messages[{}]", i),
                ));
            }
        }
        if self.model.trim().is_empty() {
            return Err(invalid("model identifier must not be empty", "request.model"));
        }
        if !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(Error::configuration_with_context(
                "temperature out of range",
                ErrorContext::new()
                    .with_field_path("request.temperature")
                    .with_details(format!("expected 0.0..={}, got {}", MAX_TEMPERATURE, self.temperature))
                    .with_source("request_validator"),
            ));
        }
        if let Some(p) = self.top_p {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::configuration_with_context(
                    "top_p out of range",
                    ErrorContext::new()
                        .with_field_path("request.top_p")
                        .with_details(format!("expected 0.0..=1.0, got {}", p))
                        .with_source("request_validator"),
                ));
            }
        }
        if let Some(tools) = &self.tools {
            let mut seen = HashSet::new();
            for tool in tools {
                if !seen.insert(tool.name()) {
                    return Err(Error::configuration_with_context(
                        "tool names must be unique",
                        ErrorContext::new()
                            .with_field_path("request.tools")
                            .with_details(format!("duplicate tool '{}'", tool.name()))
                            .with_source("request_validator"),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn invalid(msg: &str, field: &str) -> Error {
    Error::configuration_with_context(
        msg,
        ErrorContext::new()
            .with_field_path(field)
            .with_source("request_validator"),
    )
}
