//! Non-streaming response shape

use serde::{Deserialize, Serialize};

use super::tool::ToolCall;

/// Token usage counters reported by the upstream provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Complete chat response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    /// Routing identifier actually dispatched. May differ from the requested model
    /// after alias resolution or fallback.
    pub model: String,
    pub usage: Option<Usage>,
    pub finish_reason: Option<String>,
}
