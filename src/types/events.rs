//! Streaming events

use serde::{Deserialize, Serialize};

use super::response::Usage;

/// Unified streaming event enum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum StreamingEvent {
    /// Partial content delta (text streaming)
    #[serde(rename = "PartialContentDelta")]
    PartialContentDelta { content: String },

    /// Partial tool call (arguments streaming)
    #[serde(rename = "PartialToolCall")]
    PartialToolCall {
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        arguments: String, // Partial JSON string
        #[serde(skip_serializing_if = "Option::is_none")]
        index: Option<u32>,
    },

    /// Upstream metadata (usage, finish reason). Folded into [`StreamingEvent::Completed`]
    /// by the gateway stream and never forwarded on its own.
    #[serde(rename = "Metadata")]
    Metadata {
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },

    /// Terminal event: the model actually used plus the accumulated metadata.
    #[serde(rename = "Completed")]
    Completed {
        model: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
}

impl StreamingEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamingEvent::Completed { .. })
    }
}
