//! 类型系统模块：定义网关的核心数据类型。
//!
//! # Types Module
//!
//! Strongly-typed representations of everything that crosses the gateway boundary.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CanonicalRequest`] | Provider-agnostic chat request |
//! | [`Message`] | Chat message with role and content |
//! | [`StreamingEvent`] | Fragment or terminal event of a streamed response |
//! | [`ChatResponse`] | Complete response with the model actually used |
//! | [`ToolDefinition`] | Tool definition for function calling |
//!
//! ## Example
//!
//! ```rust
//! use ai_gateway::types::{CanonicalRequest, Message, ReasoningEffort};
//!
//! let request = CanonicalRequest::new(
//!     "anthropic/claude-3-7-sonnet-latest",
//!     vec![Message::system("You are terse."), Message::user("Hello")],
//! )
//! .max_tokens(1024)
//! .thinking(ReasoningEffort::Medium);
//! assert!(request.validate().is_ok());
//! ```

pub mod events;
pub mod message;
pub mod request;
pub mod response;
pub mod tool;

pub use events::StreamingEvent;
pub use message::{CacheControl, ContentBlock, Message, MessageContent, MessageRole};
pub use request::{CanonicalRequest, ReasoningEffort};
pub use response::{ChatResponse, Usage};
pub use tool::{FunctionCall, MessageToolCall, ToolCall, ToolChoice, ToolDefinition};
