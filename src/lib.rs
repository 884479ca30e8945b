//! # ai-gateway
//!
//! 多厂商大模型调用网关：别名路由、参数适配、失败分类、有界重试与回退链。
//!
//! Resilient invocation gateway for interchangeable LLM providers.
//!
//! ## Overview
//!
//! Callers name a model loosely (`"kimi-k2"`, `"claude-sonnet-4"`, a full routing id) and hand
//! over one provider-agnostic [`CanonicalRequest`]. The gateway resolves the name to a concrete
//! routing identifier, reshapes the request into that provider's parameter dialect, classifies
//! every failure into a closed set of categories and reacts with bounded retries or ordered
//! fallback chains. The caller gets either a response (with the model actually used) or one
//! classified [`Error`].
//!
//! ## Core Philosophy
//!
//! - **Configuration is data**: alias tables and fallback chains live in [`GatewayConfig`],
//!   loaded once and never mutated
//! - **Closed provider set**: per-family rules hang off [`routing::ProviderFamily`]
//! - **Fresh adaptation per attempt**: headers and cache annotations never accumulate
//! - **Explicit streams**: [`ChatStream`] is single-pass and cancellable via [`CancelHandle`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_gateway::{CanonicalRequest, Gateway, Message};
//!
//! #[tokio::main]
//! async fn main() -> ai_gateway::Result<()> {
//!     ai_gateway::logging::init_tracing();
//!     let gateway = Gateway::builder().build().await?;
//!
//!     let request = CanonicalRequest::new("kimi-k2", vec![Message::user("Hello!")]);
//!     let response = gateway.complete(request).await?;
//!     println!("{} answered: {}", response.model, response.content);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`routing`] | Provider families, alias resolution, fallback chains, configuration |
//! | [`adapter`] | Canonical request → provider parameters |
//! | [`client`] | Gateway facade, retry controller, chain executor, streams |
//! | [`transport`] | `ChatTransport` seam, HTTP transport, SSE decoding |
//! | [`types`] | Requests, messages, tools, responses, streaming events |
//! | [`error_code`] | Failure categories and their retry/fallback semantics |
//! | [`credentials`] | Keyring/env API key lookup and startup report |

pub mod adapter;
pub mod client;
pub mod credentials;
pub mod error_code;
pub mod logging;
pub mod routing;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use client::{
    CallStats, CancelHandle, ChatStream, Gateway, GatewayBuilder, GatewayOutput, RetryPolicy,
};
pub use error_code::FailureCategory;
pub use routing::{GatewayConfig, ProviderFamily, ResolvedTarget};
pub use transport::{ChatTransport, DispatchError, Dispatched, HttpTransport};
pub use types::{
    events::StreamingEvent,
    message::{Message, MessageRole},
    request::{CanonicalRequest, ReasoningEffort},
    response::ChatResponse,
    tool::ToolCall,
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
