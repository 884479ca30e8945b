//! Dispatch seam between the gateway and upstream providers.
//!
//! The gateway only ever talks to a [`ChatTransport`]; [`HttpTransport`] is the production
//! implementation, tests plug in scripted ones.

pub mod http;
pub mod sse;

use async_trait::async_trait;
use futures::Stream;
use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use crate::adapter::AdaptedParameters;
use crate::types::{ChatResponse, StreamingEvent};

pub use http::HttpTransport;

/// Upstream event stream, before the gateway folds metadata into the terminal event.
pub type UpstreamStream =
    Pin<Box<dyn Stream<Item = std::result::Result<StreamingEvent, DispatchError>> + Send>>;

/// Raw failure of one dispatch. Never returned by the gateway itself; it is classified and
/// attached as the `source()` of a crate [`Error`](crate::Error).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        /// Upstream `Retry-After` hint.
        retry_after_ms: Option<u64>,
    },

    /// Connection, TLS or timeout failure; no status was received.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A response arrived but its body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl DispatchError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        DispatchError::Status {
            status,
            message: message.into(),
            retry_after_ms: None,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        DispatchError::Transport(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        DispatchError::Decode(message.into())
    }

    pub fn with_retry_after(self, after: Duration) -> Self {
        match self {
            DispatchError::Status {
                status, message, ..
            } => DispatchError::Status {
                status,
                message,
                retry_after_ms: Some(after.as_millis() as u64),
            },
            other => other,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            DispatchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            DispatchError::Status { message, .. } => message,
            DispatchError::Transport(m) | DispatchError::Decode(m) => m,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            DispatchError::Status {
                retry_after_ms: Some(ms),
                ..
            } => Some(Duration::from_millis(*ms)),
            _ => None,
        }
    }
}

/// Successful dispatch: a complete body, or a live stream of events.
pub enum Dispatched {
    Complete(ChatResponse),
    Stream(UpstreamStream),
}

impl fmt::Debug for Dispatched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatched::Complete(r) => f.debug_tuple("Complete").field(r).finish(),
            Dispatched::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Sends adapted parameters to an upstream provider.
///
/// Implementations must be safe to share across concurrent invocations and must not retry
/// on their own; retry and fallback decisions belong to the gateway.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn dispatch(
        &self,
        params: &AdaptedParameters,
    ) -> std::result::Result<Dispatched, DispatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_only_attaches_to_status_errors() {
        let e = DispatchError::status(429, "slow down").with_retry_after(Duration::from_secs(45));
        assert_eq!(e.retry_after(), Some(Duration::from_secs(45)));
        assert_eq!(e.status_code(), Some(429));

        let t = DispatchError::transport("reset").with_retry_after(Duration::from_secs(1));
        assert_eq!(t.retry_after(), None);
        assert_eq!(t.message(), "reset");
    }

    #[test]
    fn display_includes_status() {
        assert_eq!(
            DispatchError::status(529, "Overloaded").to_string(),
            "HTTP 529: Overloaded"
        );
    }
}
