use crate::error_code::FailureCategory;
use crate::transport::DispatchError;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "request.messages", "retry.max_attempts")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "request_validator", "config_loader")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Classified error kinds surfaced by the gateway.
///
/// Raw upstream failures never cross the gateway boundary on their own; they are attached
/// as the `source()` of one of these variants.
#[derive(Debug, Error)]
pub enum Error {
    /// The request or the static configuration is malformed.
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    /// The prompt exceeds the provider's capacity. Shrink the request and resubmit.
    #[error("Context overflow in {model}: {message}")]
    ContextOverflow {
        model: String,
        message: String,
        #[source]
        source: Option<DispatchError>,
    },

    /// The bounded retry loop for a single target ran out of attempts.
    #[error("Failed to make API call to {model} after {attempts} attempts. Last error: {source}")]
    RetriesExhausted {
        model: String,
        attempts: u32,
        last_category: FailureCategory,
        #[source]
        source: DispatchError,
    },

    /// Every candidate of a fallback chain failed.
    #[error("All candidates of fallback chain '{chain}' failed. Last error: {message}")]
    FallbackExhausted {
        chain: String,
        last_category: FailureCategory,
        message: String,
        #[source]
        source: Option<DispatchError>,
    },

    /// Unrecognized failure, propagated without retry.
    #[error("API call to {model} failed: {message}")]
    Fatal {
        model: String,
        message: String,
        #[source]
        source: Option<DispatchError>,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::configuration_with_context(msg, ErrorContext::new())
    }

    pub(crate) fn context_overflow(model: impl Into<String>, source: DispatchError) -> Self {
        Error::ContextOverflow {
            model: model.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    pub(crate) fn fatal(model: impl Into<String>, source: DispatchError) -> Self {
        Error::Fatal {
            model: model.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    /// The failure category behind this error, if it came from a dispatch.
    pub fn category(&self) -> Option<FailureCategory> {
        match self {
            Error::Configuration { .. } => None,
            Error::ContextOverflow { .. } => Some(FailureCategory::ContextOverflow),
            Error::RetriesExhausted { last_category, .. }
            | Error::FallbackExhausted { last_category, .. } => Some(*last_category),
            Error::Fatal { .. } => Some(FailureCategory::Fatal),
        }
    }

    /// True when the caller should shrink the prompt and resubmit.
    pub fn is_context_overflow(&self) -> bool {
        matches!(self, Error::ContextOverflow { .. })
    }
}
