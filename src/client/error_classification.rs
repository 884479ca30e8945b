//! Error classification logic
//!
//! Maps one raw [`DispatchError`] to exactly one [`FailureCategory`]. Pure and deterministic:
//! the same failure from the same family always lands in the same category.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error_code::FailureCategory;
use crate::routing::ProviderFamily;
use crate::transport::DispatchError;

static CONTEXT_OVERFLOW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)context window|token limit|maximum context length|too many tokens|context_length_exceeded|prompt is too long|context too large|input too long|maximum tokens",
    )
    .expect("context overflow pattern is a valid literal")
});

static RATE_LIMIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)rate[ _-]?limit|too many requests")
        .expect("rate limit pattern is a valid literal")
});

fn is_client_error(status: u16) -> bool {
    matches!(status, 400 | 413 | 422)
}

fn is_overloaded(family: ProviderFamily, status: u16, message: &str) -> bool {
    let signatures = family.overload_signatures();
    if signatures.is_empty() {
        return false;
    }
    if family.overload_status() == Some(status) {
        return true;
    }
    let lower = message.to_lowercase();
    signatures.iter().any(|s| lower.contains(s))
}

/// Classify a failed dispatch against the family it was sent to.
pub fn classify(err: &DispatchError, family: ProviderFamily) -> FailureCategory {
    match err {
        DispatchError::Transport(_) | DispatchError::Decode(_) => {
            FailureCategory::TransientServerError
        }
        DispatchError::Status {
            status, message, ..
        } => {
            let status = *status;
            if status == 429 {
                return FailureCategory::RateLimited;
            }
            if is_client_error(status) {
                if CONTEXT_OVERFLOW.is_match(message) {
                    return FailureCategory::ContextOverflow;
                }
                if RATE_LIMIT.is_match(message) {
                    return FailureCategory::RateLimited;
                }
                return FailureCategory::TransientBadRequest;
            }
            if (500..600).contains(&status) {
                if is_overloaded(family, status, message) {
                    return FailureCategory::ProviderOverloaded;
                }
                if RATE_LIMIT.is_match(message) {
                    return FailureCategory::RateLimited;
                }
                return FailureCategory::TransientServerError;
            }
            if RATE_LIMIT.is_match(message) {
                return FailureCategory::RateLimited;
            }
            // 401/403/404 and anything unrecognized: retrying cannot help.
            FailureCategory::Fatal
        }
    }
}
