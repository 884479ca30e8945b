//! 失败分类码：定义网关的六种失败类别及其重试/回退语义。
//!
//! Gateway failure categories.
//!
//! Every failed dispatch attempt is assigned exactly one [`FailureCategory`]. The category
//! alone decides what the retry controller does next, so the semantics live here rather than
//! being scattered across the call sites.
//!
//! | Code  | Category              | Retryable | Triggers fallback |
//! |-------|-----------------------|-----------|-------------------|
//! | G1001 | context_overflow      | no        | no                |
//! | G1002 | transient_bad_request | yes       | no                |
//! | G2001 | rate_limited          | yes       | no                |
//! | G3001 | transient_server      | yes       | no                |
//! | G3002 | provider_overloaded   | yes       | yes               |
//! | G9999 | fatal                 | no        | no                |
//!
//! ## Example
//!
//! ```rust
//! use ai_gateway::error_code::FailureCategory;
//!
//! let category = FailureCategory::from_name("rate_limited");
//! assert_eq!(category.code(), "G2001");
//! assert!(category.retryable());
//! assert!(category.long_wait());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure category assigned by the error classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// G1001: The prompt exceeds the provider's input capacity.
    ContextOverflow,
    /// G1002: Rejected request that may be environmental (retry might succeed).
    TransientBadRequest,
    /// G2001: Upstream throttling.
    RateLimited,
    /// G3001: Generic upstream server or connection failure.
    TransientServerError,
    /// G3002: Capacity exhaustion signature from a provider family that owns one.
    ProviderOverloaded,
    /// G9999: Not recognized; never retried.
    Fatal,
}

impl FailureCategory {
    /// Returns the canonical code string (e.g., `"G2001"`).
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ContextOverflow => "G1001",
            Self::TransientBadRequest => "G1002",
            Self::RateLimited => "G2001",
            Self::TransientServerError => "G3001",
            Self::ProviderOverloaded => "G3002",
            Self::Fatal => "G9999",
        }
    }

    /// Returns the snake_case name (e.g., `"rate_limited"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ContextOverflow => "context_overflow",
            Self::TransientBadRequest => "transient_bad_request",
            Self::RateLimited => "rate_limited",
            Self::TransientServerError => "transient_server",
            Self::ProviderOverloaded => "provider_overloaded",
            Self::Fatal => "fatal",
        }
    }

    /// Whether the retry controller may dispatch the same target again.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientBadRequest
                | Self::RateLimited
                | Self::TransientServerError
                | Self::ProviderOverloaded
        )
    }

    /// Whether this category escalates to the reactive fallback chain before retrying.
    #[inline]
    pub fn triggers_fallback(&self) -> bool {
        matches!(self, Self::ProviderOverloaded)
    }

    /// Whether the wait before the next attempt uses the long (rate-limit) delay.
    #[inline]
    pub fn long_wait(&self) -> bool {
        matches!(self, Self::RateLimited)
    }

    /// Maps a category name back to the enum. Unknown names map to [`FailureCategory::Fatal`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "context_overflow" => Self::ContextOverflow,
            "transient_bad_request" => Self::TransientBadRequest,
            "rate_limited" => Self::RateLimited,
            "transient_server" => Self::TransientServerError,
            "provider_overloaded" => Self::ProviderOverloaded,
            _ => Self::Fatal,
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [FailureCategory; 6] = [
        FailureCategory::ContextOverflow,
        FailureCategory::TransientBadRequest,
        FailureCategory::RateLimited,
        FailureCategory::TransientServerError,
        FailureCategory::ProviderOverloaded,
        FailureCategory::Fatal,
    ];

    #[test]
    fn names_map_back_to_categories() {
        for c in ALL {
            assert_eq!(FailureCategory::from_name(c.name()), c);
        }
        assert_eq!(FailureCategory::from_name("nope"), FailureCategory::Fatal);
    }

    #[test]
    fn only_overload_triggers_fallback() {
        let triggering: Vec<_> = ALL.iter().filter(|c| c.triggers_fallback()).collect();
        assert_eq!(triggering, vec![&FailureCategory::ProviderOverloaded]);
    }

    #[test]
    fn overflow_and_fatal_are_terminal() {
        assert!(!FailureCategory::ContextOverflow.retryable());
        assert!(!FailureCategory::Fatal.retryable());
        assert!(FailureCategory::TransientBadRequest.retryable());
    }

    #[test]
    fn display_includes_code() {
        assert_eq!(
            FailureCategory::RateLimited.to_string(),
            "rate_limited (G2001)"
        );
    }
}
