use std::time::Duration;

use crate::client::error_classification::classify;
use crate::error_code::FailureCategory;
use crate::routing::{ProviderFamily, RetryPolicyConfig};
use crate::transport::DispatchError;

/// Result of one dispatch attempt, consumed immediately by the retry controller.
#[derive(Debug)]
pub(crate) enum AttemptOutcome<T> {
    Success(T),
    RetryableFailure {
        category: FailureCategory,
        wait: Duration,
        error: DispatchError,
    },
    FallbackTrigger {
        category: FailureCategory,
        error: DispatchError,
    },
    FatalFailure {
        category: FailureCategory,
        error: DispatchError,
    },
}

/// Retry constants plus the category → next-step mapping.
///
/// Keep this deterministic and explainable: the category alone picks the branch, the only
/// external input is the upstream `Retry-After` hint for rate limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub rate_limit_delay: Duration,
    pub max_rate_limit_delay: Duration,
    pub candidate_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryPolicyConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetryPolicyConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            retry_delay: cfg.retry_delay(),
            rate_limit_delay: cfg.rate_limit_delay(),
            max_rate_limit_delay: cfg.max_rate_limit_delay().max(cfg.rate_limit_delay()),
            candidate_delay: cfg.candidate_delay(),
        }
    }

    /// Wait before re-dispatching after a failure of `category`.
    ///
    /// Rate limits use the long delay, raised to the upstream hint when that is larger but
    /// never past `max_rate_limit_delay`.
    pub fn wait_for(&self, category: FailureCategory, retry_after: Option<Duration>) -> Duration {
        if category.long_wait() {
            retry_after
                .map(|hint| hint.clamp(self.rate_limit_delay, self.max_rate_limit_delay))
                .unwrap_or(self.rate_limit_delay)
        } else {
            self.retry_delay
        }
    }

    /// Classify one attempt's result.
    ///
    /// `fallback_available` is false once the reactive chain has been traversed (or when the
    /// family has none); overload then degrades to an ordinary short-wait retry.
    pub(crate) fn evaluate<T>(
        &self,
        result: std::result::Result<T, DispatchError>,
        family: ProviderFamily,
        fallback_available: bool,
    ) -> AttemptOutcome<T> {
        let error = match result {
            Ok(value) => return AttemptOutcome::Success(value),
            Err(e) => e,
        };

        let category = classify(&error, family);
        if category.triggers_fallback() && fallback_available {
            return AttemptOutcome::FallbackTrigger { category, error };
        }
        if category.retryable() {
            let wait = self.wait_for(category, error.retry_after());
            return AttemptOutcome::RetryableFailure {
                category,
                wait,
                error,
            };
        }
        AttemptOutcome::FatalFailure { category, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    #[test]
    fn rate_limit_wait_exceeds_transient_wait() {
        let p = policy();
        let long = p.wait_for(FailureCategory::RateLimited, None);
        let short = p.wait_for(FailureCategory::TransientServerError, None);
        assert!(long > short);
        assert_eq!(short, Duration::from_millis(100));
        assert_eq!(long, Duration::from_secs(30));
    }

    #[test]
    fn retry_after_only_raises_the_wait() {
        let p = policy();
        assert_eq!(
            p.wait_for(FailureCategory::RateLimited, Some(Duration::from_secs(60))),
            Duration::from_secs(60)
        );
        assert_eq!(
            p.wait_for(FailureCategory::RateLimited, Some(Duration::from_secs(1))),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn retry_after_is_capped() {
        let p = policy();
        assert_eq!(
            p.wait_for(FailureCategory::RateLimited, Some(Duration::from_secs(86_400))),
            Duration::from_secs(120)
        );
    }

    #[test]
    fn overload_triggers_fallback_only_when_available() {
        let p = policy();
        let err = || Err::<(), _>(DispatchError::status(529, "Overloaded"));
        assert!(matches!(
            p.evaluate(err(), ProviderFamily::Anthropic, true),
            AttemptOutcome::FallbackTrigger { .. }
        ));
        match p.evaluate(err(), ProviderFamily::Anthropic, false) {
            AttemptOutcome::RetryableFailure { category, wait, .. } => {
                assert_eq!(category, FailureCategory::ProviderOverloaded);
                assert_eq!(wait, p.retry_delay);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn overflow_and_auth_are_fatal() {
        let p = policy();
        let overflow = p.evaluate::<()>(
            Err(DispatchError::status(400, "maximum context length exceeded")),
            ProviderFamily::OpenAi,
            true,
        );
        assert!(matches!(
            overflow,
            AttemptOutcome::FatalFailure {
                category: FailureCategory::ContextOverflow,
                ..
            }
        ));
        let auth = p.evaluate::<()>(
            Err(DispatchError::status(401, "invalid api key")),
            ProviderFamily::OpenAi,
            true,
        );
        assert!(matches!(
            auth,
            AttemptOutcome::FatalFailure {
                category: FailureCategory::Fatal,
                ..
            }
        ));
    }

    #[test]
    fn success_passes_through() {
        assert!(matches!(
            policy().evaluate(Ok(7), ProviderFamily::Groq, false),
            AttemptOutcome::Success(7)
        ));
    }
}
