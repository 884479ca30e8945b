//! 重试控制器：单一目标的有界重试，必要时转入反应式回退链。
//!
//! Retry controller for a single resolved target.
//!
//! Each cycle adapts the request afresh, dispatches once and lets the policy pick the next
//! step. Overload hands off to the family's reactive chain (at most once per call); when that
//! chain is exhausted the loop resumes ordinary retries of the original target.

use tracing::{info, warn};

use super::core::{CallStats, Gateway};
use super::policy::AttemptOutcome;
use crate::adapter;
use crate::error_code::FailureCategory;
use crate::routing::ResolvedTarget;
use crate::transport::Dispatched;
use crate::types::CanonicalRequest;
use crate::{Error, Result};

impl Gateway {
    pub(crate) async fn execute_with_retry(
        &self,
        request: &CanonicalRequest,
        target: &ResolvedTarget,
        stats: &mut CallStats,
    ) -> Result<(Dispatched, ResolvedTarget)> {
        let max_attempts = self.policy.max_attempts;
        let mut attempt: u32 = 0;
        let mut chain_used = false;

        loop {
            attempt += 1;
            let params = adapter::adapt(request, target, &self.config)?;
            stats.dispatches += 1;
            let result = self.transport.dispatch(&params).await;

            let reactive = if chain_used {
                None
            } else {
                self.table.reactive_chain_for(target)
            };

            let (category, wait, error) =
                match self.policy.evaluate(result, target.failure_family(), reactive.is_some()) {
                    AttemptOutcome::Success(dispatched) => {
                        if attempt > 1 {
                            info!(
                                model = target.routing_id.as_str(),
                                attempt, "dispatch succeeded after retry"
                            );
                        }
                        return Ok((dispatched, target.clone()));
                    }
                    AttemptOutcome::FatalFailure { category, error } => {
                        warn!(
                            model = target.routing_id.as_str(),
                            attempt,
                            category = category.name(),
                            error = %error,
                            "dispatch failed, not retryable"
                        );
                        return Err(if category == FailureCategory::ContextOverflow {
                            Error::context_overflow(target.routing_id.clone(), error)
                        } else {
                            Error::fatal(target.routing_id.clone(), error)
                        });
                    }
                    AttemptOutcome::FallbackTrigger { category, error } => {
                        chain_used = true;
                        let Some(chain) = reactive else {
                            // evaluate() only triggers fallback when a chain was offered.
                            return Err(Error::fatal(target.routing_id.clone(), error));
                        };
                        warn!(
                            model = target.routing_id.as_str(),
                            attempt,
                            category = category.name(),
                            chain = chain.name(),
                            "provider overloaded, switching to reactive chain"
                        );
                        stats.fallback_chain = Some(chain.name().to_string());
                        match self.execute_chain(request, chain, stats).await {
                            Ok(done) => return Ok(done),
                            Err(chain_err) if chain_err.is_context_overflow() => {
                                return Err(chain_err)
                            }
                            Err(chain_err) => {
                                warn!(
                                    model = target.routing_id.as_str(),
                                    chain = chain.name(),
                                    error = %chain_err,
                                    "reactive chain exhausted, retrying original target"
                                );
                            }
                        }
                        // The escalation is not charged to the original target's budget.
                        attempt -= 1;
                        (category, self.policy.retry_delay, error)
                    }
                    AttemptOutcome::RetryableFailure {
                        category,
                        wait,
                        error,
                    } => (category, wait, error),
                };

            if attempt >= max_attempts {
                warn!(
                    model = target.routing_id.as_str(),
                    attempt,
                    category = category.name(),
                    "retry budget exhausted"
                );
                return Err(Error::RetriesExhausted {
                    model: target.routing_id.clone(),
                    attempts: attempt,
                    last_category: category,
                    source: error,
                });
            }

            warn!(
                model = target.routing_id.as_str(),
                attempt,
                category = category.name(),
                delay_ms = wait.as_millis() as u64,
                error = %error,
                "dispatch failed, retrying"
            );
            stats.retry_count += 1;
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }
    }
}
