//! Fallback chain executor: one dispatch per candidate, first success wins.

use tracing::{debug, info, warn};

use super::core::{CallStats, Gateway};
use super::error_classification::classify;
use crate::adapter;
use crate::error_code::FailureCategory;
use crate::routing::{FallbackChain, ResolvedTarget};
use crate::transport::{DispatchError, Dispatched};
use crate::types::CanonicalRequest;
use crate::{Error, Result};

impl Gateway {
    pub(crate) async fn execute_chain(
        &self,
        request: &CanonicalRequest,
        chain: &FallbackChain,
        stats: &mut CallStats,
    ) -> Result<(Dispatched, ResolvedTarget)> {
        let mut last: Option<(FailureCategory, DispatchError)> = None;

        for (idx, candidate) in chain.candidates().iter().enumerate() {
            if idx > 0 && !self.policy.candidate_delay.is_zero() {
                tokio::time::sleep(self.policy.candidate_delay).await;
            }

            let mut req = request.clone();
            req.model = candidate.routing_id.clone();
            if !candidate.family.accepts_inference_profile() {
                req.inference_profile = None;
            }

            let params = adapter::adapt(&req, candidate, &self.config)?;
            debug!(
                chain = chain.name(),
                candidate = candidate.routing_id.as_str(),
                position = idx + 1,
                "dispatching chain candidate"
            );
            stats.dispatches += 1;

            match self.transport.dispatch(&params).await {
                Ok(dispatched) => {
                    info!(
                        chain = chain.name(),
                        candidate = candidate.routing_id.as_str(),
                        "chain candidate succeeded"
                    );
                    return Ok((dispatched, candidate.clone()));
                }
                Err(e) => {
                    let category = classify(&e, candidate.failure_family());
                    if category == FailureCategory::ContextOverflow {
                        // Every later candidate would reject the same prompt.
                        warn!(
                            chain = chain.name(),
                            candidate = candidate.routing_id.as_str(),
                            error = %e,
                            "chain candidate rejected the prompt as too long"
                        );
                        return Err(Error::context_overflow(candidate.routing_id.clone(), e));
                    }
                    warn!(
                        chain = chain.name(),
                        candidate = candidate.routing_id.as_str(),
                        category = category.name(),
                        error = %e,
                        "chain candidate failed"
                    );
                    last = Some((category, e));
                }
            }
        }

        Err(match last {
            Some((last_category, source)) => Error::FallbackExhausted {
                chain: chain.name().to_string(),
                last_category,
                message: source.to_string(),
                source: Some(source),
            },
            None => Error::FallbackExhausted {
                chain: chain.name().to_string(),
                last_category: FailureCategory::Fatal,
                message: "chain has no candidates".to_string(),
                source: None,
            },
        })
    }
}
