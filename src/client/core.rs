use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::client::builder::GatewayBuilder;
use crate::client::policy::RetryPolicy;
use crate::client::stream::ChatStream;
use crate::routing::{GatewayConfig, ResolvedTarget, RoutingTable};
use crate::transport::{ChatTransport, Dispatched};
use crate::types::{CanonicalRequest, ChatResponse};
use crate::Result;

/// Per-call statistics, returned next to the response for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStats {
    /// Identifier as the caller supplied it.
    pub requested_model: String,
    /// Identifier after alias resolution.
    pub resolved_model: String,
    /// Identifier that produced the response (differs from `resolved_model` after fallback).
    pub model_used: String,
    /// Upstream dispatches performed, including chain candidates.
    pub dispatches: u32,
    /// Waits taken between attempts against the resolved target.
    pub retry_count: u32,
    /// Chain traversed, if any.
    pub fallback_chain: Option<String>,
    pub duration_ms: u128,
}

/// Complete or streaming outcome of [`Gateway::invoke`].
#[derive(Debug)]
pub enum GatewayOutput {
    Complete(ChatResponse),
    Stream(ChatStream),
}

impl GatewayOutput {
    /// Collapse into a complete response, draining the stream if needed.
    pub async fn into_response(self) -> Result<ChatResponse> {
        match self {
            GatewayOutput::Complete(resp) => Ok(resp),
            GatewayOutput::Stream(stream) => stream.into_response().await,
        }
    }
}

/// Single entry point for chat completion across providers.
///
/// Cheap to clone; every clone shares the same immutable routing state and transport.
#[derive(Clone)]
pub struct Gateway {
    pub(crate) config: Arc<GatewayConfig>,
    pub(crate) table: Arc<RoutingTable>,
    pub(crate) policy: RetryPolicy,
    pub(crate) transport: Arc<dyn ChatTransport>,
}

impl Gateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    pub(crate) fn from_parts(config: GatewayConfig, transport: Arc<dyn ChatTransport>) -> Result<Self> {
        let table = RoutingTable::from_config(&config)?;
        let policy = RetryPolicy::from_config(&config.retry);
        Ok(Self {
            config: Arc::new(config),
            table: Arc::new(table),
            policy,
            transport,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Resolve a caller identifier without dispatching.
    pub fn resolve(&self, model: &str) -> ResolvedTarget {
        self.table.resolve(model)
    }

    pub async fn invoke(&self, request: CanonicalRequest) -> Result<GatewayOutput> {
        Ok(self.invoke_with_stats(request).await?.0)
    }

    /// Route, adapt and dispatch one request, returning per-call stats alongside the output.
    pub async fn invoke_with_stats(
        &self,
        request: CanonicalRequest,
    ) -> Result<(GatewayOutput, CallStats)> {
        let start = Instant::now();
        request.validate()?;

        let target = self.table.resolve(&request.model);
        let mut stats = CallStats {
            requested_model: request.model.clone(),
            resolved_model: target.routing_id.clone(),
            ..CallStats::default()
        };

        let preemptive = self
            .table
            .preemptive_chain(&request.model)
            .or_else(|| self.table.preemptive_chain(&target.routing_id));

        let (dispatched, used) = match preemptive {
            Some(chain) => {
                info!(
                    model = request.model.as_str(),
                    chain = chain.name(),
                    candidates = ?chain.describe(),
                    "routing through pre-emptive fallback chain"
                );
                stats.fallback_chain = Some(chain.name().to_string());
                self.execute_chain(&request, chain, &mut stats).await?
            }
            None => self.execute_with_retry(&request, &target, &mut stats).await?,
        };

        stats.model_used = used.routing_id.clone();
        stats.duration_ms = start.elapsed().as_millis();
        info!(
            model = stats.model_used.as_str(),
            requested = stats.requested_model.as_str(),
            dispatches = stats.dispatches,
            retries = stats.retry_count,
            duration_ms = stats.duration_ms as u64,
            "request dispatched"
        );

        let output = match dispatched {
            Dispatched::Complete(mut resp) => {
                resp.model = used.routing_id;
                GatewayOutput::Complete(resp)
            }
            Dispatched::Stream(upstream) => GatewayOutput::Stream(ChatStream::new(upstream, used)),
        };
        Ok((output, stats))
    }

    /// Non-streaming completion. The request's stream flag is ignored.
    pub async fn complete(&self, request: CanonicalRequest) -> Result<ChatResponse> {
        Ok(self.complete_with_stats(request).await?.0)
    }

    pub async fn complete_with_stats(
        &self,
        mut request: CanonicalRequest,
    ) -> Result<(ChatResponse, CallStats)> {
        request.stream = false;
        let (output, stats) = self.invoke_with_stats(request).await?;
        Ok((output.into_response().await?, stats))
    }

    /// Streaming completion. Retry and fallback finish before the stream is returned.
    pub async fn complete_stream(&self, mut request: CanonicalRequest) -> Result<ChatStream> {
        request.stream = true;
        match self.invoke(request).await? {
            GatewayOutput::Stream(stream) => Ok(stream),
            // Transport answered with a complete body; replay it as a stream.
            GatewayOutput::Complete(resp) => Ok(ChatStream::from_response(resp)),
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("policy", &self.policy)
            .field("table", &self.table)
            .finish()
    }
}
