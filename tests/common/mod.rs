//! Shared fixtures: a scripted in-memory transport and fast retry settings.

#![allow(dead_code)]

use ai_gateway::adapter::AdaptedParameters;
use ai_gateway::routing::config::{ReactiveChainConfig, RetryPolicyConfig};
use ai_gateway::{
    ChatResponse, ChatTransport, DispatchError, Dispatched, Gateway, GatewayConfig,
    ProviderFamily, StreamingEvent,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted upstream reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(DispatchError),
    Stream(Vec<Result<StreamingEvent, DispatchError>>),
}

/// Transport that answers from per-model scripts and records every dispatch.
///
/// Lookup order per dispatch: queued replies (consumed), standing reply, then `Text("ok")`.
#[derive(Default)]
pub struct ScriptedTransport {
    queued: Mutex<HashMap<String, VecDeque<Reply>>>,
    standing: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<AdaptedParameters>>,
    latency: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency: Some(latency),
            ..Self::default()
        })
    }

    pub fn enqueue(&self, model: &str, replies: Vec<Reply>) {
        self.queued
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .extend(replies);
    }

    pub fn always(&self, model: &str, reply: Reply) {
        self.standing
            .lock()
            .unwrap()
            .insert(model.to_string(), reply);
    }

    pub fn calls(&self) -> Vec<AdaptedParameters> {
        self.calls.lock().unwrap().clone()
    }

    pub fn dispatched_models(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|p| p.model().to_string())
            .collect()
    }

    fn next_reply(&self, model: &str) -> Reply {
        if let Some(reply) = self
            .queued
            .lock()
            .unwrap()
            .get_mut(model)
            .and_then(VecDeque::pop_front)
        {
            return reply;
        }
        self.standing
            .lock()
            .unwrap()
            .get(model)
            .cloned()
            .unwrap_or_else(|| Reply::Text("ok".to_string()))
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn dispatch(&self, params: &AdaptedParameters) -> Result<Dispatched, DispatchError> {
        self.calls.lock().unwrap().push(params.clone());
        let reply = self.next_reply(params.model());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match reply {
            Reply::Text(content) => Ok(Dispatched::Complete(ChatResponse {
                content,
                model: params.model().to_string(),
                finish_reason: Some("stop".to_string()),
                ..ChatResponse::default()
            })),
            Reply::Fail(err) => Err(err),
            Reply::Stream(events) => Ok(Dispatched::Stream(Box::pin(futures::stream::iter(events)))),
        }
    }
}

/// Built-in tables with millisecond-scale waits.
pub fn fast_config() -> GatewayConfig {
    GatewayConfig {
        retry: RetryPolicyConfig {
            max_attempts: 2,
            retry_delay_ms: 5,
            rate_limit_delay_ms: 200,
            max_rate_limit_delay_ms: 1_000,
            candidate_delay_ms: 0,
        },
        ..GatewayConfig::default()
    }
}

pub fn with_reactive_chain(mut config: GatewayConfig, candidates: &[&str]) -> GatewayConfig {
    config.reactive_chains = vec![ReactiveChainConfig {
        family: ProviderFamily::Anthropic,
        name: "test-overload".to_string(),
        candidates: candidates.iter().map(|s| s.to_string()).collect(),
    }];
    config
}

pub async fn gateway(config: GatewayConfig, transport: Arc<ScriptedTransport>) -> Gateway {
    Gateway::builder()
        .config(config)
        .transport(transport)
        .build()
        .await
        .expect("gateway builds")
}

pub fn overloaded() -> Reply {
    Reply::Fail(DispatchError::status(529, "Overloaded"))
}

pub fn server_error() -> Reply {
    Reply::Fail(DispatchError::status(502, "bad gateway"))
}
