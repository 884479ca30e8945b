use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Proxy;
use serde_json::Value;
use std::env;
use std::time::Duration;
use tracing::debug;

use super::sse::{decode_sse, parse_usage};
use super::{ChatTransport, DispatchError, Dispatched};
use crate::adapter::AdaptedParameters;
use crate::credentials::Credentials;
use crate::types::{ChatResponse, ToolCall};
use crate::{Error, ErrorContext, Result};

/// OpenAI-compatible routing endpoint (e.g. a LiteLLM proxy) used when nothing else is set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:4000/v1";
const CHAT_PATH: &str = "/chat/completions";

/// Production transport speaking the chat-completions wire format over reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpTransport {
    /// Base URL from `AI_GATEWAY_BASE_URL`, falling back to [`DEFAULT_BASE_URL`].
    pub fn new() -> Result<Self> {
        let base_url =
            env::var("AI_GATEWAY_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_base_url(&base_url)
    }

    /// Keys come from [`Credentials::load`], resolved here once.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        url::Url::parse(base_url).map_err(|e| {
            Error::configuration_with_context(
                "invalid transport base URL",
                ErrorContext::new()
                    .with_field_path("transport.base_url")
                    .with_details(e.to_string())
                    .with_source("http_transport"),
            )
        })?;

        // Minimal production-friendly defaults (env-overridable).
        let timeout_secs = env::var("AI_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(600);

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("AI_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder.build().map_err(|e| {
            Error::configuration_with_context(
                "failed to build HTTP client",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("http_transport"),
            )
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: Credentials::load(),
        })
    }

    /// Replace the resolved keys.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn endpoint(&self, params: &AdaptedParameters) -> String {
        let base = params
            .api_base
            .as_deref()
            .map(|b| b.trim_end_matches('/'))
            .unwrap_or(&self.base_url);
        format!("{}{}", base, CHAT_PATH)
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn dispatch(
        &self,
        params: &AdaptedParameters,
    ) -> std::result::Result<Dispatched, DispatchError> {
        let url = self.endpoint(params);
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(model = params.model(), request_id = request_id.as_str(), "dispatching");

        let mut req = self
            .client
            .post(&url)
            .json(&params.body)
            .header("x-ai-gateway-request-id", &request_id);

        let api_key = params
            .api_key
            .as_deref()
            .or_else(|| self.credentials.get(params.target.family));
        if let Some(key) = api_key {
            req = req.bearer_auth(key);
        }
        for (k, v) in &params.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        if params.stream {
            req = req.header("accept", "text/event-stream");
        }

        let resp = req
            .send()
            .await
            .map_err(|e| DispatchError::transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(resp.headers());
            let body = resp.text().await.unwrap_or_default();
            let mut err = DispatchError::status(status.as_u16(), error_message(&body));
            if let Some(after) = retry_after {
                err = err.with_retry_after(after);
            }
            return Err(err);
        }

        if params.stream {
            let bytes = resp
                .bytes_stream()
                .map_err(|e| DispatchError::transport(e.to_string()));
            return Ok(Dispatched::Stream(decode_sse(Box::pin(bytes))));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| DispatchError::decode(e.to_string()))?;
        parse_response(&body, params.model()).map(Dispatched::Complete)
    }
}

/// Parse a non-streaming chat-completions body. `model` is the routing id dispatched.
pub fn parse_response(body: &Value, model: &str) -> std::result::Result<ChatResponse, DispatchError> {
    if let Some(err) = body.get("error") {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("upstream returned an error object");
        return Err(DispatchError::status(500, message));
    }

    let message = body
        .pointer("/choices/0/message")
        .ok_or_else(|| DispatchError::decode("response has no choices[0].message"))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let tool_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| calls.iter().filter_map(parse_tool_call).collect())
        .unwrap_or_default();

    Ok(ChatResponse {
        content,
        tool_calls,
        model: model.to_string(),
        usage: body.get("usage").filter(|u| u.is_object()).map(parse_usage),
        finish_reason: body
            .pointer("/choices/0/finish_reason")
            .and_then(Value::as_str)
            .map(String::from),
    })
}

fn parse_tool_call(call: &Value) -> Option<ToolCall> {
    let id = call.get("id")?.as_str()?.to_string();
    let name = call.pointer("/function/name")?.as_str()?.to_string();
    // Arguments arrive as a JSON-encoded string; keep the raw string if it is not valid JSON.
    let arguments = match call.pointer("/function/arguments") {
        Some(Value::String(raw)) => {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
        }
        Some(other) => other.clone(),
        None => Value::Null,
    };
    Some(ToolCall {
        id,
        name,
        arguments,
    })
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}
