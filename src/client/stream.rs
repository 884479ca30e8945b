//! 流式响应：单次遍历的事件流与取消句柄。
//!
//! Single-pass streaming response with an explicit cancellation hook.
//!
//! Upstream `Metadata` events are folded into the terminal [`StreamingEvent::Completed`],
//! so a caller sees content/tool-call fragments followed by exactly one `Completed` (or one
//! error). Retry and fallback never happen once the stream exists.

use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{debug, warn};

use crate::client::error_classification::classify;
use crate::error_code::FailureCategory;
use crate::routing::ResolvedTarget;
use crate::transport::{DispatchError, UpstreamStream};
use crate::types::{ChatResponse, StreamingEvent, Usage};
use crate::utils::ToolCallAssembler;
use crate::{Error, Result};

/// A handle that can be used to request cancellation of a [`ChatStream`].
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The stream ends at its next poll and drops the upstream body,
    /// which closes the HTTP connection so the provider stops generating.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Streaming chat response.
pub struct ChatStream {
    inner: Option<UpstreamStream>,
    cancel: CancelHandle,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    target: ResolvedTarget,
    usage: Option<Usage>,
    finish_reason: Option<String>,
    finished: bool,
}

impl ChatStream {
    pub(crate) fn new(upstream: UpstreamStream, target: ResolvedTarget) -> Self {
        let cancel = CancelHandle::new();
        let cancelled = Box::pin(cancel.token.clone().cancelled_owned());
        Self {
            inner: Some(upstream),
            cancel,
            cancelled,
            target,
            usage: None,
            finish_reason: None,
            finished: false,
        }
    }

    /// Replay a complete response as a stream of fragments.
    pub(crate) fn from_response(resp: ChatResponse) -> Self {
        let mut events: Vec<std::result::Result<StreamingEvent, DispatchError>> =
            Vec::with_capacity(resp.tool_calls.len() + 2);
        if !resp.content.is_empty() {
            events.push(Ok(StreamingEvent::PartialContentDelta {
                content: resp.content,
            }));
        }
        for (i, call) in resp.tool_calls.into_iter().enumerate() {
            events.push(Ok(StreamingEvent::PartialToolCall {
                tool_call_id: Some(call.id),
                tool_name: Some(call.name),
                arguments: call.arguments.to_string(),
                index: Some(i as u32),
            }));
        }
        events.push(Ok(StreamingEvent::Metadata {
            usage: resp.usage,
            finish_reason: resp.finish_reason,
        }));
        Self::new(
            Box::pin(futures::stream::iter(events)),
            ResolvedTarget::new(resp.model),
        )
    }

    /// Routing identifier actually serving this stream.
    pub fn model(&self) -> &str {
        &self.target.routing_id
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Drain the stream into a complete response.
    pub async fn into_response(mut self) -> Result<ChatResponse> {
        use futures::StreamExt;

        let mut content = String::new();
        let mut tools = ToolCallAssembler::new();
        let model = self.target.routing_id.clone();

        while let Some(event) = self.next().await {
            match event? {
                StreamingEvent::PartialContentDelta { content: delta } => content.push_str(&delta),
                ev @ StreamingEvent::PartialToolCall { .. } => tools.on_event(&ev),
                StreamingEvent::Completed {
                    model,
                    usage,
                    finish_reason,
                } => {
                    return Ok(ChatResponse {
                        content,
                        tool_calls: tools.finalize(),
                        model,
                        usage,
                        finish_reason,
                    })
                }
                StreamingEvent::Metadata { .. } => {}
            }
        }

        // Cancelled before completion: return what arrived.
        Ok(ChatResponse {
            content,
            tool_calls: tools.finalize(),
            model,
            usage: self.usage.take(),
            finish_reason: self.finish_reason.take(),
        })
    }

    fn finish(&mut self) {
        self.finished = true;
        self.inner = None;
    }
}

impl Stream for ChatStream {
    type Item = Result<StreamingEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        if this.cancelled.as_mut().poll(cx).is_ready() {
            debug!(model = this.target.routing_id.as_str(), "stream cancelled by caller");
            this.finish();
            return Poll::Ready(None);
        }

        loop {
            let Some(inner) = this.inner.as_mut() else {
                this.finished = true;
                return Poll::Ready(None);
            };

            match inner.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(StreamingEvent::Metadata {
                    usage,
                    finish_reason,
                }))) => {
                    if usage.is_some() {
                        this.usage = usage;
                    }
                    if finish_reason.is_some() {
                        this.finish_reason = finish_reason;
                    }
                }
                // Upstream-provided terminal events are replaced by ours.
                Poll::Ready(Some(Ok(StreamingEvent::Completed { .. }))) => {}
                Poll::Ready(Some(Ok(event))) => return Poll::Ready(Some(Ok(event))),
                Poll::Ready(Some(Err(e))) => {
                    let model = this.target.routing_id.clone();
                    let category = classify(&e, this.target.failure_family());
                    warn!(
                        model = model.as_str(),
                        category = category.name(),
                        error = %e,
                        "stream failed after output started"
                    );
                    this.finish();
                    let err = if category == FailureCategory::ContextOverflow {
                        Error::context_overflow(model, e)
                    } else {
                        Error::fatal(model, e)
                    };
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    this.finish();
                    return Poll::Ready(Some(Ok(StreamingEvent::Completed {
                        model: this.target.routing_id.clone(),
                        usage: this.usage.take(),
                        finish_reason: this.finish_reason.take(),
                    })));
                }
            }
        }
    }
}

impl std::fmt::Debug for ChatStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStream")
            .field("model", &self.target.routing_id)
            .field("finished", &self.finished)
            .finish()
    }
}
