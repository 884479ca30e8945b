//! Streaming through the facade: terminal metadata, cancellation, pre-stream retry.

mod common;

use ai_gateway::types::Usage;
use ai_gateway::{CanonicalRequest, DispatchError, Error, GatewayOutput, Message, StreamingEvent};
use common::{fast_config, gateway, server_error, Reply, ScriptedTransport};
use tokio_stream::StreamExt;

const QWEN: &str = "openrouter/qwen/qwen3-32b";

fn delta(s: &str) -> Result<StreamingEvent, DispatchError> {
    Ok(StreamingEvent::PartialContentDelta { content: s.into() })
}

fn request() -> CanonicalRequest {
    CanonicalRequest::new(QWEN, vec![Message::user("count to three")])
}

#[tokio::test]
async fn stream_ends_with_completed_metadata() {
    let transport = ScriptedTransport::new();
    transport.enqueue(
        QWEN,
        vec![Reply::Stream(vec![
            delta("one "),
            delta("two "),
            Ok(StreamingEvent::Metadata {
                usage: Some(Usage {
                    prompt_tokens: 4,
                    completion_tokens: 3,
                    total_tokens: 7,
                }),
                finish_reason: Some("stop".into()),
            }),
            delta("three"),
        ])],
    );
    let gw = gateway(fast_config(), transport.clone()).await;

    let stream = gw.complete_stream(request()).await.unwrap();
    assert_eq!(stream.model(), QWEN);
    let events: Vec<_> = stream.collect().await;
    assert_eq!(events.len(), 4);

    let last = events.last().unwrap().as_ref().unwrap();
    match last {
        StreamingEvent::Completed {
            model,
            usage,
            finish_reason,
        } => {
            assert_eq!(model, QWEN);
            assert_eq!(usage.as_ref().map(|u| u.total_tokens), Some(7));
            assert_eq!(finish_reason.as_deref(), Some("stop"));
        }
        other => panic!("unexpected terminal event: {other:?}"),
    }
    assert!(transport.calls()[0].stream);
}

#[tokio::test]
async fn retry_happens_before_the_stream_starts() {
    let transport = ScriptedTransport::new();
    transport.enqueue(
        QWEN,
        vec![server_error(), Reply::Stream(vec![delta("hi")])],
    );
    let gw = gateway(fast_config(), transport.clone()).await;

    let (output, stats) = gw.invoke_with_stats(request().stream()).await.unwrap();
    assert_eq!(stats.retry_count, 1);
    let GatewayOutput::Stream(stream) = output else {
        panic!("expected a stream");
    };
    let resp = stream.into_response().await.unwrap();
    assert_eq!(resp.content, "hi");
}

#[tokio::test]
async fn failure_after_output_is_not_retried() {
    let transport = ScriptedTransport::new();
    transport.enqueue(
        QWEN,
        vec![Reply::Stream(vec![
            delta("partial"),
            Err(DispatchError::transport("connection reset by peer")),
        ])],
    );
    let gw = gateway(fast_config(), transport.clone()).await;

    let mut stream = gw.complete_stream(request()).await.unwrap();
    assert!(stream.next().await.unwrap().is_ok());
    let err = stream.next().await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Fatal { .. }));
    assert!(stream.next().await.is_none());
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn cancel_handle_stops_fragment_production() {
    let transport = ScriptedTransport::new();
    transport.enqueue(
        QWEN,
        vec![Reply::Stream(vec![delta("a"), delta("b"), delta("c")])],
    );
    let gw = gateway(fast_config(), transport).await;

    let mut stream = gw.complete_stream(request()).await.unwrap();
    let handle = stream.cancel_handle();
    assert!(stream.next().await.unwrap().is_ok());
    handle.cancel();
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn complete_response_is_replayed_as_stream() {
    let transport = ScriptedTransport::new();
    transport.enqueue(QWEN, vec![Reply::Text("whole answer".into())]);
    let gw = gateway(fast_config(), transport).await;

    let events: Vec<_> = gw
        .complete_stream(request())
        .await
        .unwrap()
        .map(|e| e.unwrap())
        .collect()
        .await;
    assert_eq!(
        events[0],
        StreamingEvent::PartialContentDelta {
            content: "whole answer".into()
        }
    );
    assert!(events[1].is_terminal());
}

#[tokio::test]
async fn complete_drains_a_streamed_reply() {
    let transport = ScriptedTransport::new();
    transport.enqueue(
        QWEN,
        vec![Reply::Stream(vec![delta("stitched "), delta("together")])],
    );
    let gw = gateway(fast_config(), transport.clone()).await;

    let resp = gw.complete(request().stream()).await.unwrap();
    assert_eq!(resp.content, "stitched together");
    assert_eq!(resp.model, QWEN);
    assert!(!transport.calls()[0].stream);
}
