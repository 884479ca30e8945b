//! SSE framing for OpenAI-compatible chat-completion streams (Bytes -> StreamingEvent).
//!
//! - buffers raw bytes and splits frames on a blank line, so UTF-8 sequences cut across
//!   network chunks are decoded whole
//! - strips the `data:` prefix and ignores `:` comment lines
//! - stops on `[DONE]`
//! - an `{"error": ...}` payload becomes a [`DispatchError`] and ends decoding

use bytes::{Buf, Bytes, BytesMut};
use futures::{stream, Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;

use super::{DispatchError, UpstreamStream};
use crate::types::{StreamingEvent, Usage};

const DELIMITER: &[u8] = b"\n\n";
const DONE_SIGNAL: &str = "[DONE]";

/// Decode an SSE byte stream into streaming events.
pub fn decode_sse<S>(input: S) -> UpstreamStream
where
    S: Stream<Item = Result<Bytes, DispatchError>> + Send + Unpin + 'static,
{
    let stream = stream::unfold(
        (input, BytesMut::new(), VecDeque::new(), false),
        |(mut input, mut buf, mut pending, mut done)| async move {
            loop {
                if let Some(event) = pending.pop_front() {
                    return Some((Ok(event), (input, buf, pending, done)));
                }
                if done {
                    return None;
                }

                if let Some(idx) = find_delimiter(&buf) {
                    let frame = buf.split_to(idx);
                    buf.advance(DELIMITER.len());
                    match parse_frame(&String::from_utf8_lossy(&frame)) {
                        Frame::Done => done = true,
                        Frame::Events(events) => pending.extend(events),
                        Frame::Error(e) => return Some((Err(e), (input, buf, pending, true))),
                    }
                    continue;
                }

                match input.next().await {
                    Some(Ok(bytes)) => {
                        // CR never occurs inside a UTF-8 sequence; dropping it turns CRLF
                        // framing into LF framing.
                        buf.extend(bytes.iter().copied().filter(|&b| b != b'\r'));
                    }
                    Some(Err(e)) => return Some((Err(e), (input, buf, pending, true))),
                    None => {
                        // EOF: parse the remaining buffer once.
                        let rest = buf.split();
                        done = true;
                        match parse_frame(&String::from_utf8_lossy(&rest)) {
                            Frame::Done => {}
                            Frame::Events(events) => pending.extend(events),
                            Frame::Error(e) => {
                                return Some((Err(e), (input, buf, pending, true)))
                            }
                        }
                    }
                }
            }
        },
    );

    Box::pin(stream)
}

fn find_delimiter(buf: &[u8]) -> Option<usize> {
    buf.windows(DELIMITER.len()).position(|w| w == DELIMITER)
}

enum Frame {
    Done,
    Events(Vec<StreamingEvent>),
    Error(DispatchError),
}

fn parse_frame(frame: &str) -> Frame {
    let mut events = Vec::new();
    for line in frame.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let payload = match line.strip_prefix("data:") {
            Some(rest) => rest.trim_start(),
            // event:/id:/retry: fields carry nothing we need.
            None if line.contains(':') && !line.starts_with('{') => continue,
            None => line,
        };
        if payload == DONE_SIGNAL {
            return Frame::Done;
        }
        match parse_chunk(payload) {
            Ok(mut parsed) => events.append(&mut parsed),
            Err(e) => return Frame::Error(e),
        }
    }
    Frame::Events(events)
}

/// Parse one `chat.completion.chunk` payload.
pub fn parse_chunk(data: &str) -> Result<Vec<StreamingEvent>, DispatchError> {
    let v: Value = serde_json::from_str(data)
        .map_err(|e| DispatchError::decode(format!("Failed to parse SSE data: {}", e)))?;

    if let Some(err) = v.get("error") {
        return Err(stream_error(err));
    }

    let mut events = Vec::new();

    if let Some(content) = v.pointer("/choices/0/delta/content").and_then(Value::as_str) {
        if !content.is_empty() {
            events.push(StreamingEvent::PartialContentDelta {
                content: content.to_string(),
            });
        }
    }

    if let Some(calls) = v.pointer("/choices/0/delta/tool_calls").and_then(Value::as_array) {
        for call in calls {
            events.push(StreamingEvent::PartialToolCall {
                tool_call_id: call.get("id").and_then(Value::as_str).map(String::from),
                tool_name: call
                    .pointer("/function/name")
                    .and_then(Value::as_str)
                    .map(String::from),
                arguments: call
                    .pointer("/function/arguments")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                index: call.get("index").and_then(Value::as_u64).map(|i| i as u32),
            });
        }
    }

    let finish_reason = v
        .pointer("/choices/0/finish_reason")
        .and_then(Value::as_str)
        .map(String::from);
    let usage = v.get("usage").filter(|u| u.is_object()).map(parse_usage);
    if finish_reason.is_some() || usage.is_some() {
        events.push(StreamingEvent::Metadata {
            usage,
            finish_reason,
        });
    }

    Ok(events)
}

pub(crate) fn parse_usage(u: &Value) -> Usage {
    Usage {
        prompt_tokens: u["prompt_tokens"].as_u64().unwrap_or(0),
        completion_tokens: u["completion_tokens"].as_u64().unwrap_or(0),
        total_tokens: u["total_tokens"].as_u64().unwrap_or(0),
    }
}

fn stream_error(err: &Value) -> DispatchError {
    let message = err
        .get("message")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| err.to_string());
    let status = err
        .get("code")
        .and_then(|c| c.as_u64().or_else(|| c.as_str().and_then(|s| s.parse().ok())))
        .and_then(|c| u16::try_from(c).ok())
        .filter(|c| (400..600).contains(c))
        .unwrap_or(500);
    DispatchError::status(status, message)
}
