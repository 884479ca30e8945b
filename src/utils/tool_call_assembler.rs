use crate::types::tool::ToolCall;
use crate::types::StreamingEvent;

#[derive(Debug, Default)]
struct PendingCall {
    index: Option<u32>,
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Collects streamed tool-call fragments into final [`ToolCall`] objects.
///
/// OpenAI-style deltas carry `id`/`name` only on the first fragment of each call and the
/// `index` on every fragment, so fragments are matched by index first, then by id.
/// Tolerant: if the joined arguments are not valid JSON, the raw string is kept.
#[derive(Debug, Default)]
pub struct ToolCallAssembler {
    calls: Vec<PendingCall>,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event; anything other than [`StreamingEvent::PartialToolCall`] is ignored.
    pub fn on_event(&mut self, event: &StreamingEvent) {
        if let StreamingEvent::PartialToolCall {
            tool_call_id,
            tool_name,
            arguments,
            index,
        } = event
        {
            self.on_fragment(*index, tool_call_id.as_deref(), tool_name.as_deref(), arguments);
        }
    }

    pub fn on_fragment(
        &mut self,
        index: Option<u32>,
        id: Option<&str>,
        name: Option<&str>,
        fragment: &str,
    ) {
        let existing = match (index, id) {
            (Some(i), _) => self.calls.iter().position(|c| c.index == Some(i)),
            (None, Some(id)) => self.calls.iter().position(|c| c.id.as_deref() == Some(id)),
            // No correlation key at all: continue the most recent call.
            (None, None) => self.calls.len().checked_sub(1),
        };
        let pos = match existing {
            Some(p) => p,
            None => {
                self.calls.push(PendingCall {
                    index,
                    ..PendingCall::default()
                });
                self.calls.len() - 1
            }
        };

        let call = &mut self.calls[pos];
        if call.id.is_none() {
            call.id = id.map(String::from);
        }
        if call.name.is_none() {
            call.name = name.map(String::from);
        }
        call.arguments.push_str(fragment);
    }

    pub fn finalize(self) -> Vec<ToolCall> {
        self.calls
            .into_iter()
            .enumerate()
            .map(|(i, c)| {
                let trimmed = c.arguments.trim();
                let arguments = if trimmed.is_empty() {
                    serde_json::Value::Object(Default::default())
                } else {
                    serde_json::from_str(trimmed)
                        .unwrap_or_else(|_| serde_json::Value::String(c.arguments.clone()))
                };
                ToolCall {
                    id: c.id.unwrap_or_else(|| format!("call_{}", i)),
                    name: c.name.unwrap_or_default(),
                    arguments,
                }
            })
            .collect()
    }
}
