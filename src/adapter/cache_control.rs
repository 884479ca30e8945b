//! Ephemeral prompt-cache annotation.

use crate::types::message::{CacheControl, ContentBlock, Message, MessageContent};

/// Maximum number of blocks annotated per request.
pub const CACHE_CONTROL_QUOTA: usize = 4;

/// Annotate the first [`CACHE_CONTROL_QUOTA`] eligible text blocks, scanning messages in order
/// and then content items in order. Plain string content becomes a single annotated text block.
/// Blocks the caller already annotated are skipped and do not consume the quota, and so is
/// blank text, which Anthropic refuses to cache.
///
/// Returns the number of blocks annotated.
pub fn apply_cache_control(messages: &mut [Message]) -> usize {
    let mut marked = 0;

    for message in messages.iter_mut() {
        if marked >= CACHE_CONTROL_QUOTA {
            break;
        }

        match &mut message.content {
            None => {}
            Some(MessageContent::Text(text)) => {
                if is_blank(text) {
                    continue;
                }
                let text = std::mem::take(text);
                message.content = Some(MessageContent::Blocks(vec![ContentBlock::Text {
                    text,
                    cache_control: Some(CacheControl::ephemeral()),
                }]));
                marked += 1;
            }
            Some(MessageContent::Blocks(blocks)) => {
                for block in blocks.iter_mut() {
                    if marked >= CACHE_CONTROL_QUOTA {
                        break;
                    }
                    if let ContentBlock::Text {
                        text,
                        cache_control,
                    } = block
                    {
                        if cache_control.is_none() && !is_blank(text) {
                            *cache_control = Some(CacheControl::ephemeral());
                            marked += 1;
                        }
                    }
                }
            }
        }
    }

    marked
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::message::MessageRole;

    fn total_marked(messages: &[Message]) -> usize {
        messages.iter().map(|m| m.cache_marked_blocks()).sum()
    }

    #[test]
    fn marks_at_most_four_in_order() {
        let mut messages: Vec<Message> = (0..6).map(|i| Message::user(format!("m{}", i))).collect();
        assert_eq!(apply_cache_control(&mut messages), 4);
        assert_eq!(total_marked(&messages), 4);
        for m in &messages[..4] {
            assert_eq!(m.cache_marked_blocks(), 1);
        }
        assert_eq!(messages[4].content, Some(MessageContent::Text("m4".into())));
        assert_eq!(messages[5].content, Some(MessageContent::Text("m5".into())));
    }

    #[test]
    fn scans_blocks_within_a_message_in_order() {
        let mut messages = vec![
            Message::with_content(
                MessageRole::User,
                MessageContent::blocks(vec![
                    ContentBlock::text("a"),
                    ContentBlock::image_url("https://example.com/x.png"),
                    ContentBlock::text("b"),
                    ContentBlock::text("c"),
                ]),
            ),
            Message::system("d"),
            Message::user("e"),
        ];
        assert_eq!(apply_cache_control(&mut messages), 4);
        assert_eq!(messages[0].cache_marked_blocks(), 3);
        assert_eq!(messages[1].cache_marked_blocks(), 1);
        assert_eq!(messages[2].content, Some(MessageContent::Text("e".into())));
    }

    #[test]
    fn preannotated_blocks_are_not_eligible() {
        let mut messages = vec![Message::with_content(
            MessageRole::System,
            MessageContent::blocks(vec![
                ContentBlock::Text {
                    text: "cached".into(),
                    cache_control: Some(CacheControl::ephemeral()),
                },
                ContentBlock::text("fresh"),
            ]),
        )];
        assert_eq!(apply_cache_control(&mut messages), 1);
        assert_eq!(messages[0].cache_marked_blocks(), 2);
    }

    #[test]
    fn blank_text_is_skipped_without_using_quota() {
        let mut messages = vec![
            Message::system(""),
            Message::with_content(
                MessageRole::User,
                MessageContent::blocks(vec![ContentBlock::text("  "), ContentBlock::text("a")]),
            ),
            Message::user("b"),
            Message::user("c"),
            Message::user("d"),
            Message::user("e"),
        ];
        assert_eq!(apply_cache_control(&mut messages), 4);
        assert_eq!(messages[0].content, Some(MessageContent::Text(String::new())));
        assert_eq!(messages[1].cache_marked_blocks(), 1);
        assert_eq!(messages[4].cache_marked_blocks(), 1);
        assert_eq!(messages[5].cache_marked_blocks(), 0);
    }

    #[test]
    fn tool_call_turns_without_content_are_passed_over() {
        use crate::types::tool::ToolCall;
        let call = ToolCall {
            id: "call_1".into(),
            name: "lookup".into(),
            arguments: serde_json::json!({}),
        };
        let mut messages = vec![Message::assistant_tool_calls(&[call]), Message::tool("call_1", "42")];
        assert_eq!(apply_cache_control(&mut messages), 1);
        assert!(messages[0].content.is_none());
        assert_eq!(messages[1].cache_marked_blocks(), 1);
    }

    #[test]
    fn roles_and_order_are_untouched() {
        let mut messages = vec![Message::system("s"), Message::user("u"), Message::assistant("a")];
        apply_cache_control(&mut messages);
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::System, MessageRole::User, MessageRole::Assistant]
        );
    }
}
