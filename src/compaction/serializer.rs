//! Flat transcript serialization for summarization.
//!
//! The compactable prefix is rendered into a line-oriented transcript the
//! summary model can digest. Large tool outputs are truncated; the
//! summary only needs their shape, not their full payload.

use anyhow::{bail, Result};

use crate::message::{Message, Part};

const TOOL_RESULT_TRUNCATION_LIMIT: usize = 500;
const TOOL_RESULT_TRUNCATION_SUFFIX: &str = "...[truncated]";

const USER_PREFIX: &str = "[User]:";
const ASSISTANT_PREFIX: &str = "[Assistant]:";
const TOOL_CALL_PREFIX: &str = "[Tool Call]:";
const TOOL_RESULT_PREFIX: &str = "[Tool Result]:";

/// Serialize messages into compact transcript text for summarization.
///
/// Blank content contributes no line; an empty input yields an empty
/// string. System messages are rejected outright: silently dropping them
/// would corrupt the summary's view of the conversation.
///
/// # Errors
/// Returns an error when the slice contains a system message.
pub fn serialize_messages(messages: &[Message]) -> Result<String> {
    let mut lines: Vec<String> = Vec::new();

    for message in messages {
        match message {
            Message::User { .. } => {
                push_text_line(&mut lines, USER_PREFIX, &message.text_content());
            }
            Message::Assistant { parts, .. } => {
                push_text_line(&mut lines, ASSISTANT_PREFIX, &message.text_content());
                for part in parts {
                    if let Part::ToolCall { name, args, .. } = part {
                        let serialized_args = serde_json::to_string(args)?;
                        lines.push(format!("{TOOL_CALL_PREFIX} {name}({serialized_args})"));
                    }
                }
            }
            Message::ToolResult { .. } => {
                let truncated = truncate_tool_result(message.text_content().trim());
                if !truncated.is_empty() {
                    lines.push(format!("{TOOL_RESULT_PREFIX} {truncated}"));
                }
            }
            Message::System { .. } => {
                bail!("system messages cannot be serialized for compaction");
            }
        }
    }

    Ok(lines.join("\n"))
}

fn push_text_line(lines: &mut Vec<String>, prefix: &str, content: &str) {
    let trimmed = content.trim();
    if !trimmed.is_empty() {
        lines.push(format!("{prefix} {trimmed}"));
    }
}

/// Truncate long tool output, slicing on char boundaries.
fn truncate_tool_result(content: &str) -> String {
    if content.chars().count() <= TOOL_RESULT_TRUNCATION_LIMIT {
        return content.to_string();
    }

    let prefix: String = content.chars().take(TOOL_RESULT_TRUNCATION_LIMIT).collect();
    format!("{prefix}{TOOL_RESULT_TRUNCATION_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::StopReason;
    use serde_json::json;

    #[test]
    fn test_serializes_roles_with_prefixes() {
        let messages = vec![
            Message::user("please list files"),
            Message::assistant("listing now", Some(StopReason::Complete)),
            Message::tool_result("tc-1", "file1.rs\nfile2.rs"),
        ];

        let transcript = serialize_messages(&messages).expect("serialize");
        assert!(transcript.contains("[User]: please list files"));
        assert!(transcript.contains("[Assistant]: listing now"));
        assert!(transcript.contains("[Tool Result]: file1.rs\nfile2.rs"));
    }

    #[test]
    fn test_tool_call_args_render_with_sorted_keys() {
        let message = Message::assistant_tool_call(
            "tc-1",
            "write_file",
            json!({"path": "/tmp/a", "content": "x"}),
        );

        let transcript = serialize_messages(&[message]).expect("serialize");
        // serde_json maps are sorted by key, so `content` precedes `path`.
        assert!(transcript
            .contains(r#"[Tool Call]: write_file({"content":"x","path":"/tmp/a"})"#));
    }

    #[test]
    fn test_assistant_text_line_precedes_tool_calls() {
        let message = Message::Assistant {
            parts: vec![
                Part::text("running the check"),
                Part::tool_call("tc-1", "bash", json!({"command": "cargo check"})),
            ],
            stop_reason: Some(StopReason::ToolCalls),
        };

        let transcript = serialize_messages(&[message]).expect("serialize");
        let lines: Vec<&str> = transcript.lines().collect();
        assert!(lines[0].starts_with("[Assistant]: running the check"));
        assert!(lines[1].starts_with("[Tool Call]: bash"));
    }

    #[test]
    fn test_long_tool_results_are_truncated() {
        let message = Message::tool_result("tc-1", "x".repeat(700));

        let transcript = serialize_messages(&[message]).expect("serialize");
        assert!(transcript.ends_with("...[truncated]"));
        assert!(transcript.contains(&"x".repeat(500)));
        assert!(!transcript.contains(&"x".repeat(501)));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let message = Message::tool_result("tc-1", "é".repeat(600));

        let transcript = serialize_messages(&[message]).expect("serialize");
        assert!(transcript.ends_with("...[truncated]"));
    }

    #[test]
    fn test_blank_content_contributes_no_line() {
        let messages = vec![
            Message::user("   "),
            Message::assistant("", Some(StopReason::Complete)),
            Message::tool_result("tc-1", " \n "),
        ];

        let transcript = serialize_messages(&messages).expect("serialize");
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_empty_input_yields_empty_string() {
        assert_eq!(serialize_messages(&[]).expect("serialize"), "");
    }

    #[test]
    fn test_system_messages_are_rejected() {
        let messages = vec![Message::System {
            parts: vec![Part::SystemPrompt {
                content: "be helpful".to_string(),
            }],
        }];

        assert!(serialize_messages(&messages).is_err());
    }
}
