//! Message history sanitization.
//!
//! Aborted streams and crashed tool runs leave structural artifacts in
//! the conversation buffer that providers reject: tool calls with no
//! result, assistant turns with nothing in them, duplicated user turns.
//! This module repairs the buffer before each request.
//!
//! Cleanup operations:
//! - Remove dangling tool calls (a call whose id never gets a result)
//! - Remove empty assistant messages
//! - Collapse back-to-back duplicate user messages
//!
//! Each operation mutates the buffer in place and reports whether it
//! changed anything; [`sanitize_history`] runs them to a fixed point.

use log::{debug, warn};
use std::collections::HashSet;

use crate::message::{Message, Part};

const MAX_CLEANUP_ITERATIONS: usize = 10;

/// What a sanitization pass did to the buffer.
#[derive(Debug, Clone, Default)]
pub struct SanitizeReport {
    /// Whether any cleanup was applied.
    pub changed: bool,
    /// Tool call ids found dangling on the first iteration.
    pub dangling_tool_call_ids: HashSet<String>,
}

/// Return tool call ids that never receive a matching tool result
/// later in the buffer.
#[must_use]
pub fn find_dangling_tool_call_ids(messages: &[Message]) -> HashSet<String> {
    let mut dangling = HashSet::new();

    for (index, message) in messages.iter().enumerate() {
        for part in message.parts() {
            let Part::ToolCall { id, .. } = part else {
                continue;
            };
            if !has_later_tool_return(messages, index, id) {
                dangling.insert(id.clone());
            }
        }
    }

    dangling
}

fn has_later_tool_return(messages: &[Message], call_index: usize, call_id: &str) -> bool {
    messages[call_index + 1..].iter().any(|message| {
        message.parts().iter().any(|part| {
            matches!(part, Part::ToolReturn { tool_call_id, .. } if tool_call_id == call_id)
        })
    })
}

/// Remove dangling tool call parts from assistant messages, dropping any
/// assistant message whose parts empty out entirely.
///
/// Returns whether anything was removed.
pub fn remove_dangling_tool_calls(messages: &mut Vec<Message>) -> bool {
    if messages.is_empty() {
        return false;
    }

    let dangling = find_dangling_tool_call_ids(messages);
    if dangling.is_empty() {
        return false;
    }

    let mut removed_any = false;
    let mut kept: Vec<Message> = Vec::with_capacity(messages.len());

    for message in messages.drain(..) {
        let Message::Assistant { parts, stop_reason } = message else {
            kept.push(message);
            continue;
        };

        let original_len = parts.len();
        let filtered: Vec<Part> = parts
            .into_iter()
            .filter(|part| match part {
                Part::ToolCall { id, .. } => {
                    let keep = !dangling.contains(id);
                    if !keep {
                        debug!("pruned dangling tool call {id}");
                    }
                    keep
                }
                _ => true,
            })
            .collect();

        if filtered.len() != original_len {
            removed_any = true;
        }

        // Only tool calls were present and all of them were pruned.
        if filtered.is_empty() && filtered.len() != original_len {
            continue;
        }

        kept.push(Message::Assistant {
            parts: filtered,
            stop_reason,
        });
    }

    *messages = kept;
    removed_any
}

/// Remove assistant messages whose parts are all blank.
///
/// Returns whether anything was removed.
pub fn remove_empty_responses(messages: &mut Vec<Message>) -> bool {
    let before = messages.len();
    messages.retain(|message| !is_empty_assistant_message(message));

    let removed = before - messages.len();
    if removed > 0 {
        debug!("removed {removed} empty assistant messages");
    }
    removed > 0
}

fn is_empty_assistant_message(message: &Message) -> bool {
    let Message::Assistant { parts, .. } = message else {
        return false;
    };
    parts.iter().all(Part::is_blank)
}

/// Collapse back-to-back duplicate user messages with identical content,
/// keeping the last of each run.
///
/// Returns whether anything was removed.
pub fn remove_consecutive_requests(messages: &mut Vec<Message>) -> bool {
    if messages.len() < 2 {
        return false;
    }

    let mut removed_any = false;
    let mut index = 0;
    while index + 1 < messages.len() {
        let duplicate = matches!(
            (&messages[index], &messages[index + 1]),
            (Message::User { .. }, Message::User { .. })
        ) && messages[index] == messages[index + 1];

        if duplicate {
            debug!("removed duplicate consecutive user message at index {index}");
            messages.remove(index);
            removed_any = true;
        } else {
            index += 1;
        }
    }

    removed_any
}

/// Return a copy of the buffer without system messages, for transports
/// that inject the system prompt separately.
#[must_use]
pub fn strip_system_messages(messages: &[Message]) -> Vec<Message> {
    messages
        .iter()
        .filter(|message| !matches!(message, Message::System { .. }))
        .cloned()
        .collect()
}

/// Run all cleanup operations until the buffer stabilizes.
///
/// Pathological input is bounded: after ten iterations without reaching
/// a fixed point the loop stops and logs a warning.
pub fn sanitize_history(messages: &mut Vec<Message>) -> SanitizeReport {
    let mut report = SanitizeReport {
        changed: false,
        dangling_tool_call_ids: find_dangling_tool_call_ids(messages),
    };

    for iteration in 0..MAX_CLEANUP_ITERATIONS {
        let mut any_cleanup = false;

        if remove_dangling_tool_calls(messages) {
            any_cleanup = true;
        }
        if remove_empty_responses(messages) {
            any_cleanup = true;
        }
        if remove_consecutive_requests(messages) {
            any_cleanup = true;
        }

        if !any_cleanup {
            return report;
        }
        report.changed = true;

        if iteration == MAX_CLEANUP_ITERATIONS - 1 {
            warn!("message cleanup did not stabilize after {MAX_CLEANUP_ITERATIONS} iterations");
        }
    }

    report
}
