//! Retention boundary selection.
//!
//! The boundary index splits history into a compactable prefix
//! (`messages[..boundary]`) and a suffix retained verbatim
//! (`messages[boundary..]`). Selection never splits a tool call from its
//! result and never cuts into an interrupted assistant turn: when no
//! structurally valid boundary exists, the whole history is retained.

use crate::message::Message;

use super::estimator::TokenEstimator;

/// Return the boundary index where older messages should be compacted.
///
/// Walks backward accumulating token estimates until at least
/// `keep_recent_tokens` worth of recent messages is covered (inclusive
/// equality counts as covered), then snaps down to the nearest index that
/// is valid under the atomicity rules:
///
/// - the message before the boundary must be a user turn or a finished
///   assistant turn, and
/// - the message at the boundary must not be a tool result, which would
///   be orphaned from its call.
///
/// Returns 0 (compact nothing) when the history is smaller than the
/// retention budget or when no valid boundary exists.
#[must_use]
pub fn retention_boundary(messages: &[Message], keep_recent_tokens: usize) -> usize {
    if messages.is_empty() {
        return 0;
    }

    let Some(threshold_index) = find_threshold_index(messages, keep_recent_tokens) else {
        return 0;
    };

    snap_to_valid_boundary(messages, threshold_index)
}

/// First index (scanning from the end) at which the inclusive accumulated
/// token estimate reaches the retention budget.
fn find_threshold_index(messages: &[Message], keep_recent_tokens: usize) -> Option<usize> {
    let mut accumulated_tokens = 0usize;
    for index in (0..messages.len()).rev() {
        accumulated_tokens += TokenEstimator::estimate_message(&messages[index]);
        if accumulated_tokens >= keep_recent_tokens {
            return Some(index);
        }
    }
    None
}

fn snap_to_valid_boundary(messages: &[Message], threshold_index: usize) -> usize {
    (1..=threshold_index)
        .rev()
        .find(|&boundary| is_valid_boundary(messages, boundary))
        .unwrap_or(0)
}

fn is_valid_boundary(messages: &[Message], boundary: usize) -> bool {
    if boundary == 0 || boundary > messages.len() {
        return false;
    }

    if !messages[boundary - 1].is_valid_boundary_predecessor() {
        return false;
    }

    if boundary == messages.len() {
        return true;
    }

    !matches!(messages[boundary], Message::ToolResult { .. })
}
