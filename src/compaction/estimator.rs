//! Token estimation for context budgeting.

use crate::message::{Message, Part};

/// Estimates token counts with a fixed chars-per-token heuristic.
///
/// This is an approximation for budget checks and compaction heuristics,
/// not billing-accurate accounting. Actual provider tokenizers vary;
/// downstream threshold checks must include slack (see
/// [`CompactionConfig::reserve_tokens`](super::CompactionConfig)).
pub struct TokenEstimator;

impl TokenEstimator {
    /// Characters per token estimate. The real ratio varies by content.
    const CHARS_PER_TOKEN: usize = 4;

    /// Estimate tokens for a text string.
    #[must_use]
    pub const fn estimate_text(text: &str) -> usize {
        text.len() / Self::CHARS_PER_TOKEN
    }

    /// Estimate tokens for a single message.
    ///
    /// Sums the character length of every part's content; tool calls
    /// contribute their id, name, and the JSON string form of their
    /// arguments. Never fails.
    #[must_use]
    pub fn estimate_message(message: &Message) -> usize {
        let total_chars: usize = message.parts().iter().map(Self::part_chars).sum();
        total_chars / Self::CHARS_PER_TOKEN
    }

    /// Estimate total tokens for a message history.
    #[must_use]
    pub fn estimate_messages(messages: &[Message]) -> usize {
        messages.iter().map(Self::estimate_message).sum()
    }

    fn part_chars(part: &Part) -> usize {
        match part {
            Part::ToolCall { id, name, args } => {
                let args_text = serde_json::to_string(args).unwrap_or_default();
                id.len() + name.len() + args_text.len()
            }
            Part::Text { content }
            | Part::Thought { content }
            | Part::ToolReturn { content, .. }
            | Part::SystemPrompt { content } => content.len(),
        }
    }
}
