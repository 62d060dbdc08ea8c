//! The typed conversation message model.
//!
//! Conversation history is an ordered list of [`Message`] values, each
//! carrying an ordered sequence of [`Part`]s. The model is deliberately
//! explicit: serialization and boundary logic pattern-match exhaustively
//! over variants instead of probing loosely-shaped maps, so a malformed
//! message shape cannot survive construction.
//!
//! Invariant: a [`Part::ToolCall`] is eventually matched by exactly one
//! [`Part::ToolReturn`] with the same id, unless the sanitizer removed it
//! as dangling (see [`crate::sanitizer`]).

use serde::{Deserialize, Serialize};

/// Why an assistant turn stopped producing output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model finished the turn on its own.
    Complete,
    /// The model stopped to request tool execution.
    ToolCalls,
}

/// A single content element inside a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    /// Plain text content.
    Text { content: String },
    /// Model reasoning content.
    Thought { content: String },
    /// A tool invocation emitted by the assistant.
    ToolCall {
        id: String,
        name: String,
        args: serde_json::Value,
    },
    /// The result produced for an earlier tool call.
    ToolReturn {
        tool_call_id: String,
        content: String,
    },
    /// System prompt content.
    SystemPrompt { content: String },
}

impl Part {
    /// Create a text part.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Create a tool call part.
    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        args: serde_json::Value,
    ) -> Self {
        Self::ToolCall {
            id: id.into(),
            name: name.into(),
            args,
        }
    }

    /// Create a tool return part.
    pub fn tool_return(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolReturn {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    /// Text-like content carried by this part, if any.
    ///
    /// Tool calls carry structured arguments instead of text and return
    /// `None` here.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Text { content }
            | Self::Thought { content }
            | Self::ToolReturn { content, .. }
            | Self::SystemPrompt { content } => Some(content),
            Self::ToolCall { .. } => None,
        }
    }

    /// Whether this part carries no meaningful content.
    ///
    /// Tool calls are never blank; their arguments may legitimately be
    /// an empty object.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self.content() {
            Some(content) => content.trim().is_empty(),
            None => false,
        }
    }
}

/// A single conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    User {
        parts: Vec<Part>,
        /// Marks a synthetic compaction-summary message so rendering can
        /// filter it while still sending it to the model.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        compaction_summary: bool,
    },
    Assistant {
        parts: Vec<Part>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stop_reason: Option<StopReason>,
    },
    ToolResult { parts: Vec<Part> },
    System { parts: Vec<Part> },
}

impl Message {
    /// Create a plain-text user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::User {
            parts: vec![Part::text(text)],
            compaction_summary: false,
        }
    }

    /// Create a plain-text assistant message with a stop reason.
    #[must_use]
    pub fn assistant(text: impl Into<String>, stop_reason: Option<StopReason>) -> Self {
        Self::Assistant {
            parts: vec![Part::text(text)],
            stop_reason,
        }
    }

    /// Create an assistant message carrying a single tool call.
    #[must_use]
    pub fn assistant_tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        args: serde_json::Value,
    ) -> Self {
        Self::Assistant {
            parts: vec![Part::tool_call(id, name, args)],
            stop_reason: Some(StopReason::ToolCalls),
        }
    }

    /// Create a tool result message for an earlier tool call.
    #[must_use]
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult {
            parts: vec![Part::tool_return(tool_call_id, content)],
        }
    }

    /// The ordered parts of this message, regardless of role.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        match self {
            Self::User { parts, .. }
            | Self::Assistant { parts, .. }
            | Self::ToolResult { parts }
            | Self::System { parts } => parts,
        }
    }

    /// Concatenated text-like content of all parts, newline-joined.
    #[must_use]
    pub fn text_content(&self) -> String {
        let texts: Vec<&str> = self.parts().iter().filter_map(Part::content).collect();
        texts.join("\n")
    }

    /// Whether this message marks a synthetic compaction summary.
    #[must_use]
    pub fn is_compaction_summary(&self) -> bool {
        matches!(
            self,
            Self::User {
                compaction_summary: true,
                ..
            }
        )
    }

    /// Whether a retention boundary may sit immediately after this message.
    ///
    /// Only a user turn, or an assistant turn that actually finished
    /// (carries a stop reason), may precede a boundary. An assistant turn
    /// without a stop reason was interrupted mid-stream and must stay with
    /// whatever follows it.
    #[must_use]
    pub fn is_valid_boundary_predecessor(&self) -> bool {
        match self {
            Self::User { .. } => true,
            Self::Assistant { stop_reason, .. } => stop_reason.is_some(),
            Self::ToolResult { .. } | Self::System { .. } => false,
        }
    }
}
