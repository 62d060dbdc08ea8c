//! Typed compaction outcomes.

use crate::message::Message;

/// Coarse result of a compaction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionStatus {
    /// Old messages were summarized and replaced.
    Compacted,
    /// Compaction was not applicable; the conversation proceeds as-is.
    Skipped,
    /// Compaction was attempted and failed; nothing was mutated.
    Failed,
}

/// Specific reason behind a compaction outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionReason {
    Compacted,
    AlreadyCompacted,
    ThresholdNotAllowed,
    AutoDisabled,
    BelowThreshold,
    NoValidBoundary,
    NoCompactableMessages,
    UnsupportedProvider,
    MissingApiKey,
    SummarizationFailed,
}

impl CompactionReason {
    /// Stable snake_case string form, used in logs and notices.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compacted => "compacted",
            Self::AlreadyCompacted => "already_compacted",
            Self::ThresholdNotAllowed => "threshold_not_allowed",
            Self::AutoDisabled => "auto_disabled",
            Self::BelowThreshold => "below_threshold",
            Self::NoValidBoundary => "no_valid_boundary",
            Self::NoCompactableMessages => "no_compactable_messages",
            Self::UnsupportedProvider => "unsupported_provider",
            Self::MissingApiKey => "missing_api_key",
            Self::SummarizationFailed => "summarization_failed",
        }
    }
}

impl std::fmt::Display for CompactionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable result of one compaction attempt.
///
/// `messages` always carries the sequence the caller should commit: the
/// compacted suffix on success, or the untouched input on skip/failure.
#[derive(Debug, Clone)]
pub struct CompactionOutcome {
    pub status: CompactionStatus,
    pub reason: CompactionReason,
    pub detail: Option<String>,
    pub messages: Vec<Message>,
}

impl CompactionOutcome {
    pub(crate) fn compacted(messages: Vec<Message>) -> Self {
        Self {
            status: CompactionStatus::Compacted,
            reason: CompactionReason::Compacted,
            detail: None,
            messages,
        }
    }

    pub(crate) fn skipped(reason: CompactionReason, messages: Vec<Message>) -> Self {
        Self {
            status: CompactionStatus::Skipped,
            reason,
            detail: None,
            messages,
        }
    }

    pub(crate) fn skipped_with_detail(
        reason: CompactionReason,
        detail: impl Into<String>,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            status: CompactionStatus::Skipped,
            reason,
            detail: Some(detail.into()),
            messages,
        }
    }

    pub(crate) fn failed(
        reason: CompactionReason,
        detail: impl Into<String>,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            status: CompactionStatus::Failed,
            reason,
            detail: Some(detail.into()),
            messages,
        }
    }
}

/// Render a user-facing notice for an outcome worth surfacing.
///
/// Successful compactions and quiet skips (dedupe, threshold) return
/// `None`; capability problems and failures return a single line the UI
/// can display verbatim.
#[must_use]
pub fn build_compaction_notice(outcome: &CompactionOutcome) -> Option<String> {
    let detail = outcome.detail.as_deref().unwrap_or("unknown");
    match outcome.reason {
        CompactionReason::UnsupportedProvider => Some(format!(
            "Compaction skipped: unsupported summarization provider '{detail}'"
        )),
        CompactionReason::MissingApiKey => Some(format!(
            "Compaction skipped: missing credential {detail}"
        )),
        CompactionReason::SummarizationFailed => {
            Some(format!("Compaction failed: {detail}"))
        }
        CompactionReason::Compacted
        | CompactionReason::AlreadyCompacted
        | CompactionReason::ThresholdNotAllowed
        | CompactionReason::AutoDisabled
        | CompactionReason::BelowThreshold
        | CompactionReason::NoValidBoundary
        | CompactionReason::NoCompactableMessages => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_strings_are_snake_case() {
        assert_eq!(CompactionReason::AlreadyCompacted.as_str(), "already_compacted");
        assert_eq!(CompactionReason::NoValidBoundary.as_str(), "no_valid_boundary");
        assert_eq!(
            CompactionReason::SummarizationFailed.as_str(),
            "summarization_failed"
        );
    }

    #[test]
    fn test_notice_for_capability_skips() {
        let outcome = CompactionOutcome::skipped_with_detail(
            CompactionReason::UnsupportedProvider,
            "azure",
            vec![],
        );
        let notice = build_compaction_notice(&outcome).expect("notice");
        assert!(notice.contains("unsupported summarization provider 'azure'"));

        let outcome = CompactionOutcome::skipped_with_detail(
            CompactionReason::MissingApiKey,
            "OPENROUTER_API_KEY",
            vec![],
        );
        let notice = build_compaction_notice(&outcome).expect("notice");
        assert!(notice.contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn test_quiet_outcomes_have_no_notice() {
        let outcome = CompactionOutcome::compacted(vec![]);
        assert!(build_compaction_notice(&outcome).is_none());

        let outcome =
            CompactionOutcome::skipped(CompactionReason::BelowThreshold, vec![]);
        assert!(build_compaction_notice(&outcome).is_none());
    }
}
