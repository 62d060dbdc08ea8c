//! Compaction orchestration for request-time context management.

use log::{debug, error, warn};
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::message::Message;

use super::boundary::retention_boundary;
use super::config::CompactionConfig;
use super::estimator::TokenEstimator;
use super::outcome::{CompactionOutcome, CompactionReason};
use super::record::CompactionRecord;
use super::serializer::serialize_messages;
use super::summarizer::{ContextSummarizer, SummaryGenerator};

/// Header line prepended to the synthetic summary message.
pub const COMPACTION_SUMMARY_HEADER: &str = "[Compaction summary]";

const COMPACTION_NOTICE_TEXT: &str = "Compacting context...";

/// Providers whose models may be used for summarization, with the
/// credential each one requires.
const SUPPORTED_SUMMARY_PROVIDERS: &[(&str, &str)] = &[("openrouter", "OPENROUTER_API_KEY")];

/// Fire-and-forget callback for user-facing notices.
pub type NoticeCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Fire-and-forget callback reporting whether compaction is in flight.
pub type StatusCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Ambient session state the controller needs, passed in explicitly
/// rather than read from globals.
#[derive(Clone, Debug)]
pub struct SessionEnv {
    /// Active model in `provider:model-id` form.
    pub model: String,
    /// The model's context window, in tokens.
    pub max_tokens: usize,
    /// Credentials by name (e.g. `OPENROUTER_API_KEY`).
    pub credentials: HashMap<String, String>,
}

impl SessionEnv {
    /// Create a session environment for a model with no credentials.
    #[must_use]
    pub fn new(model: impl Into<String>, max_tokens: usize) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            credentials: HashMap::new(),
        }
    }

    /// Add a credential by name.
    #[must_use]
    pub fn with_credential(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.credentials.insert(name.into(), value.into());
        self
    }
}

/// Single entry point for threshold checks and forced compaction.
///
/// The controller owns the session-scoped [`CompactionRecord`] and a
/// per-request dedupe flag; it never mutates the caller's buffer —
/// every outcome carries the sequence the caller should commit.
pub struct CompactionController {
    config: CompactionConfig,
    summarizer: ContextSummarizer,
    record: Option<CompactionRecord>,
    compacted_this_request: bool,
    notice_callback: Option<NoticeCallback>,
    status_callback: Option<StatusCallback>,
}

impl CompactionController {
    /// Create a controller around an injected summary generator.
    #[must_use]
    pub fn new(generator: Arc<dyn SummaryGenerator>, config: CompactionConfig) -> Self {
        Self {
            config,
            summarizer: ContextSummarizer::new(generator),
            record: None,
            compacted_this_request: false,
            notice_callback: None,
            status_callback: None,
        }
    }

    /// Create with default configuration.
    #[must_use]
    pub fn with_defaults(generator: Arc<dyn SummaryGenerator>) -> Self {
        Self::new(generator, CompactionConfig::default())
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &CompactionConfig {
        &self.config
    }

    /// The latest successful compaction record, if any.
    #[must_use]
    pub const fn record(&self) -> Option<&CompactionRecord> {
        self.record.as_ref()
    }

    /// Install a record loaded from persisted session state.
    pub fn load_record(&mut self, record: Option<CompactionRecord>) {
        self.record = record;
    }

    /// Set optional UI callbacks used during compaction.
    pub fn set_callbacks(
        &mut self,
        notice_callback: Option<NoticeCallback>,
        status_callback: Option<StatusCallback>,
    ) {
        self.notice_callback = notice_callback;
        self.status_callback = status_callback;
    }

    /// Reset the per-request idempotency guard. Call at the start of
    /// each logical request turn.
    pub fn reset_request_state(&mut self) {
        self.compacted_this_request = false;
    }

    /// Whether the estimated context exceeds the compaction threshold.
    ///
    /// The threshold leaves room for the retained-recent budget plus the
    /// reserve slack; a non-positive `max_tokens` never triggers.
    #[must_use]
    pub fn should_compact(&self, messages: &[Message], max_tokens: usize) -> bool {
        if max_tokens == 0 {
            return false;
        }

        let threshold = max_tokens
            .saturating_sub(self.config.reserve_tokens)
            .saturating_sub(self.config.keep_recent_tokens);
        TokenEstimator::estimate_messages(messages) > threshold
    }

    /// Compact if policy allows it, otherwise return a typed skip.
    ///
    /// `allow_threshold` gates automatic triggering for call sites where
    /// a mid-turn compaction would be disruptive.
    pub async fn check_and_compact(
        &mut self,
        messages: &[Message],
        env: &SessionEnv,
        cancel: Option<&CancellationToken>,
        allow_threshold: bool,
    ) -> CompactionOutcome {
        self.run(messages, env, cancel, false, allow_threshold).await
    }

    /// Bypass threshold checks and compact immediately.
    pub async fn force_compact(
        &mut self,
        messages: &[Message],
        env: &SessionEnv,
        cancel: Option<&CancellationToken>,
    ) -> CompactionOutcome {
        self.run(messages, env, cancel, true, true).await
    }

    /// Prepend a synthetic summary user message for model-facing context.
    ///
    /// No-op when there is no record, the summary is blank, or the first
    /// message already carries the marker.
    #[must_use]
    pub fn inject_summary_message(&self, messages: &[Message]) -> Vec<Message> {
        let Some(record) = &self.record else {
            return messages.to_vec();
        };

        let summary_text = record.summary.trim();
        if summary_text.is_empty() {
            return messages.to_vec();
        }

        if messages.first().is_some_and(Message::is_compaction_summary) {
            return messages.to_vec();
        }

        let summary_message = build_summary_user_message(summary_text);
        let mut injected = Vec::with_capacity(messages.len() + 1);
        injected.push(summary_message);
        injected.extend_from_slice(messages);
        injected
    }

    async fn run(
        &mut self,
        messages: &[Message],
        env: &SessionEnv,
        cancel: Option<&CancellationToken>,
        force: bool,
        allow_threshold: bool,
    ) -> CompactionOutcome {
        if self.compacted_this_request {
            debug!("compaction skipped: already compacted this request");
            return CompactionOutcome::skipped(
                CompactionReason::AlreadyCompacted,
                messages.to_vec(),
            );
        }

        if !force {
            if !allow_threshold {
                return CompactionOutcome::skipped(
                    CompactionReason::ThresholdNotAllowed,
                    messages.to_vec(),
                );
            }

            if !self.config.auto_compact {
                return CompactionOutcome::skipped(
                    CompactionReason::AutoDisabled,
                    messages.to_vec(),
                );
            }

            if !self.should_compact(messages, env.max_tokens) {
                return CompactionOutcome::skipped(
                    CompactionReason::BelowThreshold,
                    messages.to_vec(),
                );
            }
        }

        // One attempt per logical request, even when the attempt below
        // ends in a skip or failure.
        self.compacted_this_request = true;

        self.compact(messages, env, cancel).await
    }

    async fn compact(
        &mut self,
        messages: &[Message],
        env: &SessionEnv,
        cancel: Option<&CancellationToken>,
    ) -> CompactionOutcome {
        let boundary = retention_boundary(messages, self.config.keep_recent_tokens);
        if boundary == 0 {
            debug!("compaction skipped: no valid retention boundary");
            return CompactionOutcome::skipped(
                CompactionReason::NoValidBoundary,
                messages.to_vec(),
            );
        }

        let compactable = &messages[..boundary];
        if compactable.is_empty() {
            debug!("compaction skipped: no messages before retention boundary");
            return CompactionOutcome::skipped(
                CompactionReason::NoCompactableMessages,
                messages.to_vec(),
            );
        }

        if let Err((reason, detail)) = verify_summarization_capability(env) {
            debug!("compaction skipped: {} ({detail})", reason.as_str());
            return CompactionOutcome::skipped_with_detail(reason, detail, messages.to_vec());
        }

        let transcript = match serialize_messages(compactable) {
            Ok(transcript) => transcript,
            Err(serialize_error) => {
                error!("compaction serialization failed: {serialize_error:#}");
                return CompactionOutcome::failed(
                    CompactionReason::SummarizationFailed,
                    format!("{serialize_error:#}"),
                    messages.to_vec(),
                );
            }
        };
        if transcript.trim().is_empty() {
            debug!("compaction skipped: transcript is blank");
            return CompactionOutcome::skipped(
                CompactionReason::NoCompactableMessages,
                messages.to_vec(),
            );
        }

        let previous_summary = self.record.as_ref().map(|record| record.summary.clone());

        self.announce_compaction_start();
        let summary_result = self
            .summarizer
            .summarize_transcript(&transcript, previous_summary.as_deref(), cancel)
            .await;
        self.announce_compaction_end();

        let summary = match summary_result {
            Ok(summary) => summary,
            Err(summary_error) => {
                error!("compaction summarization failed: {summary_error:#}");
                return CompactionOutcome::failed(
                    CompactionReason::SummarizationFailed,
                    format!("{summary_error:#}"),
                    messages.to_vec(),
                );
            }
        };

        let retained = messages[boundary..].to_vec();
        self.record = Some(self.build_record(messages, &retained, boundary, summary));

        debug!(
            "compacted {boundary} messages, retained {} messages",
            retained.len()
        );
        CompactionOutcome::compacted(retained)
    }

    fn build_record(
        &self,
        all_messages: &[Message],
        retained_messages: &[Message],
        compacted_message_count: usize,
        summary: String,
    ) -> CompactionRecord {
        let previous = self.record.as_ref();
        let tokens_before = TokenEstimator::estimate_messages(all_messages);
        let tokens_after = TokenEstimator::estimate_messages(retained_messages)
            + TokenEstimator::estimate_text(&summary);

        CompactionRecord {
            summary,
            compacted_message_count,
            tokens_before,
            tokens_after,
            compaction_count: previous.map_or(1, |record| record.compaction_count + 1),
            previous_summary: previous.map(|record| record.summary.clone()),
            last_compacted_at: OffsetDateTime::now_utc(),
        }
    }

    fn announce_compaction_start(&self) {
        if let Some(status) = &self.status_callback {
            status(true);
        }
        if let Some(notice) = &self.notice_callback {
            notice(COMPACTION_NOTICE_TEXT);
        }
    }

    fn announce_compaction_end(&self) {
        if let Some(status) = &self.status_callback {
            status(false);
        }
    }
}

/// Split a `provider:model-id` string. A string without a separator is
/// treated as a bare provider id.
fn parse_model_ref(model: &str) -> (&str, &str) {
    model.split_once(':').unwrap_or((model, ""))
}

fn summary_credential_for(provider: &str) -> Option<&'static str> {
    SUPPORTED_SUMMARY_PROVIDERS
        .iter()
        .find(|(supported, _)| *supported == provider)
        .map(|(_, credential)| *credential)
}

fn verify_summarization_capability(
    env: &SessionEnv,
) -> Result<(), (CompactionReason, String)> {
    let (provider, _) = parse_model_ref(&env.model);

    let Some(credential) = summary_credential_for(provider) else {
        warn!("summarization unsupported for provider {provider}");
        return Err((
            CompactionReason::UnsupportedProvider,
            provider.to_string(),
        ));
    };

    let present = env
        .credentials
        .get(credential)
        .is_some_and(|value| !value.trim().is_empty());
    if !present {
        return Err((CompactionReason::MissingApiKey, credential.to_string()));
    }

    Ok(())
}

fn build_summary_user_message(summary_text: &str) -> Message {
    Message::User {
        parts: vec![crate::message::Part::text(format!(
            "{COMPACTION_SUMMARY_HEADER}\n\n{summary_text}"
        ))],
        compaction_summary: true,
    }
}
