//! Summary generation over the compactable prefix.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::message::Message;

use super::prompts::{fresh_summary_prompt, iterative_summary_prompt};
use super::serializer::serialize_messages;

/// Injected capability that turns a prompt into summary text.
///
/// This is the only suspending operation in the subsystem: a nested model
/// call made by the host application. Implementations should honor the
/// cancellation token and return promptly when it fires; the summarizer
/// additionally races the call against the token so a stuck generator
/// cannot wedge compaction.
///
/// An `Ok` return with empty or whitespace-only text is treated as a
/// failure by the caller.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    /// Generate summary text for the given prompt.
    ///
    /// # Errors
    /// Returns an error if the summary model call fails.
    async fn generate(&self, prompt: &str, cancel: Option<&CancellationToken>) -> Result<String>;
}

/// Compaction helper that serializes a prefix and drives the generator.
pub struct ContextSummarizer {
    generator: Arc<dyn SummaryGenerator>,
}

impl ContextSummarizer {
    /// Create a summarizer over an injected generator.
    #[must_use]
    pub fn new(generator: Arc<dyn SummaryGenerator>) -> Self {
        Self { generator }
    }

    /// Generate (or iteratively update) a structured compaction summary.
    ///
    /// # Errors
    /// Returns an error when the transcript is blank, the generator
    /// fails or is cancelled, or the generated summary is blank.
    pub async fn summarize(
        &self,
        messages: &[Message],
        previous_summary: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<String> {
        let serialized = serialize_messages(messages)?;
        if serialized.trim().is_empty() {
            bail!("cannot summarize an empty message transcript");
        }

        self.summarize_transcript(&serialized, previous_summary, cancel)
            .await
    }

    /// Summarize an already-serialized transcript.
    ///
    /// # Errors
    /// Returns an error when the generator fails, is cancelled, or
    /// returns a blank summary.
    pub async fn summarize_transcript(
        &self,
        transcript: &str,
        previous_summary: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<String> {
        let prompt = build_summary_prompt(transcript, previous_summary);
        let summary = self.invoke_generator(&prompt, cancel).await?;

        let normalized = summary.trim();
        if normalized.is_empty() {
            bail!("summary model returned an empty summary");
        }

        Ok(normalized.to_string())
    }

    async fn invoke_generator(
        &self,
        prompt: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<String> {
        match cancel {
            Some(token) => {
                // Biased so cancellation always wins the race, even when
                // the generator is already ready or the token was
                // cancelled before the call started.
                tokio::select! {
                    biased;
                    () = token.cancelled() => bail!("summarization cancelled"),
                    result = self.generator.generate(prompt, cancel) => result,
                }
            }
            None => self.generator.generate(prompt, None).await,
        }
    }
}

fn build_summary_prompt(serialized_messages: &str, previous_summary: Option<&str>) -> String {
    match previous_summary.map(str::trim) {
        Some(previous) if !previous.is_empty() => {
            iterative_summary_prompt(previous, serialized_messages)
        }
        _ => fresh_summary_prompt(serialized_messages),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::StopReason;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FixedGenerator {
        response: String,
        prompts: Mutex<Vec<String>>,
    }

    impl FixedGenerator {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SummaryGenerator for FixedGenerator {
        async fn generate(
            &self,
            prompt: &str,
            _cancel: Option<&CancellationToken>,
        ) -> Result<String> {
            self.prompts
                .lock()
                .expect("prompt log lock")
                .push(prompt.to_string());
            Ok(self.response.clone())
        }
    }

    struct HangingGenerator;

    #[async_trait]
    impl SummaryGenerator for HangingGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _cancel: Option<&CancellationToken>,
        ) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    fn sample_messages() -> Vec<Message> {
        vec![
            Message::user("fix the bug in main.rs"),
            Message::assistant("patched it", Some(StopReason::Complete)),
        ]
    }

    #[tokio::test]
    async fn test_fresh_summary_uses_fresh_prompt() -> Result<()> {
        let generator = Arc::new(FixedGenerator::new("## Goal\nFix the bug"));
        let summarizer = ContextSummarizer::new(generator.clone());

        let summary = summarizer.summarize(&sample_messages(), None, None).await?;
        assert_eq!(summary, "## Goal\nFix the bug");

        let prompts = generator.prompts.lock().expect("prompt log lock");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("[User]: fix the bug in main.rs"));
        assert!(!prompts[0].contains("Previous summary"));
        Ok(())
    }

    #[tokio::test]
    async fn test_iterative_summary_embeds_previous() -> Result<()> {
        let generator = Arc::new(FixedGenerator::new("## Goal\nUpdated"));
        let summarizer = ContextSummarizer::new(generator.clone());

        summarizer
            .summarize(&sample_messages(), Some("## Goal\nOld state"), None)
            .await?;

        let prompts = generator.prompts.lock().expect("prompt log lock");
        assert!(prompts[0].contains("Previous summary:\n## Goal\nOld state"));
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_previous_summary_falls_back_to_fresh() -> Result<()> {
        let generator = Arc::new(FixedGenerator::new("## Goal\nFresh"));
        let summarizer = ContextSummarizer::new(generator.clone());

        summarizer
            .summarize(&sample_messages(), Some("   "), None)
            .await?;

        let prompts = generator.prompts.lock().expect("prompt log lock");
        assert!(!prompts[0].contains("Previous summary"));
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_transcript_is_an_error() {
        let summarizer = ContextSummarizer::new(Arc::new(FixedGenerator::new("summary")));
        let messages = vec![Message::user("   ")];

        let result = summarizer.summarize(&messages, None, None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_blank_summary_is_an_error() {
        let summarizer = ContextSummarizer::new(Arc::new(FixedGenerator::new("  \n ")));

        let result = summarizer.summarize(&sample_messages(), None, None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_precancelled_token_wins_over_ready_generator() {
        // The generator resolves immediately; an already-cancelled token
        // must still abort the call before its result is accepted.
        let summarizer = ContextSummarizer::new(Arc::new(FixedGenerator::new("## Goal\nDone")));
        let token = CancellationToken::new();
        token.cancel();

        let result = summarizer
            .summarize(&sample_messages(), None, Some(&token))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cancellation_aborts_a_stuck_generator() {
        let summarizer = ContextSummarizer::new(Arc::new(HangingGenerator));
        let token = CancellationToken::new();
        token.cancel();

        let result = summarizer
            .summarize(&sample_messages(), None, Some(&token))
            .await;
        assert!(result.is_err());
    }
}
