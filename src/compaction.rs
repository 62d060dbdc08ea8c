//! Context compaction for long-running conversations.
//!
//! When a conversation approaches the model's context window, older
//! messages are summarized by a nested model call and replaced with a
//! compact structured summary, while a recent suffix is retained
//! verbatim. The split point never separates a tool call from its
//! result and never cuts into an interrupted assistant turn.
//!
//! # Overview
//!
//! 1. [`TokenEstimator`] approximates history size against the budget.
//! 2. [`retention_boundary`] picks the old/recent split point.
//! 3. [`serialize_messages`] flattens the old prefix into a transcript.
//! 4. [`ContextSummarizer`] drives the injected [`SummaryGenerator`].
//! 5. [`CompactionController`] orchestrates the whole attempt and
//!    produces a typed [`CompactionOutcome`] plus a persisted
//!    [`CompactionRecord`].
//!
//! The controller never mutates the caller-owned buffer; outcomes carry
//! the sequence the caller should commit.

mod boundary;
mod config;
mod controller;
mod estimator;
mod outcome;
mod prompts;
mod record;
mod serializer;
mod summarizer;


pub use boundary::retention_boundary;
pub use config::{CompactionConfig, DEFAULT_KEEP_RECENT_TOKENS, DEFAULT_RESERVE_TOKENS};
pub use controller::{
    CompactionController, NoticeCallback, SessionEnv, StatusCallback, COMPACTION_SUMMARY_HEADER,
};
pub use estimator::TokenEstimator;
pub use outcome::{
    build_compaction_notice, CompactionOutcome, CompactionReason, CompactionStatus,
};
pub use record::{CompactionRecord, RecordError};
pub use serializer::serialize_messages;
pub use summarizer::{ContextSummarizer, SummaryGenerator};
