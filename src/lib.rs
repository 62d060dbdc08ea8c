//! Context retention for LLM coding agents.
//!
//! This crate keeps long multi-turn conversations bounded without
//! breaking semantic integrity. It provides:
//!
//! - A typed [`Message`]/[`Part`] model for conversation history
//! - Token estimation and retention-boundary selection under atomicity
//!   constraints (a tool call is never split from its result)
//! - A compaction state machine that summarizes old history through an
//!   injected [`SummaryGenerator`] and reports typed outcomes
//! - A history sanitizer that repairs structurally invalid buffers
//!   (dangling tool calls, empty assistant turns, duplicate user turns)
//!   before a request is sent
//!
//! # Example
//!
//! ```no_run
//! use agent_context::{
//!     CompactionConfig, CompactionController, CompactionStatus, SessionEnv, SummaryGenerator,
//! };
//! use std::sync::Arc;
//!
//! # async fn run(generator: Arc<dyn SummaryGenerator>) {
//! let mut controller = CompactionController::new(
//!     generator,
//!     CompactionConfig::default().with_keep_recent_tokens(20_000),
//! );
//! let env = SessionEnv::new("openrouter:openai/gpt-4.1", 128_000)
//!     .with_credential("OPENROUTER_API_KEY", "sk-...");
//!
//! let history = vec![/* session-owned conversation buffer */];
//! controller.reset_request_state();
//! let outcome = controller
//!     .check_and_compact(&history, &env, None, true)
//!     .await;
//! if outcome.status == CompactionStatus::Compacted {
//!     // commit outcome.messages back to the session
//! }
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod compaction;
mod message;
pub mod sanitizer;

pub use compaction::{
    build_compaction_notice, retention_boundary, serialize_messages, CompactionConfig,
    CompactionController, CompactionOutcome, CompactionReason, CompactionRecord,
    CompactionStatus, ContextSummarizer, NoticeCallback, RecordError, SessionEnv,
    StatusCallback, SummaryGenerator, TokenEstimator, COMPACTION_SUMMARY_HEADER,
    DEFAULT_KEEP_RECENT_TOKENS, DEFAULT_RESERVE_TOKENS,
};
pub use message::{Message, Part, StopReason};
pub use sanitizer::{
    find_dangling_tool_call_ids, remove_consecutive_requests, remove_dangling_tool_calls,
    remove_empty_responses, sanitize_history, strip_system_messages, SanitizeReport,
};
