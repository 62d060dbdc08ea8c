//! Configuration for compaction behavior.

use serde::{Deserialize, Serialize};

/// Default token budget retained verbatim at the tail of history.
pub const DEFAULT_KEEP_RECENT_TOKENS: usize = 20_000;

/// Default slack reserved for the next response and estimator error.
pub const DEFAULT_RESERVE_TOKENS: usize = 16_384;

/// Controls when compaction triggers and how much history it retains.
///
/// # Example
///
/// ```
/// use agent_context::CompactionConfig;
///
/// let config = CompactionConfig::default()
///     .with_keep_recent_tokens(10_000)
///     .with_auto_compact(false);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompactionConfig {
    /// Estimated tokens of recent history kept verbatim.
    pub keep_recent_tokens: usize,

    /// Tokens held back from the model's budget before the threshold
    /// check. Covers the next response plus estimator imprecision.
    pub reserve_tokens: usize,

    /// Whether the threshold check may trigger compaction automatically.
    /// When false, only forced/manual compaction runs.
    pub auto_compact: bool,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            keep_recent_tokens: DEFAULT_KEEP_RECENT_TOKENS,
            reserve_tokens: DEFAULT_RESERVE_TOKENS,
            auto_compact: true,
        }
    }
}

impl CompactionConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retained-recent token budget.
    #[must_use]
    pub const fn with_keep_recent_tokens(mut self, tokens: usize) -> Self {
        self.keep_recent_tokens = tokens;
        self
    }

    /// Set the reserved token slack.
    #[must_use]
    pub const fn with_reserve_tokens(mut self, tokens: usize) -> Self {
        self.reserve_tokens = tokens;
        self
    }

    /// Set whether automatic compaction is allowed.
    #[must_use]
    pub const fn with_auto_compact(mut self, auto: bool) -> Self {
        self.auto_compact = auto;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompactionConfig::default();
        assert_eq!(config.keep_recent_tokens, DEFAULT_KEEP_RECENT_TOKENS);
        assert_eq!(config.reserve_tokens, DEFAULT_RESERVE_TOKENS);
        assert!(config.auto_compact);
    }

    #[test]
    fn test_builder_pattern() {
        let config = CompactionConfig::new()
            .with_keep_recent_tokens(5_000)
            .with_reserve_tokens(1_024)
            .with_auto_compact(false);

        assert_eq!(config.keep_recent_tokens, 5_000);
        assert_eq!(config.reserve_tokens, 1_024);
        assert!(!config.auto_compact);
    }
}
