//! Token estimation strategies.
//!
//! Estimates are deterministic approximations used only to decide when to
//! compress. They are never model-exact.

use crate::types::Message;

/// Swappable token approximation.
pub trait TokenEstimator: Send + Sync + std::fmt::Debug {
    /// Estimated tokens for a piece of text.
    fn estimate_text(&self, text: &str) -> usize;

    /// Estimated tokens for one message, including tool-call metadata.
    fn estimate_message(&self, message: &Message) -> usize {
        self.estimate_text(&message.estimation_text())
    }

    fn estimate_messages(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.estimate_message(m)).sum()
    }
}

/// Characters divided by a fixed ratio, rounded up. Empty text is zero tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharsPerToken {
    pub chars_per_token: usize,
}

impl CharsPerToken {
    pub const DEFAULT_RATIO: usize = 4;

    /// Ratios below one are treated as one.
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for CharsPerToken {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RATIO)
    }
}

impl TokenEstimator for CharsPerToken {
    fn estimate_text(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        text.chars().count().div_ceil(self.chars_per_token)
    }
}

/// One token per whitespace-separated word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordCount;

impl TokenEstimator for WordCount {
    fn estimate_text(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}
