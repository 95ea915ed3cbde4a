//! Token usage reported by the model boundary.

use serde::{Deserialize, Serialize};

/// Token usage for a model call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Usage {
    pub estimated_tokens: u64,
}

impl Usage {
    pub fn new(estimated_tokens: u64) -> Self {
        Self { estimated_tokens }
    }

    /// Merge another usage into this one (accumulate).
    pub fn merge(&mut self, other: &Usage) {
        self.estimated_tokens = self.estimated_tokens.saturating_add(other.estimated_tokens);
    }
}
