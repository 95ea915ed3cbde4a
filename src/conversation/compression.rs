//! Conversation history compression.
//!
//! When the running token estimate crosses `compression_threshold *
//! max_tokens`, the older part of the history is replaced by a single
//! summary message while the most recent messages are kept verbatim:
//!
//! 1. Split the history at `len - preserve_recent_messages`, moving the split
//!    backward so tool results stay with the assistant message that
//!    requested them.
//! 2. Ask a [`Summarizer`] to condense the older part.
//! 3. Replace it with one summary message and recompute the estimate.
//!
//! A summary that is empty, or that would not lower the estimate, leaves the
//! history untouched and reports [`SkiffError::CompressionFailed`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::prompts::{format_line, summary_request, SUMMARY_PREFIX};
use super::store::ConversationStore;
use crate::client::model::{ModelBackend, ModelRequest};
use crate::config::ConversationConfig;
use crate::error::{Result, SkiffError};
use crate::types::{Message, Role};

/// Token counts before and after a compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionInfo {
    pub original_tokens: usize,
    pub new_tokens: usize,
    pub messages_removed: usize,
}

impl CompressionInfo {
    /// Fraction of the original estimate that remains.
    pub fn ratio(&self) -> f64 {
        if self.original_tokens == 0 {
            return 1.0;
        }
        self.new_tokens as f64 / self.original_tokens as f64
    }
}

/// Produces a condensed representation of a slice of history.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, messages: &[Message]) -> Result<String>;
}

/// Asks the model to summarize, using the compression prompt.
pub struct ModelSummarizer {
    backend: Arc<dyn ModelBackend>,
}

impl ModelSummarizer {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Summarizer for ModelSummarizer {
    async fn summarize(&self, messages: &[Message]) -> Result<String> {
        let request = ModelRequest {
            system: None,
            messages: vec![Message::user(summary_request(messages))],
            tools: Vec::new(),
        };
        let response = self
            .backend
            .send_request(&request)
            .await
            .map_err(|e| SkiffError::CompressionFailed(format!("summarizer model failed: {e}")))?;
        response
            .text
            .ok_or_else(|| SkiffError::CompressionFailed("model returned no summary text".into()))
    }
}

/// Deterministic summarizer that needs no model.
///
/// Emits one `ROLE: text` line per message, each clipped to
/// `max_line_chars`. When the lines exceed `max_chars` the oldest are dropped
/// and counted in a leading note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscriptSummarizer {
    pub max_line_chars: usize,
    pub max_chars: usize,
}

impl Default for TranscriptSummarizer {
    fn default() -> Self {
        Self {
            max_line_chars: 160,
            max_chars: 1200,
        }
    }
}

impl TranscriptSummarizer {
    fn clip(&self, line: String) -> String {
        if line.chars().count() <= self.max_line_chars {
            return line;
        }
        let mut clipped: String = line.chars().take(self.max_line_chars).collect();
        clipped.push_str("...");
        clipped
    }
}

#[async_trait]
impl Summarizer for TranscriptSummarizer {
    async fn summarize(&self, messages: &[Message]) -> Result<String> {
        let lines: Vec<String> = messages
            .iter()
            .filter_map(format_line)
            .map(|line| self.clip(line))
            .collect();

        let mut kept = Vec::new();
        let mut used = 0usize;
        for line in lines.iter().rev() {
            let cost = line.chars().count() + 1;
            if used + cost > self.max_chars && !kept.is_empty() {
                break;
            }
            used += cost;
            kept.push(line.as_str());
        }
        kept.reverse();

        let omitted = lines.len() - kept.len();
        let mut summary = String::new();
        if omitted > 0 {
            summary.push_str(&format!("[{omitted} earlier messages omitted]\n"));
        }
        summary.push_str(&kept.join("\n"));
        Ok(summary)
    }
}

/// Decides when to compress and performs the replacement.
pub struct CompressionManager {
    max_tokens: usize,
    threshold: f64,
    preserve_recent: usize,
    summarizer: Arc<dyn Summarizer>,
}

impl CompressionManager {
    pub fn new(config: &ConversationConfig, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            max_tokens: config.max_tokens,
            threshold: config.compression_threshold,
            preserve_recent: config.preserve_recent_messages,
            summarizer,
        }
    }

    /// Estimate at which compression triggers.
    pub fn threshold_tokens(&self) -> f64 {
        self.threshold * self.max_tokens as f64
    }

    pub fn should_compress(&self, store: &ConversationStore) -> bool {
        store.estimated_tokens() as f64 >= self.threshold_tokens()
    }

    /// Index where the preserved window starts.
    ///
    /// Never lands on a tool message, so a tool-call message and its results
    /// end up on the same side.
    pub fn split_index(&self, messages: &[Message]) -> usize {
        let mut cut = messages.len().saturating_sub(self.preserve_recent);
        while cut > 0 && cut < messages.len() && messages[cut].role == Role::Tool {
            cut -= 1;
        }
        cut
    }

    /// Compress if the estimate has crossed the threshold.
    pub async fn maybe_compress(
        &self,
        store: &mut ConversationStore,
    ) -> Result<Option<CompressionInfo>> {
        if !self.should_compress(store) {
            return Ok(None);
        }
        self.compress(store).await
    }

    /// Compress regardless of the threshold.
    ///
    /// Returns `Ok(None)` when there is nothing older than the preserved
    /// window, or when the older part is already a single summary.
    pub async fn compress(&self, store: &mut ConversationStore) -> Result<Option<CompressionInfo>> {
        let messages = store.messages();
        let cut = self.split_index(messages);
        let (older, recent) = messages.split_at(cut);

        if older.is_empty() || (older.len() == 1 && older[0].summary) {
            debug!(
                messages = messages.len(),
                preserve = self.preserve_recent,
                "nothing to compress"
            );
            return Ok(None);
        }

        let original_tokens = store.estimated_tokens();
        let summary = self
            .summarizer
            .summarize(older)
            .await
            .map_err(|e| match e {
                SkiffError::CompressionFailed(_) => e,
                other => SkiffError::CompressionFailed(other.to_string()),
            })?;
        if summary.trim().is_empty() {
            return Err(SkiffError::CompressionFailed(
                "summarizer returned an empty summary".into(),
            ));
        }

        let mut compressed = Vec::with_capacity(recent.len() + 1);
        compressed.push(Message::summary(format!("{SUMMARY_PREFIX}{}", summary.trim())));
        compressed.extend_from_slice(recent);

        let new_tokens = store.estimator().estimate_messages(&compressed);
        if new_tokens >= original_tokens {
            return Err(SkiffError::CompressionFailed(format!(
                "summary would not reduce the estimate ({original_tokens} -> {new_tokens} tokens)"
            )));
        }

        let messages_removed = older.len();
        store.replace_messages(compressed);

        let info = CompressionInfo {
            original_tokens,
            new_tokens: store.estimated_tokens(),
            messages_removed,
        };
        info!(
            original_tokens = info.original_tokens,
            new_tokens = info.new_tokens,
            messages_removed,
            "compressed conversation history"
        );
        Ok(Some(info))
    }
}

impl std::fmt::Debug for CompressionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionManager")
            .field("max_tokens", &self.max_tokens)
            .field("threshold", &self.threshold)
            .field("preserve_recent", &self.preserve_recent)
            .finish()
    }
}
