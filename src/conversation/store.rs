//! Ordered message log with a running token estimate.

use std::sync::Arc;

use super::tokens::{CharsPerToken, TokenEstimator};
use crate::types::Message;

/// Conversation history plus counters.
///
/// `estimated_tokens` is updated incrementally on append and recomputed in
/// full whenever the history is replaced.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    messages: Vec<Message>,
    estimated_tokens: usize,
    turn_count: usize,
    estimator: Arc<dyn TokenEstimator>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(Arc::new(CharsPerToken::default()))
    }
}

impl ConversationStore {
    pub fn new(estimator: Arc<dyn TokenEstimator>) -> Self {
        Self {
            messages: Vec::new(),
            estimated_tokens: 0,
            turn_count: 0,
            estimator,
        }
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        self.estimated_tokens += self.estimator.estimate_message(&message);
        self.messages.push(message);
    }

    /// Append several messages in order.
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        for message in messages {
            self.push(message);
        }
    }

    /// Get all messages.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last N messages.
    pub fn last_n(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn estimated_tokens(&self) -> usize {
        self.estimated_tokens
    }

    pub fn turn_count(&self) -> usize {
        self.turn_count
    }

    pub(crate) fn record_turn(&mut self) {
        self.turn_count += 1;
    }

    pub fn estimator(&self) -> &Arc<dyn TokenEstimator> {
        &self.estimator
    }

    /// Replace the whole history. Turn count is kept.
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.estimated_tokens = self.estimator.estimate_messages(&messages);
        self.messages = messages;
    }

    /// Clear messages and zero the counters.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.estimated_tokens = 0;
        self.turn_count = 0;
    }
}
