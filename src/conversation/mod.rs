//! Conversation history: storage, token estimation, prompts and compression.

pub mod compression;
pub mod prompts;
pub mod store;
pub mod tokens;

pub use compression::{
    CompressionInfo, CompressionManager, ModelSummarizer, Summarizer, TranscriptSummarizer,
};
pub use store::ConversationStore;
pub use tokens::{CharsPerToken, TokenEstimator, WordCount};
