//! Conversation client and the model boundary it talks to.

pub mod conversation;
pub mod model;

pub use conversation::{
    ConfirmationHandler, ConfirmationRequest, ConversationClient, ConversationStats,
    ToolInvocation, ToolProgress, ToolProgressSink, TurnOutcome,
};
pub use model::{ModelBackend, ModelRequest, ModelResponse};
