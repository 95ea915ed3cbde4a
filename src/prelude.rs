//! Convenience re-exports for common use.

pub use crate::client::{ConversationClient, ModelBackend, ModelRequest, ModelResponse, TurnOutcome};
pub use crate::config::ConversationConfig;
pub use crate::conversation::{CompressionInfo, CompressionManager, ConversationStore, Summarizer};
pub use crate::error::{Result, SkiffError};
pub use crate::tools::{
    AgentTool, ExecuteOptions, Tool, ToolArguments, ToolParameters, ToolRegistry, ToolResult,
};
pub use crate::types::{Message, Role, ToolCall, Usage};
