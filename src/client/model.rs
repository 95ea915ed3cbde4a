//! The model boundary: one request in, one response out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SkiffError;
use crate::tools::ToolSpec;
use crate::types::{Message, ToolCall, Usage};

/// A request sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelRequest {
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSpec>,
}

/// Response from the model. Either field may be empty, but not both.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelResponse {
    pub text: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub usage: Usage,
}

impl ModelResponse {
    /// A final text answer.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// A response that requests tools.
    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::default()
        }
    }

    pub fn with_usage(mut self, estimated_tokens: u64) -> Self {
        self.usage = Usage::new(estimated_tokens);
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Reject responses that carry nothing usable.
    pub(crate) fn check(&self) -> Result<(), SkiffError> {
        let has_text = self.text.as_deref().is_some_and(|t| !t.is_empty());
        if !has_text && self.tool_calls.is_empty() {
            return Err(SkiffError::Model(
                "malformed response: no text and no tool calls".into(),
            ));
        }
        if let Some(call) = self.tool_calls.iter().find(|c| c.name.trim().is_empty()) {
            return Err(SkiffError::Model(format!(
                "malformed response: tool call '{}' has no name",
                call.id
            )));
        }
        Ok(())
    }
}

/// Transport to a language model. Implementations own auth, retries and
/// wire format.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn send_request(&self, request: &ModelRequest) -> Result<ModelResponse, SkiffError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_response_is_malformed() {
        assert!(ModelResponse::default().check().is_err());
        assert!(ModelResponse::text("").check().is_err());
        assert!(ModelResponse::text("ok").check().is_ok());
    }

    #[test]
    fn unnamed_tool_call_is_malformed() {
        let response = ModelResponse::tool_calls(vec![ToolCall::new(
            "c1",
            " ",
            serde_json::json!({}),
        )]);

        let err = response.check().unwrap_err();

        assert!(matches!(err, SkiffError::Model(_)));
    }
}
