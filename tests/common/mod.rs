//! Shared test helpers and a scripted model backend.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use skiff::client::{ModelBackend, ModelRequest, ModelResponse};
use skiff::error::SkiffError;
use skiff::tools::{AgentTool, ToolParameters};
use skiff::types::ToolCall;

/// A model backend that replays queued responses and records every request.
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<ModelResponse, SkiffError>>>,
    requests: Mutex<Vec<ModelRequest>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every request until the gate is notified.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    /// Queue a final text response.
    pub fn queue_text(&self, text: &str) -> &Self {
        self.queue(Ok(ModelResponse::text(text).with_usage(30)))
    }

    /// Queue a response requesting one tool call.
    pub fn queue_tool_call(&self, id: &str, name: &str, args: serde_json::Value) -> &Self {
        self.queue_tool_calls(vec![ToolCall::new(id, name, args)])
    }

    /// Queue a response requesting several tool calls.
    pub fn queue_tool_calls(&self, calls: Vec<ToolCall>) -> &Self {
        self.queue(Ok(ModelResponse::tool_calls(calls).with_usage(15)))
    }

    /// Queue a transport failure.
    pub fn queue_error(&self, message: &str) -> &Self {
        self.queue(Err(SkiffError::Model(message.to_string())))
    }

    pub fn queue(&self, response: Result<ModelResponse, SkiffError>) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedModel {
    async fn send_request(&self, request: &ModelRequest) -> Result<ModelResponse, SkiffError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ModelResponse::text("Mock response")))
    }
}

/// The `echo` tool: requires a string field `text`.
pub fn echo_tool() -> AgentTool {
    AgentTool::new(
        "echo",
        "Echo the given text",
        ToolParameters::object()
            .string("text", "Text to echo", true)
            .build(),
        |args, _ctx| async move {
            let text = args.get_str("text")?;
            Ok(serde_json::json!(format!("echo: {text}")))
        },
    )
}

/// A tool that sleeps for `delay_ms` before returning its own name.
pub fn delayed_tool(name: &'static str, delay_ms: u64) -> AgentTool {
    AgentTool::new(name, "Sleeps, then answers", ToolParameters::empty(), move |_args, _ctx| async move {
        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        Ok(serde_json::json!(name))
    })
}

/// Text of roughly `tokens` estimated tokens at four characters per token.
pub fn text_of_tokens(tokens: usize, fill: char) -> String {
    std::iter::repeat(fill).take(tokens * 4).collect()
}
