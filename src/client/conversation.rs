//! Turn orchestration over a conversation, a tool registry and a model.

use std::sync::{Arc, PoisonError, RwLock};

use futures::future::{join_all, BoxFuture};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::model::{ModelBackend, ModelRequest};
use crate::config::ConversationConfig;
use crate::conversation::prompts::core_system_prompt;
use crate::conversation::{
    CharsPerToken, CompressionInfo, CompressionManager, ConversationStore, Summarizer,
    TokenEstimator, TranscriptSummarizer,
};
use crate::error::{Result, SkiffError};
use crate::tools::{ConfirmationDetails, ExecuteOptions, ProgressSink, Tool, ToolRegistry, ToolResult};
use crate::types::{Message, ToolCall, Usage};

/// A tool call waiting for the user's decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationRequest {
    pub tool_call_id: String,
    pub details: ConfirmationDetails,
}

/// Async approval callback. Resolves `true` to run the tool.
pub type ConfirmationHandler =
    Arc<dyn Fn(ConfirmationRequest) -> BoxFuture<'static, bool> + Send + Sync>;

/// Progress update from a running tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolProgress {
    pub tool_call_id: String,
    pub tool_name: String,
    pub message: String,
}

/// Callback receiving progress from every tool call in a turn.
pub type ToolProgressSink = Arc<dyn Fn(ToolProgress) + Send + Sync>;

/// One tool call and its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub call: ToolCall,
    pub result: ToolResult,
}

/// What a completed turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Final assistant text.
    pub text: String,
    /// Every tool call made during the turn, in request order.
    pub tool_results: Vec<ToolInvocation>,
    /// Number of tool-dispatch rounds.
    pub rounds: usize,
    pub usage: Usage,
    pub compression: Option<CompressionInfo>,
}

/// Point-in-time view of a conversation's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStats {
    pub message_count: usize,
    pub estimated_tokens: usize,
    pub max_tokens: usize,
    pub usage_percent: u8,
    pub turn_count: usize,
    pub total_usage: Usage,
}

struct ClientState {
    config: ConversationConfig,
    store: ConversationStore,
    registry: Arc<ToolRegistry>,
    compression: CompressionManager,
    system_prompt: String,
    usage: Usage,
}

/// Last committed state, readable while a turn holds `ClientState`.
#[derive(Clone)]
struct Snapshot {
    config: ConversationConfig,
    store: ConversationStore,
    registry: Arc<ToolRegistry>,
    system_prompt: String,
    usage: Usage,
}

impl Snapshot {
    fn of(state: &ClientState) -> Self {
        Self {
            config: state.config.clone(),
            store: state.store.clone(),
            registry: state.registry.clone(),
            system_prompt: state.system_prompt.clone(),
            usage: state.usage,
        }
    }
}

/// Runs conversation turns: user message in, final assistant text out.
///
/// Only one operation that changes the conversation may run at a time. A
/// second [`send_message`](Self::send_message) (or [`reset`](Self::reset),
/// [`compress_now`](Self::compress_now), ...) while a turn is in flight fails
/// immediately with [`SkiffError::ConversationBusy`].
///
/// A turn works on a copy of the history and commits it only after the
/// final response, so a failed or cancelled turn leaves the conversation as
/// it was.
///
/// Readers such as [`messages`](Self::messages) and [`stats`](Self::stats)
/// never wait for a turn. They see the last committed state, so history
/// from an in-flight turn appears only once it completes.
pub struct ConversationClient {
    backend: Arc<dyn ModelBackend>,
    summarizer: Arc<dyn Summarizer>,
    confirmation_handler: Option<ConfirmationHandler>,
    progress_sink: Option<ToolProgressSink>,
    state: Mutex<ClientState>,
    committed: RwLock<Snapshot>,
}

impl ConversationClient {
    /// Create a client. Fails if `config` is invalid.
    pub fn new(
        config: ConversationConfig,
        backend: Arc<dyn ModelBackend>,
        registry: ToolRegistry,
    ) -> Result<Self> {
        let config = config.validate()?;
        let summarizer: Arc<dyn Summarizer> = Arc::new(TranscriptSummarizer::default());
        let state = ClientState {
            compression: CompressionManager::new(&config, summarizer.clone()),
            system_prompt: core_system_prompt(config.user_memory.as_deref()),
            store: ConversationStore::new(Arc::new(CharsPerToken::default())),
            registry: Arc::new(registry),
            usage: Usage::default(),
            config,
        };
        Ok(Self {
            backend,
            summarizer,
            confirmation_handler: None,
            progress_sink: None,
            committed: RwLock::new(Snapshot::of(&state)),
            state: Mutex::new(state),
        })
    }

    /// Use a different summarizer for compression.
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        let state = self.state.get_mut();
        state.compression = CompressionManager::new(&state.config, summarizer.clone());
        self.summarizer = summarizer;
        self
    }

    /// Use a different token estimator. Recomputes the current estimate.
    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        let state = self.state.get_mut();
        let messages = state.store.messages().to_vec();
        let turns = state.store.turn_count();
        state.store = ConversationStore::new(estimator);
        state.store.replace_messages(messages);
        for _ in 0..turns {
            state.store.record_turn();
        }
        let snapshot = Snapshot::of(state);
        *self
            .committed
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = snapshot;
        self
    }

    pub fn with_confirmation_handler(mut self, handler: ConfirmationHandler) -> Self {
        self.confirmation_handler = Some(handler);
        self
    }

    pub fn with_progress_sink(mut self, sink: ToolProgressSink) -> Self {
        self.progress_sink = Some(sink);
        self
    }

    /// Run one turn.
    ///
    /// Loops while the model requests tools, up to `max_tool_rounds` dispatch
    /// rounds. Tool calls in one response run concurrently; their results are
    /// appended in request order. Unknown tools and invalid arguments come
    /// back to the model as error results. Model failures, malformed
    /// responses and too many rounds fail the turn without changing the
    /// conversation.
    pub async fn send_message(&self, input: impl Into<String>) -> Result<TurnOutcome> {
        let mut state = self
            .state
            .try_lock()
            .map_err(|_| SkiffError::ConversationBusy)?;

        let mut staged = state.store.clone();
        staged.push(Message::user(input));

        let max_rounds = state.config.max_tool_rounds;
        let tools: Vec<_> = state.registry.list_tools().collect();
        let mut usage = Usage::default();
        let mut invocations = Vec::new();
        let mut rounds = 0usize;

        debug!(
            model = %state.config.model,
            messages = staged.len(),
            tools = tools.len(),
            "turn started"
        );

        let text = loop {
            let request = ModelRequest {
                system: Some(state.system_prompt.clone()),
                messages: staged.messages().to_vec(),
                tools: tools.clone(),
            };
            let response = self.backend.send_request(&request).await?;
            response.check()?;
            usage.merge(&response.usage);

            if !response.has_tool_calls() {
                break response.text.unwrap_or_default();
            }
            if rounds >= max_rounds {
                warn!(max_rounds, "tool loop exceeded round limit");
                return Err(SkiffError::TooManyToolRounds { max_rounds });
            }
            rounds += 1;

            let calls: Vec<ToolCall> = response
                .tool_calls
                .into_iter()
                .map(|mut call| {
                    if call.id.trim().is_empty() {
                        call.id = format!("call_{}", Uuid::new_v4());
                    }
                    call
                })
                .collect();
            debug!(round = rounds, calls = calls.len(), "dispatching tool calls");

            staged.push(Message::assistant_with_tool_calls(
                response.text.unwrap_or_default(),
                calls.clone(),
            ));

            let registry = state.registry.as_ref();
            let results = join_all(calls.iter().map(|call| self.dispatch(registry, call))).await;

            for (call, result) in calls.into_iter().zip(results) {
                staged.push(Message::tool_result(
                    call.id.clone(),
                    result.model_text(),
                    result.is_error,
                ));
                invocations.push(ToolInvocation { call, result });
            }
        };

        staged.push(Message::assistant(text.clone()));
        staged.record_turn();

        let compression = match state.compression.maybe_compress(&mut staged).await {
            Ok(info) => info,
            Err(error) => {
                warn!(error = %error, "skipping compression");
                None
            }
        };

        state.store = staged;
        state.usage.merge(&usage);
        self.publish(&state);
        debug!(
            rounds,
            messages = state.store.len(),
            estimated_tokens = state.store.estimated_tokens(),
            "turn completed"
        );

        Ok(TurnOutcome {
            text,
            tool_results: invocations,
            rounds,
            usage,
            compression,
        })
    }

    async fn dispatch(&self, registry: &ToolRegistry, call: &ToolCall) -> ToolResult {
        let options = ExecuteOptions {
            progress: self.progress_for(call),
            tool_call_id: Some(call.id.clone()),
            ..ExecuteOptions::default()
        };

        let first = registry
            .execute(&call.name, call.arguments.clone(), options.clone())
            .await;
        let details = match first {
            Ok(ToolResult {
                confirmation: Some(details),
                ..
            }) => details,
            Ok(result) => return result,
            Err(error) => {
                debug!(tool = %call.name, error = %error, "tool call rejected before execution");
                return ToolResult::error(error.to_string());
            }
        };

        let approved = match &self.confirmation_handler {
            Some(handler) => {
                handler(ConfirmationRequest {
                    tool_call_id: call.id.clone(),
                    details: details.clone(),
                })
                .await
            }
            None => false,
        };
        if !approved {
            debug!(tool = %call.name, "tool call not confirmed");
            return ToolResult::rejected(&details);
        }

        let confirmed = ExecuteOptions {
            confirmed: true,
            ..options
        };
        registry
            .execute(&call.name, call.arguments.clone(), confirmed)
            .await
            .unwrap_or_else(|error| ToolResult::error(error.to_string()))
    }

    fn progress_for(&self, call: &ToolCall) -> Option<ProgressSink> {
        let sink = self.progress_sink.clone()?;
        let tool_call_id = call.id.clone();
        let tool_name = call.name.clone();
        Some(Arc::new(move |message: String| {
            sink(ToolProgress {
                tool_call_id: tool_call_id.clone(),
                tool_name: tool_name.clone(),
                message,
            })
        }))
    }

    fn publish(&self, state: &ClientState) {
        *self
            .committed
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Snapshot::of(state);
    }

    fn committed(&self) -> std::sync::RwLockReadGuard<'_, Snapshot> {
        self.committed.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the committed message history.
    pub fn messages(&self) -> Vec<Message> {
        self.committed().store.messages().to_vec()
    }

    pub fn estimated_tokens(&self) -> usize {
        self.committed().store.estimated_tokens()
    }

    pub fn turn_count(&self) -> usize {
        self.committed().store.turn_count()
    }

    pub fn stats(&self) -> ConversationStats {
        let committed = self.committed();
        let estimated_tokens = committed.store.estimated_tokens();
        let max_tokens = committed.config.max_tokens;
        ConversationStats {
            message_count: committed.store.len(),
            estimated_tokens,
            max_tokens,
            usage_percent: (estimated_tokens.saturating_mul(100) / max_tokens).min(100) as u8,
            turn_count: committed.store.turn_count(),
            total_usage: committed.usage,
        }
    }

    pub fn config(&self) -> ConversationConfig {
        self.committed().config.clone()
    }

    pub fn system_prompt(&self) -> String {
        self.committed().system_prompt.clone()
    }

    /// Snapshot of the tool registry.
    pub fn registry(&self) -> Arc<ToolRegistry> {
        self.committed().registry.clone()
    }

    /// Register a tool for subsequent turns.
    pub fn register_tool(&self, tool: impl Tool + 'static) -> Result<()> {
        let mut state = self.lock_idle()?;
        Arc::make_mut(&mut state.registry).register(tool)?;
        self.publish(&state);
        Ok(())
    }

    /// Replace the history. Turn count is kept.
    pub fn set_history(&self, messages: Vec<Message>) -> Result<()> {
        let mut state = self.lock_idle()?;
        state.store.replace_messages(messages);
        self.publish(&state);
        Ok(())
    }

    /// Clear the history and counters. Tools and configuration are kept.
    pub fn reset(&self) -> Result<()> {
        let mut state = self.lock_idle()?;
        state.store.reset();
        state.usage = Usage::default();
        self.publish(&state);
        debug!("conversation reset");
        Ok(())
    }

    /// Compress now, regardless of the threshold.
    pub async fn compress_now(&self) -> Result<Option<CompressionInfo>> {
        let mut state = self.lock_idle()?;
        let ClientState {
            store, compression, ..
        } = &mut *state;
        let info = compression.compress(store).await?;
        self.publish(&state);
        Ok(info)
    }

    /// Replace the configuration. Equivalent to a reset.
    pub fn reconfigure(&self, config: ConversationConfig) -> Result<()> {
        let config = config.validate()?;
        let mut state = self.lock_idle()?;
        state.compression = CompressionManager::new(&config, self.summarizer.clone());
        state.system_prompt = core_system_prompt(config.user_memory.as_deref());
        state.config = config;
        state.store.reset();
        state.usage = Usage::default();
        self.publish(&state);
        Ok(())
    }

    /// Set or clear the user context appended to the system prompt.
    pub fn set_user_memory(&self, memory: Option<String>) -> Result<()> {
        let mut state = self.lock_idle()?;
        state.system_prompt = core_system_prompt(memory.as_deref());
        state.config.user_memory = memory;
        self.publish(&state);
        Ok(())
    }

    fn lock_idle(&self) -> Result<tokio::sync::MutexGuard<'_, ClientState>> {
        self.state
            .try_lock()
            .map_err(|_| SkiffError::ConversationBusy)
    }
}

impl std::fmt::Debug for ConversationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationClient")
            .field("confirmation_handler", &self.confirmation_handler.is_some())
            .field("progress_sink", &self.progress_sink.is_some())
            .finish_non_exhaustive()
    }
}
