use crate::events::{EventEmitter, EventKind, NoopEventEmitter, RunEvent, emit_quietly};
use crate::{
    AgentConfig, AgentError, DispatchOptions, PollPolicy, ReplyExtractor, RunPoller,
    ThreadManager, ToolDispatcher, ToolRegistry, validate_thread_id,
};
use pagepilot_assistant::{AssistantProvider, CreateRunRequest, ToolDefinition};
use pagepilot_threadstore::ThreadStore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Longest user message accepted for one turn.
pub const MAX_MESSAGE_CHARS: usize = 32_000;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub thread_id: Option<String>,
    /// Identity of the authenticated caller, used by session-scoped threads.
    pub session_key: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_session(mut self, session_key: impl Into<String>) -> Self {
        self.session_key = Some(session_key.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub turn_id: String,
    pub thread_id: String,
    pub run_id: String,
    pub message: String,
    pub thread_created: bool,
    pub tool_calls: usize,
    pub tool_errors: usize,
}

/// One conversational turn end to end: thread, run, tools, reply.
///
/// Holds no per-turn state, so a single instance serves concurrent requests.
#[derive(Clone)]
pub struct ChatAgent {
    config: AgentConfig,
    registry: Arc<ToolRegistry>,
    threads: ThreadManager,
    poller: RunPoller,
    replies: ReplyExtractor,
    event_emitter: Arc<dyn EventEmitter>,
}

impl ChatAgent {
    pub fn new(
        provider: Arc<dyn AssistantProvider>,
        registry: Arc<ToolRegistry>,
        store: Arc<dyn ThreadStore>,
        config: AgentConfig,
    ) -> Result<Self, AgentError> {
        Self::new_with_emitter(provider, registry, store, config, Arc::new(NoopEventEmitter))
    }

    pub fn new_with_emitter(
        provider: Arc<dyn AssistantProvider>,
        registry: Arc<ToolRegistry>,
        store: Arc<dyn ThreadStore>,
        config: AgentConfig,
        event_emitter: Arc<dyn EventEmitter>,
    ) -> Result<Self, AgentError> {
        config.validate()?;

        let dispatcher = ToolDispatcher::new_with_emitter(
            registry.clone(),
            DispatchOptions::from(&config),
            event_emitter.clone(),
        );
        let run_request = CreateRunRequest {
            assistant_id: config.assistant_id.clone(),
            instructions: config.instructions.clone(),
            tools: config
                .send_tool_definitions
                .then(|| registry.definitions()),
            metadata: None,
        };
        let poller = RunPoller::new_with_emitter(
            provider.clone(),
            dispatcher,
            PollPolicy::from(&config),
            run_request,
            event_emitter.clone(),
        );
        let threads = ThreadManager::new(provider.clone(), store, config.thread_scope);
        let replies = ReplyExtractor::new(
            provider,
            config.reply_message_limit,
            config.empty_reply_placeholder.clone(),
        );

        Ok(Self {
            config,
            registry,
            threads,
            poller,
            replies,
            event_emitter,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    pub async fn chat(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatReply, AgentError> {
        let message = validate_message(&request.message)?;
        if let Some(thread_id) = request.thread_id.as_deref() {
            validate_thread_id(thread_id)?;
        }
        let turn_id = Uuid::new_v4().to_string();

        let thread = self
            .threads
            .resolve(
                request.thread_id.as_deref(),
                request.session_key.as_deref(),
                cancel,
            )
            .await?;
        let thread_id = thread.thread_id;
        self.emit(RunEvent::with_fields(
            EventKind::TurnStart,
            &thread_id,
            json!({ "turn_id": turn_id, "thread_created": thread.created }),
        ));
        self.emit(RunEvent::with_fields(
            EventKind::ThreadResolved,
            &thread_id,
            json!({
                "turn_id": turn_id,
                "created": thread.created,
                "scope": self.threads.scope().as_str(),
            }),
        ));

        let outcome = match self.poller.run_turn(&thread_id, message, cancel).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(turn_id = %turn_id, thread_id = %thread_id, last_status = ?error.last_status(), %error, "chat turn failed");
                self.emit(RunEvent::with_fields(
                    EventKind::Error,
                    &thread_id,
                    json!({
                        "turn_id": turn_id,
                        "error": error.to_string(),
                        "last_status": error.last_status(),
                    }),
                ));
                return Err(error);
            }
        };
        let reply = self
            .replies
            .extract(&thread_id, &outcome.run.id, cancel)
            .await?;

        info!(
            turn_id = %turn_id,
            thread_id = %thread_id,
            run_id = %outcome.run.id,
            tool_calls = outcome.tool_calls,
            tool_errors = outcome.tool_errors,
            "chat turn completed"
        );
        self.emit(RunEvent::with_fields(
            EventKind::TurnEnd,
            &thread_id,
            json!({
                "turn_id": turn_id,
                "run_id": outcome.run.id,
                "tool_calls": outcome.tool_calls,
            }),
        ));

        Ok(ChatReply {
            turn_id,
            thread_id,
            run_id: outcome.run.id,
            message: reply,
            thread_created: thread.created,
            tool_calls: outcome.tool_calls,
            tool_errors: outcome.tool_errors,
        })
    }

    fn emit(&self, event: RunEvent) {
        emit_quietly(self.event_emitter.as_ref(), event);
    }
}

/// Trims the message and rejects it when empty or oversized.
pub fn validate_message(message: &str) -> Result<&str, AgentError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(AgentError::InvalidInput(
            "message must not be empty".to_string(),
        ));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AgentError::InvalidInput(format!(
            "message exceeds {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(message)
}
