#![allow(dead_code)]

use async_trait::async_trait;
use pagepilot_agent::{
    AgentConfig, ChatAgent, NewPost, PagePublisher, PublishedPost, ToolError, ToolRegistry,
};
use pagepilot_assistant::{
    AssistantProvider, CreateRunRequest, Message, ProviderError, Run, RunError, RunStatus,
    Thread, ToolCall, ToolOutput,
};
use pagepilot_threadstore::MemoryThreadStore;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the next status check of the scripted run returns.
#[derive(Clone, Debug)]
pub enum Step {
    Status(RunStatus),
    Action(Vec<ToolCall>),
    Failed(RunStatus, &'static str),
    Error(ProviderError),
}

#[derive(Default)]
struct ScriptState {
    threads_created: usize,
    runs_created: usize,
    current_run: Option<String>,
    steps: VecDeque<Step>,
    fallback: Option<RunStatus>,
    reply: Option<String>,
    calls: Vec<String>,
    appended: Vec<(String, String)>,
    run_requests: Vec<CreateRunRequest>,
    submissions: Vec<Vec<ToolOutput>>,
    get_run_count: usize,
}

/// Provider stub driven by a queue of run states.
///
/// `create_run` and `submit_tool_outputs` answer `queued`; each `get_run`
/// pops the next step, falling back to `in_progress` once the queue is empty.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Self {
        let provider = Self::default();
        provider.lock().steps = steps.into();
        provider
    }

    pub fn with_reply(self, reply: &str) -> Self {
        self.lock().reply = Some(reply.to_string());
        self
    }

    pub fn with_fallback(self, status: RunStatus) -> Self {
        self.lock().fallback = Some(status);
        self
    }

    pub fn push_steps(&self, steps: Vec<Step>) {
        self.lock().steps.extend(steps);
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn appended(&self) -> Vec<(String, String)> {
        self.lock().appended.clone()
    }

    pub fn run_requests(&self) -> Vec<CreateRunRequest> {
        self.lock().run_requests.clone()
    }

    pub fn submissions(&self) -> Vec<Vec<ToolOutput>> {
        self.lock().submissions.clone()
    }

    pub fn get_run_count(&self) -> usize {
        self.lock().get_run_count
    }

    pub fn threads_created(&self) -> usize {
        self.lock().threads_created
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().expect("script state mutex")
    }
}

#[async_trait]
impl AssistantProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn create_thread(&self) -> Result<Thread, ProviderError> {
        let mut state = self.lock();
        state.calls.push("create_thread".to_string());
        state.threads_created += 1;
        Ok(Thread {
            id: format!("thread_{}", state.threads_created),
        })
    }

    async fn append_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<Message, ProviderError> {
        let mut state = self.lock();
        state.calls.push("append_message".to_string());
        state
            .appended
            .push((thread_id.to_string(), content.to_string()));
        Ok(Message::user(
            format!("msg_user_{}", state.appended.len()),
            thread_id,
            content,
        ))
    }

    async fn create_run(
        &self,
        thread_id: &str,
        request: CreateRunRequest,
    ) -> Result<Run, ProviderError> {
        let mut state = self.lock();
        state.calls.push("create_run".to_string());
        state.run_requests.push(request);
        state.runs_created += 1;
        let run_id = format!("run_{}", state.runs_created);
        state.current_run = Some(run_id.clone());
        Ok(Run::new(run_id, thread_id, RunStatus::Queued))
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ProviderError> {
        let mut state = self.lock();
        state.calls.push("get_run".to_string());
        state.get_run_count += 1;
        let fallback = state.fallback.unwrap_or(RunStatus::InProgress);
        match state.steps.pop_front() {
            None => Ok(Run::new(run_id, thread_id, fallback)),
            Some(Step::Status(status)) => Ok(Run::new(run_id, thread_id, status)),
            Some(Step::Action(calls)) => Ok(Run::requiring(run_id, thread_id, calls)),
            Some(Step::Failed(status, code)) => {
                let mut run = Run::new(run_id, thread_id, status);
                run.last_error = Some(RunError {
                    code: code.to_string(),
                    message: "scripted failure".to_string(),
                });
                Ok(run)
            }
            Some(Step::Error(error)) => Err(error),
        }
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<Run, ProviderError> {
        let mut state = self.lock();
        state.calls.push("submit_tool_outputs".to_string());
        state.submissions.push(outputs);
        Ok(Run::new(run_id, thread_id, RunStatus::Queued))
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        _limit: usize,
    ) -> Result<Vec<Message>, ProviderError> {
        let mut state = self.lock();
        state.calls.push("list_messages".to_string());
        let mut messages = Vec::new();
        if let Some(reply) = &state.reply {
            messages.push(Message::assistant(
                "msg_assistant",
                thread_id,
                state.current_run.clone(),
                reply.clone(),
            ));
        }
        if let Some((_, content)) = state.appended.last() {
            messages.push(Message::user("msg_user", thread_id, content.clone()));
        }
        Ok(messages)
    }
}

/// Page publisher that records posts and returns fixed identifiers.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    pub posts: Arc<Mutex<Vec<NewPost>>>,
}

impl RecordingPublisher {
    pub fn posts(&self) -> Vec<NewPost> {
        self.posts.lock().expect("posts mutex").clone()
    }
}

#[async_trait]
impl PagePublisher for RecordingPublisher {
    async fn publish(&self, post: NewPost) -> Result<PublishedPost, ToolError> {
        let page_id = post.page_id.clone().unwrap_or_else(|| "page_1".to_string());
        let mut posts = self.posts.lock().expect("posts mutex");
        posts.push(post);
        Ok(PublishedPost {
            post_id: format!("{page_id}_post_{}", posts.len()),
            page_id,
        })
    }
}

pub fn test_config() -> AgentConfig {
    AgentConfig {
        poll_interval: Duration::from_millis(1),
        max_poll_attempts: 20,
        ..AgentConfig::new("asst_test")
    }
}

pub fn agent_with(
    provider: &ScriptedProvider,
    registry: ToolRegistry,
    config: AgentConfig,
) -> ChatAgent {
    ChatAgent::new(
        Arc::new(provider.clone()),
        Arc::new(registry),
        Arc::new(MemoryThreadStore::new()),
        config,
    )
    .expect("agent should build")
}

pub fn call(id: &str, name: &str, raw_arguments: &str) -> ToolCall {
    ToolCall::from_raw(id, name, raw_arguments)
}

pub fn output_ids(batch: &[ToolOutput]) -> Vec<String> {
    batch.iter().map(|output| output.tool_call_id.clone()).collect()
}

pub fn success_of(output: &ToolOutput) -> Option<bool> {
    output.output.get("success").and_then(Value::as_bool)
}
