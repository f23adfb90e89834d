#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use pagepilot_agent::{
    AgentConfig, ChatAgent, DashboardCollaborators, build_dashboard_tool_registry,
};
use pagepilot_assistant::{
    AssistantProvider, CreateRunRequest, Message, ProviderError, Run, RunError, RunStatus,
    Thread, ToolOutput,
};
use pagepilot_server::collaborators::InMemoryTaskBoard;
use pagepilot_server::{ApiTokens, AppState, build_router};
use pagepilot_threadstore::MemoryThreadStore;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const TOKEN: &str = "tok-alice";

/// How every run created by [`StubProvider`] ends up.
#[derive(Clone, Debug)]
pub enum Outcome {
    Completes(&'static str),
    Fails(RunStatus),
    NeverFinishes,
    Rejects(u16),
}

#[derive(Default)]
struct StubState {
    threads: usize,
    runs: usize,
    appended: Vec<(String, String)>,
}

/// Provider whose runs all resolve the same way on the first status check.
#[derive(Clone)]
pub struct StubProvider {
    outcome: Outcome,
    state: Arc<Mutex<StubState>>,
}

impl StubProvider {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            state: Arc::new(Mutex::new(StubState::default())),
        }
    }

    pub fn threads_created(&self) -> usize {
        self.state.lock().expect("stub state").threads
    }

    pub fn appended(&self) -> Vec<(String, String)> {
        self.state.lock().expect("stub state").appended.clone()
    }
}

#[async_trait]
impl AssistantProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn create_thread(&self) -> Result<Thread, ProviderError> {
        let mut state = self.state.lock().expect("stub state");
        state.threads += 1;
        Ok(Thread {
            id: format!("thread_{}", state.threads),
        })
    }

    async fn append_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<Message, ProviderError> {
        let mut state = self.state.lock().expect("stub state");
        state
            .appended
            .push((thread_id.to_string(), content.to_string()));
        Ok(Message::user("msg_user", thread_id, content))
    }

    async fn create_run(
        &self,
        thread_id: &str,
        _request: CreateRunRequest,
    ) -> Result<Run, ProviderError> {
        if let Outcome::Rejects(code) = self.outcome {
            return Err(ProviderError::http(code, "Incorrect API key provided: sk-***"));
        }
        let mut state = self.state.lock().expect("stub state");
        state.runs += 1;
        Ok(Run::new(format!("run_{}", state.runs), thread_id, RunStatus::Queued))
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ProviderError> {
        Ok(match &self.outcome {
            Outcome::Completes(_) => Run::new(run_id, thread_id, RunStatus::Completed),
            Outcome::Fails(status) => {
                let mut run = Run::new(run_id, thread_id, *status);
                run.last_error = Some(RunError {
                    code: "server_error".to_string(),
                    message: "stub failure".to_string(),
                });
                run
            }
            Outcome::NeverFinishes | Outcome::Rejects(_) => {
                Run::new(run_id, thread_id, RunStatus::InProgress)
            }
        })
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        _outputs: Vec<ToolOutput>,
    ) -> Result<Run, ProviderError> {
        Ok(Run::new(run_id, thread_id, RunStatus::Queued))
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        _limit: usize,
    ) -> Result<Vec<Message>, ProviderError> {
        let run_id = format!("run_{}", self.state.lock().expect("stub state").runs);
        Ok(match self.outcome {
            Outcome::Completes(reply) => vec![Message::assistant(
                "msg_assistant",
                thread_id,
                Some(run_id),
                reply,
            )],
            _ => Vec::new(),
        })
    }
}

pub fn test_config() -> AgentConfig {
    AgentConfig {
        poll_interval: Duration::from_millis(1),
        max_poll_attempts: 3,
        ..AgentConfig::new("asst_test")
    }
}

pub fn app_with(provider: &StubProvider, config: AgentConfig) -> Router {
    let registry = build_dashboard_tool_registry(DashboardCollaborators {
        tasks: Some(Arc::new(InMemoryTaskBoard::new())),
        ..DashboardCollaborators::default()
    });
    let agent = ChatAgent::new(
        Arc::new(provider.clone()),
        Arc::new(registry),
        Arc::new(MemoryThreadStore::new()),
        config,
    )
    .expect("agent should build");
    let tokens = ApiTokens::parse(&format!("alice:{TOKEN}")).expect("tokens");
    build_router(Arc::new(AppState::new(
        agent,
        tokens,
        CancellationToken::new(),
    )))
}

pub fn app(outcome: Outcome) -> (Router, StubProvider) {
    let provider = StubProvider::new(outcome);
    (app_with(&provider, test_config()), provider)
}
