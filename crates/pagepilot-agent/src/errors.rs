use pagepilot_assistant::{ProviderError, RunStatus};
use pagepilot_threadstore::ThreadStoreError;
use thiserror::Error;

/// Failure raised by a tool handler or one of its collaborators.
///
/// The dispatcher never lets these escape; each one is folded into a failure
/// envelope addressed to the originating call.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    Validation(String),
    #[error("{0}")]
    Execution(String),
    #[error("{service} request failed: {message}")]
    Collaborator {
        service: &'static str,
        message: String,
    },
    #[error("tool timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u128 },
    #[error("tool call cancelled")]
    Cancelled,
}

impl ToolError {
    pub fn collaborator(service: &'static str, message: impl Into<String>) -> Self {
        Self::Collaborator {
            service,
            message: message.into(),
        }
    }
}

/// Top-level error type for the pagepilot-agent crate.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("run {run_id} on thread {thread_id} ended with status {status}{}", reason_suffix(.reason.as_deref()))]
    RunFailed {
        thread_id: String,
        run_id: String,
        status: RunStatus,
        reason: Option<String>,
    },
    #[error("run {run_id} on thread {thread_id} still {last_status} after {attempts} poll attempts")]
    PollTimeout {
        thread_id: String,
        run_id: String,
        attempts: usize,
        last_status: RunStatus,
    },
    #[error("run {run_id} on thread {thread_id} requested tools more than {rounds} times")]
    ActionLimitExceeded {
        thread_id: String,
        run_id: String,
        rounds: usize,
    },
    #[error("run {run_id} on thread {thread_id} requires action but lists no tool calls")]
    EmptyRequiredAction { thread_id: String, run_id: String },
    #[error("tool outputs for run {run_id} on thread {thread_id} do not cover its calls: {detail}")]
    IncompleteToolOutputs {
        thread_id: String,
        run_id: String,
        detail: String,
    },
    #[error("chat turn cancelled{}", location_suffix(.thread_id.as_deref(), .run_id.as_deref()))]
    Cancelled {
        thread_id: Option<String>,
        run_id: Option<String>,
        last_status: Option<RunStatus>,
    },
    #[error("{operation} failed{}: {source}", location_suffix(.thread_id.as_deref(), .run_id.as_deref()))]
    Provider {
        operation: &'static str,
        thread_id: Option<String>,
        run_id: Option<String>,
        last_status: Option<RunStatus>,
        #[source]
        source: ProviderError,
    },
    #[error(transparent)]
    ThreadStore(#[from] ThreadStoreError),
}

impl AgentError {
    pub fn thread_id(&self) -> Option<&str> {
        match self {
            Self::RunFailed { thread_id, .. }
            | Self::PollTimeout { thread_id, .. }
            | Self::ActionLimitExceeded { thread_id, .. }
            | Self::EmptyRequiredAction { thread_id, .. }
            | Self::IncompleteToolOutputs { thread_id, .. } => Some(thread_id),
            Self::Cancelled { thread_id, .. } | Self::Provider { thread_id, .. } => {
                thread_id.as_deref()
            }
            Self::InvalidInput(_) | Self::InvalidConfiguration(_) | Self::ThreadStore(_) => None,
        }
    }

    pub fn run_id(&self) -> Option<&str> {
        match self {
            Self::RunFailed { run_id, .. }
            | Self::PollTimeout { run_id, .. }
            | Self::ActionLimitExceeded { run_id, .. }
            | Self::EmptyRequiredAction { run_id, .. }
            | Self::IncompleteToolOutputs { run_id, .. } => Some(run_id),
            Self::Cancelled { run_id, .. } | Self::Provider { run_id, .. } => run_id.as_deref(),
            Self::InvalidInput(_) | Self::InvalidConfiguration(_) | Self::ThreadStore(_) => None,
        }
    }

    /// Last run status observed before the failure, when a run was started.
    pub fn last_status(&self) -> Option<RunStatus> {
        match self {
            Self::RunFailed { status, .. } => Some(*status),
            Self::PollTimeout { last_status, .. } => Some(*last_status),
            Self::ActionLimitExceeded { .. } | Self::EmptyRequiredAction { .. } => {
                Some(RunStatus::RequiresAction)
            }
            Self::IncompleteToolOutputs { .. } => Some(RunStatus::RequiresAction),
            Self::Cancelled { last_status, .. } | Self::Provider { last_status, .. } => {
                *last_status
            }
            Self::InvalidInput(_) | Self::InvalidConfiguration(_) | Self::ThreadStore(_) => None,
        }
    }

    /// True when the caller's request was at fault rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    pub(crate) fn provider(
        operation: &'static str,
        thread_id: Option<&str>,
        run_id: Option<&str>,
        last_status: Option<RunStatus>,
        source: ProviderError,
    ) -> Self {
        Self::Provider {
            operation,
            thread_id: thread_id.map(str::to_string),
            run_id: run_id.map(str::to_string),
            last_status,
            source,
        }
    }

    pub(crate) fn cancelled(
        thread_id: Option<&str>,
        run_id: Option<&str>,
        last_status: Option<RunStatus>,
    ) -> Self {
        Self::Cancelled {
            thread_id: thread_id.map(str::to_string),
            run_id: run_id.map(str::to_string),
            last_status,
        }
    }
}

fn reason_suffix(reason: Option<&str>) -> String {
    reason.map(|reason| format!(": {reason}")).unwrap_or_default()
}

fn location_suffix(thread_id: Option<&str>, run_id: Option<&str>) -> String {
    match (thread_id, run_id) {
        (Some(thread_id), Some(run_id)) => format!(" (thread {thread_id}, run {run_id})"),
        (Some(thread_id), None) => format!(" (thread {thread_id})"),
        (None, Some(run_id)) => format!(" (run {run_id})"),
        (None, None) => String::new(),
    }
}
