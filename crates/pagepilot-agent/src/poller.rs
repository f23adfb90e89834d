//! Drives a single assistant run from creation to a terminal status.

use crate::cancellation::until_cancelled;
use crate::events::{EventEmitter, EventKind, NoopEventEmitter, RunEvent, emit_quietly};
use crate::tools::{ToolDispatcher, is_failure_envelope};
use crate::{AgentConfig, AgentError};
use pagepilot_assistant::{AssistantProvider, CreateRunRequest, Run, RunStatus, ToolCall, ToolOutput};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: usize,
    pub max_action_rounds: usize,
}

impl From<&AgentConfig> for PollPolicy {
    fn from(config: &AgentConfig) -> Self {
        Self {
            interval: config.poll_interval,
            max_attempts: config.max_poll_attempts,
            max_action_rounds: config.max_action_rounds,
        }
    }
}

/// A run that reached `completed`, with what it took to get there.
#[derive(Clone, Debug, PartialEq)]
pub struct RunOutcome {
    pub run: Run,
    pub poll_attempts: usize,
    pub action_rounds: usize,
    pub tool_calls: usize,
    pub tool_errors: usize,
}

#[derive(Clone)]
pub struct RunPoller {
    provider: Arc<dyn AssistantProvider>,
    dispatcher: ToolDispatcher,
    policy: PollPolicy,
    run_request: CreateRunRequest,
    event_emitter: Arc<dyn EventEmitter>,
}

impl RunPoller {
    pub fn new(
        provider: Arc<dyn AssistantProvider>,
        dispatcher: ToolDispatcher,
        policy: PollPolicy,
        run_request: CreateRunRequest,
    ) -> Self {
        Self::new_with_emitter(
            provider,
            dispatcher,
            policy,
            run_request,
            Arc::new(NoopEventEmitter),
        )
    }

    pub fn new_with_emitter(
        provider: Arc<dyn AssistantProvider>,
        dispatcher: ToolDispatcher,
        policy: PollPolicy,
        run_request: CreateRunRequest,
        event_emitter: Arc<dyn EventEmitter>,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            policy,
            run_request,
            event_emitter,
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Appends the user's message, starts a run and drives it to completion.
    pub async fn run_turn(
        &self,
        thread_id: &str,
        content: &str,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, AgentError> {
        let message = until_cancelled(cancel, self.provider.append_message(thread_id, content))
            .await
            .ok_or_else(|| AgentError::cancelled(Some(thread_id), None, None))?
            .map_err(|error| {
                AgentError::provider("append_message", Some(thread_id), None, None, error)
            })?;
        self.emit(RunEvent::with_fields(
            EventKind::MessageAppended,
            thread_id,
            json!({ "message_id": message.id }),
        ));

        let run = until_cancelled(
            cancel,
            self.provider.create_run(thread_id, self.run_request.clone()),
        )
        .await
        .ok_or_else(|| AgentError::cancelled(Some(thread_id), None, None))?
        .map_err(|error| AgentError::provider("create_run", Some(thread_id), None, None, error))?;
        info!(thread_id, run_id = %run.id, status = %run.status, "run created");
        self.emit(RunEvent::with_fields(
            EventKind::RunCreated,
            thread_id,
            json!({ "run_id": run.id, "status": run.status }),
        ));

        self.drive(run, cancel).await
    }

    /// Polls `run` until it completes, answering every tool request on the way.
    ///
    /// Status checks are bounded by `max_attempts` over the whole run and tool
    /// batches by `max_action_rounds`.
    pub async fn drive(
        &self,
        initial: Run,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, AgentError> {
        let thread_id = initial.thread_id.clone();
        let run_id = initial.id.clone();
        let mut run = initial;
        let mut reported: Option<RunStatus> = None;
        let mut poll_attempts = 0usize;
        let mut action_rounds = 0usize;
        let mut tool_calls = 0usize;
        let mut tool_errors = 0usize;

        loop {
            if reported != Some(run.status) {
                debug!(thread_id = %thread_id, run_id = %run_id, status = %run.status, "run status");
                self.emit(RunEvent::with_fields(
                    EventKind::RunStatusChanged,
                    &thread_id,
                    json!({ "run_id": run_id, "status": run.status }),
                ));
                reported = Some(run.status);
            }
            // A finished run is reported as such even if the token fired meanwhile.
            if cancel.is_cancelled() && !run.status.is_terminal() {
                return Err(AgentError::cancelled(
                    Some(&thread_id),
                    Some(&run_id),
                    Some(run.status),
                ));
            }

            match run.status {
                RunStatus::Completed => {
                    info!(
                        thread_id = %thread_id,
                        run_id = %run_id,
                        poll_attempts,
                        action_rounds,
                        tool_calls,
                        "run completed"
                    );
                    return Ok(RunOutcome {
                        run,
                        poll_attempts,
                        action_rounds,
                        tool_calls,
                        tool_errors,
                    });
                }
                status if status.is_terminal_failure() => {
                    let reason = run
                        .last_error
                        .as_ref()
                        .map(|error| format!("{}: {}", error.code, error.message));
                    warn!(thread_id = %thread_id, run_id = %run_id, %status, reason = ?reason, "run ended without completing");
                    return Err(AgentError::RunFailed {
                        thread_id,
                        run_id,
                        status,
                        reason,
                    });
                }
                RunStatus::RequiresAction => {
                    if action_rounds >= self.policy.max_action_rounds {
                        warn!(thread_id = %thread_id, run_id = %run_id, action_rounds, "action round limit reached");
                        return Err(AgentError::ActionLimitExceeded {
                            thread_id,
                            run_id,
                            rounds: self.policy.max_action_rounds,
                        });
                    }
                    action_rounds += 1;

                    let calls = run.pending_tool_calls().to_vec();
                    if calls.is_empty() {
                        return Err(AgentError::EmptyRequiredAction { thread_id, run_id });
                    }

                    let outputs = until_cancelled(
                        cancel,
                        self.dispatcher.dispatch(&thread_id, &calls, cancel),
                    )
                    .await
                    .ok_or_else(|| {
                        AgentError::cancelled(
                            Some(&thread_id),
                            Some(&run_id),
                            Some(RunStatus::RequiresAction),
                        )
                    })?;
                    ensure_complete_batch(&calls, &outputs).map_err(|detail| {
                        AgentError::IncompleteToolOutputs {
                            thread_id: thread_id.clone(),
                            run_id: run_id.clone(),
                            detail,
                        }
                    })?;

                    let failed = outputs
                        .iter()
                        .filter(|output| is_failure_envelope(&output.output))
                        .count();
                    tool_calls += calls.len();
                    tool_errors += failed;
                    let call_ids: Vec<&str> = calls.iter().map(|call| call.id.as_str()).collect();

                    run = until_cancelled(
                        cancel,
                        self.provider
                            .submit_tool_outputs(&thread_id, &run_id, outputs),
                    )
                    .await
                    .ok_or_else(|| {
                        AgentError::cancelled(
                            Some(&thread_id),
                            Some(&run_id),
                            Some(RunStatus::RequiresAction),
                        )
                    })?
                    .map_err(|error| {
                        AgentError::provider(
                            "submit_tool_outputs",
                            Some(&thread_id),
                            Some(&run_id),
                            Some(RunStatus::RequiresAction),
                            error,
                        )
                    })?;
                    info!(
                        thread_id = %thread_id,
                        run_id = %run_id,
                        round = action_rounds,
                        calls = call_ids.len(),
                        failed,
                        "submitted tool outputs"
                    );
                    self.emit(RunEvent::with_fields(
                        EventKind::ToolOutputsSubmitted,
                        &thread_id,
                        json!({
                            "run_id": run_id,
                            "round": action_rounds,
                            "call_ids": call_ids,
                            "failed": failed,
                        }),
                    ));
                }
                last_status => {
                    if poll_attempts >= self.policy.max_attempts {
                        warn!(
                            thread_id = %thread_id,
                            run_id = %run_id,
                            %last_status,
                            poll_attempts,
                            "run polling budget exhausted"
                        );
                        return Err(AgentError::PollTimeout {
                            thread_id,
                            run_id,
                            attempts: poll_attempts,
                            last_status,
                        });
                    }
                    poll_attempts += 1;

                    until_cancelled(cancel, tokio::time::sleep(self.policy.interval))
                        .await
                        .ok_or_else(|| {
                            AgentError::cancelled(Some(&thread_id), Some(&run_id), Some(last_status))
                        })?;
                    let polled =
                        until_cancelled(cancel, self.provider.get_run(&thread_id, &run_id))
                            .await
                            .ok_or_else(|| {
                                AgentError::cancelled(
                                    Some(&thread_id),
                                    Some(&run_id),
                                    Some(last_status),
                                )
                            })?;
                    match polled {
                        Ok(next) => run = next,
                        Err(error) if error.is_transient() => {
                            warn!(
                                thread_id = %thread_id,
                                run_id = %run_id,
                                attempt = poll_attempts,
                                %error,
                                "transient error reading run status; retrying"
                            );
                            self.emit(RunEvent::warning(
                                &thread_id,
                                format!("transient error reading run {run_id}: {error}"),
                            ));
                        }
                        Err(error) => {
                            return Err(AgentError::provider(
                                "get_run",
                                Some(&thread_id),
                                Some(&run_id),
                                Some(last_status),
                                error,
                            ));
                        }
                    }
                }
            }
        }
    }

    fn emit(&self, event: RunEvent) {
        emit_quietly(self.event_emitter.as_ref(), event);
    }
}

/// Checks that `outputs` answers every call of the batch exactly once.
pub fn ensure_complete_batch(calls: &[ToolCall], outputs: &[ToolOutput]) -> Result<(), String> {
    if calls.len() != outputs.len() {
        return Err(format!(
            "{} calls but {} outputs",
            calls.len(),
            outputs.len()
        ));
    }
    let mut seen = HashSet::with_capacity(outputs.len());
    for output in outputs {
        if !seen.insert(output.tool_call_id.as_str()) {
            return Err(format!("duplicate output for call {}", output.tool_call_id));
        }
    }
    for call in calls {
        if !seen.contains(call.id.as_str()) {
            return Err(format!("no output for call {}", call.id));
        }
    }
    Ok(())
}
