use super::{ToolRegistry, failure_envelope, parse_tool_arguments};
use crate::cancellation::until_cancelled;
use crate::events::{EventEmitter, NoopEventEmitter, RunEvent, emit_quietly};
use crate::{AgentConfig, ToolError, truncate_tool_output};
use futures::FutureExt;
use futures::future::join_all;
use pagepilot_assistant::{ToolCall, ToolOutput};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchOptions {
    pub tool_timeout: Duration,
    pub max_output_chars: usize,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self::from(&AgentConfig::default())
    }
}

impl From<&AgentConfig> for DispatchOptions {
    fn from(config: &AgentConfig) -> Self {
        Self {
            tool_timeout: config.tool_timeout,
            max_output_chars: config.max_tool_output_chars,
        }
    }
}

/// Executes one batch of tool calls concurrently.
///
/// The result always holds exactly one output per call, in call order, each
/// carrying its call's id. Failures of any kind become failure envelopes.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    options: DispatchOptions,
    event_emitter: Arc<dyn EventEmitter>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, options: DispatchOptions) -> Self {
        Self::new_with_emitter(registry, options, Arc::new(NoopEventEmitter))
    }

    pub fn new_with_emitter(
        registry: Arc<ToolRegistry>,
        options: DispatchOptions,
        event_emitter: Arc<dyn EventEmitter>,
    ) -> Self {
        Self {
            registry,
            options,
            event_emitter,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    pub async fn dispatch(
        &self,
        thread_id: &str,
        tool_calls: &[ToolCall],
        cancel: &CancellationToken,
    ) -> Vec<ToolOutput> {
        debug!(thread_id, calls = tool_calls.len(), "dispatching tool batch");
        let futures = tool_calls
            .iter()
            .map(|tool_call| self.dispatch_single(thread_id, tool_call, cancel));
        join_all(futures).await
    }

    async fn dispatch_single(
        &self,
        thread_id: &str,
        tool_call: &ToolCall,
        cancel: &CancellationToken,
    ) -> ToolOutput {
        let start_time = Instant::now();
        emit_quietly(
            self.event_emitter.as_ref(),
            RunEvent::tool_call_start(thread_id, &tool_call.id, &tool_call.name),
        );

        let result = match self.registry.get(&tool_call.name) {
            None => Err(ToolError::Execution(format!("Unknown tool: {}", tool_call.name))),
            Some(registered) => match parse_tool_arguments(tool_call) {
                Err(error) => Err(error),
                Ok(arguments) => {
                    let execution = AssertUnwindSafe((registered.handler)(arguments)).catch_unwind();
                    let bounded = tokio::time::timeout(self.options.tool_timeout, execution);
                    match until_cancelled(cancel, bounded).await {
                        None => Err(ToolError::Cancelled),
                        Some(Err(_elapsed)) => Err(ToolError::Timeout {
                            timeout_ms: self.options.tool_timeout.as_millis(),
                        }),
                        Some(Ok(Err(_panic))) => Err(ToolError::Execution(format!(
                            "tool '{}' panicked",
                            tool_call.name
                        ))),
                        Some(Ok(Ok(result))) => result,
                    }
                }
            },
        };

        let duration_ms = start_time.elapsed().as_millis();
        match result {
            Ok(output) => {
                emit_quietly(
                    self.event_emitter.as_ref(),
                    RunEvent::tool_call_end(thread_id, &tool_call.id, &tool_call.name, duration_ms, None),
                );
                debug!(thread_id, call_id = %tool_call.id, tool = %tool_call.name, duration_ms, "tool call succeeded");
                ToolOutput::new(
                    tool_call.id.clone(),
                    truncate_tool_output(output, self.options.max_output_chars),
                )
            }
            Err(error) => {
                let message = error.to_string();
                warn!(thread_id, call_id = %tool_call.id, tool = %tool_call.name, duration_ms, error = %message, "tool call failed");
                emit_quietly(
                    self.event_emitter.as_ref(),
                    RunEvent::tool_call_end(
                        thread_id,
                        &tool_call.id,
                        &tool_call.name,
                        duration_ms,
                        Some(&message),
                    ),
                );
                ToolOutput::new(tool_call.id.clone(), failure_envelope(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BufferedEventEmitter, EventKind, RegisteredTool};
    use serde_json::{Value, json};

    fn registry_with(tools: Vec<RegisteredTool>) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::default();
        for tool in tools {
            registry.register(tool);
        }
        Arc::new(registry)
    }

    #[tokio::test(flavor = "current_thread")]
    async fn unknown_tool_gets_failure_envelope_naming_it() {
        let dispatcher = ToolDispatcher::new(registry_with(vec![]), DispatchOptions::default());
        let outputs = dispatcher
            .dispatch(
                "thread_1",
                &[ToolCall::new("call_1", "deployProduction", json!({}))],
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].tool_call_id, "call_1");
        assert_eq!(
            outputs[0].output,
            json!({ "success": false, "error": "Unknown tool: deployProduction" })
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn oversized_success_output_is_truncated() {
        let tool = RegisteredTool::new("dump", "", json!({}), |_| async {
            Ok(Value::String("x".repeat(500)))
        });
        let dispatcher = ToolDispatcher::new(
            registry_with(vec![tool]),
            DispatchOptions {
                tool_timeout: Duration::from_secs(5),
                max_output_chars: 100,
            },
        );
        let outputs = dispatcher
            .dispatch(
                "thread_1",
                &[ToolCall::new("call_1", "dump", json!({}))],
                &CancellationToken::new(),
            )
            .await;
        let text = outputs[0].output.as_str().expect("text output");
        assert!(text.contains("characters were removed from the middle"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn emits_start_and_end_event_per_call() {
        let emitter = BufferedEventEmitter::default();
        let tool = RegisteredTool::new("ok", "", json!({}), |_| async { Ok(json!({})) });
        let dispatcher = ToolDispatcher::new_with_emitter(
            registry_with(vec![tool]),
            DispatchOptions::default(),
            Arc::new(emitter.clone()),
        );
        dispatcher
            .dispatch(
                "thread_1",
                &[
                    ToolCall::new("call_1", "ok", json!({})),
                    ToolCall::new("call_2", "missing", json!({})),
                ],
                &CancellationToken::new(),
            )
            .await;

        let kinds = emitter.kinds();
        assert_eq!(
            kinds.iter().filter(|kind| **kind == EventKind::ToolCallStart).count(),
            2
        );
        let ends: Vec<_> = emitter
            .snapshot()
            .into_iter()
            .filter(|event| event.kind == EventKind::ToolCallEnd)
            .collect();
        assert_eq!(ends.len(), 2);
        assert!(ends.iter().any(|event| event.data.get("is_error") == Some(&Value::Bool(true))));
    }
}
