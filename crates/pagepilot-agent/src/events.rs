use crate::AgentError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

pub type EventData = HashMap<String, Value>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TurnStart,
    ThreadResolved,
    MessageAppended,
    RunCreated,
    RunStatusChanged,
    ToolCallStart,
    ToolCallEnd,
    ToolOutputsSubmitted,
    TurnEnd,
    Warning,
    Error,
}

/// Something observable that happened while serving one chat turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    pub kind: EventKind,
    pub timestamp: String,
    pub thread_id: String,
    pub data: EventData,
}

impl RunEvent {
    pub fn new(kind: EventKind, thread_id: impl Into<String>, data: EventData) -> Self {
        Self {
            kind,
            timestamp: current_timestamp(),
            thread_id: thread_id.into(),
            data,
        }
    }

    /// Builds an event whose data is the fields of a JSON object.
    pub fn with_fields(kind: EventKind, thread_id: impl Into<String>, fields: Value) -> Self {
        let data = match fields {
            Value::Object(map) => map.into_iter().collect(),
            Value::Null => EventData::new(),
            other => EventData::from([("value".to_string(), other)]),
        };
        Self::new(kind, thread_id, data)
    }

    pub fn tool_call_start(thread_id: &str, call_id: &str, tool_name: &str) -> Self {
        Self::with_fields(
            EventKind::ToolCallStart,
            thread_id,
            json!({ "call_id": call_id, "tool_name": tool_name }),
        )
    }

    pub fn tool_call_end(
        thread_id: &str,
        call_id: &str,
        tool_name: &str,
        duration_ms: u128,
        error: Option<&str>,
    ) -> Self {
        let mut fields = json!({
            "call_id": call_id,
            "tool_name": tool_name,
            "duration_ms": duration_ms,
            "is_error": error.is_some(),
        });
        if let Some(error) = error {
            fields["error"] = Value::String(error.to_string());
        }
        Self::with_fields(EventKind::ToolCallEnd, thread_id, fields)
    }

    pub fn warning(thread_id: &str, message: impl Into<String>) -> Self {
        Self::with_fields(
            EventKind::Warning,
            thread_id,
            json!({ "message": message.into() }),
        )
    }

    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: RunEvent) -> Result<(), AgentError>;
}

#[derive(Default)]
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit(&self, _event: RunEvent) -> Result<(), AgentError> {
        Ok(())
    }
}

/// Keeps every event in memory; used by tests and the one-shot CLI.
#[derive(Clone, Default)]
pub struct BufferedEventEmitter {
    inner: Arc<Mutex<Vec<RunEvent>>>,
}

impl BufferedEventEmitter {
    pub fn snapshot(&self) -> Vec<RunEvent> {
        self.inner
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.snapshot().into_iter().map(|event| event.kind).collect()
    }
}

impl EventEmitter for BufferedEventEmitter {
    fn emit(&self, event: RunEvent) -> Result<(), AgentError> {
        let mut guard = self.inner.lock().map_err(|_| {
            AgentError::InvalidConfiguration("buffered emitter mutex poisoned".to_string())
        })?;
        guard.push(event);
        Ok(())
    }
}

/// Forwards events to `tracing` at debug level, warnings and errors above it.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEventEmitter;

impl EventEmitter for TracingEventEmitter {
    fn emit(&self, event: RunEvent) -> Result<(), AgentError> {
        let data = serde_json::to_string(&event.data).unwrap_or_default();
        match event.kind {
            EventKind::Error => {
                tracing::error!(kind = ?event.kind, thread_id = %event.thread_id, %data, "run event")
            }
            EventKind::Warning => {
                tracing::warn!(kind = ?event.kind, thread_id = %event.thread_id, %data, "run event")
            }
            _ => {
                tracing::debug!(kind = ?event.kind, thread_id = %event.thread_id, %data, "run event")
            }
        }
        Ok(())
    }
}

/// Emits without letting an observer failure disturb the turn.
pub(crate) fn emit_quietly(emitter: &dyn EventEmitter, event: RunEvent) {
    if let Err(error) = emitter.emit(event) {
        tracing::warn!(%error, "dropping run event");
    }
}

pub(crate) fn current_timestamp() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default();
    secs.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_event_emitter_stores_emitted_events() {
        let emitter = BufferedEventEmitter::default();
        emitter
            .emit(RunEvent::new(EventKind::TurnStart, "thread_1", EventData::new()))
            .expect("emit should succeed");

        let events = emitter.snapshot();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::TurnStart);
        assert_eq!(events[0].thread_id, "thread_1");
    }

    #[test]
    fn tool_call_end_records_error_only_when_present() {
        let ok = RunEvent::tool_call_end("thread_1", "call_1", "createTask", 12, None);
        assert_eq!(ok.data.get("is_error"), Some(&Value::Bool(false)));
        assert!(!ok.data.contains_key("error"));

        let failed =
            RunEvent::tool_call_end("thread_1", "call_2", "createTask", 3, Some("board missing"));
        assert_eq!(failed.data.get("is_error"), Some(&Value::Bool(true)));
        assert_eq!(failed.field_str("error"), Some("board missing"));
    }

    #[test]
    fn event_kind_serializes_as_snake_case() {
        let encoded = serde_json::to_string(&EventKind::ToolOutputsSubmitted).expect("encode");
        assert_eq!(encoded, "\"tool_outputs_submitted\"");
    }
}
