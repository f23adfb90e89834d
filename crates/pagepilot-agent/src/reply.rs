use crate::AgentError;
use crate::cancellation::until_cancelled;
use pagepilot_assistant::{AssistantProvider, Message, Role};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Reads the assistant's answer once a run has completed.
#[derive(Clone)]
pub struct ReplyExtractor {
    provider: Arc<dyn AssistantProvider>,
    message_limit: usize,
    placeholder: String,
}

impl ReplyExtractor {
    pub fn new(
        provider: Arc<dyn AssistantProvider>,
        message_limit: usize,
        placeholder: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            message_limit,
            placeholder: placeholder.into(),
        }
    }

    pub async fn extract(
        &self,
        thread_id: &str,
        run_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        let messages = until_cancelled(
            cancel,
            self.provider.list_messages(thread_id, self.message_limit),
        )
        .await
        .ok_or_else(|| AgentError::cancelled(Some(thread_id), Some(run_id), None))?
        .map_err(|error| {
            AgentError::provider("list_messages", Some(thread_id), Some(run_id), None, error)
        })?;

        match select_reply(&messages, run_id) {
            Some(text) => Ok(text),
            None => {
                debug!(thread_id, run_id, "no assistant text found; using placeholder");
                Ok(self.placeholder.clone())
            }
        }
    }
}

/// Picks the newest assistant message, preferring one written by `run_id`.
///
/// `messages` must be ordered newest first.
pub fn select_reply(messages: &[Message], run_id: &str) -> Option<String> {
    let mut assistant = messages
        .iter()
        .filter(|message| message.role == Role::Assistant);
    let from_run = assistant
        .clone()
        .find(|message| message.run_id.as_deref() == Some(run_id));
    from_run
        .or_else(|| assistant.next())
        .map(Message::text)
        .filter(|text| !text.is_empty())
}
