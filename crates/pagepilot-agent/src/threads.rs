use crate::cancellation::until_cancelled;
use crate::{AgentError, ThreadScope};
use pagepilot_assistant::AssistantProvider;
use pagepilot_threadstore::{ThreadBinding, ThreadStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const MAX_THREAD_ID_LEN: usize = 128;

/// A usable thread handle for one chat turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedThread {
    pub thread_id: String,
    pub created: bool,
}

/// Maps an incoming request onto a provider thread according to the scope.
#[derive(Clone)]
pub struct ThreadManager {
    provider: Arc<dyn AssistantProvider>,
    store: Arc<dyn ThreadStore>,
    scope: ThreadScope,
}

impl ThreadManager {
    pub fn new(
        provider: Arc<dyn AssistantProvider>,
        store: Arc<dyn ThreadStore>,
        scope: ThreadScope,
    ) -> Self {
        Self {
            provider,
            store,
            scope,
        }
    }

    pub fn scope(&self) -> ThreadScope {
        self.scope
    }

    /// Reuses `requested` when given, otherwise the session's stored thread
    /// (session scope only), otherwise creates a new remote thread.
    pub async fn resolve(
        &self,
        requested: Option<&str>,
        session_key: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ResolvedThread, AgentError> {
        let session_key = match (self.scope, session_key) {
            (ThreadScope::Session, Some(key)) => Some(key.to_string()),
            (ThreadScope::Session, None) => {
                debug!("session scope without a session key; thread will not be persisted");
                None
            }
            (ThreadScope::Request, _) => None,
        };

        if let Some(thread_id) = requested {
            validate_thread_id(thread_id)?;
            if let Some(key) = session_key {
                self.bind(key, thread_id).await?;
            }
            return Ok(ResolvedThread {
                thread_id: thread_id.to_string(),
                created: false,
            });
        }

        if let Some(key) = &session_key {
            if let Some(binding) = self.store.get(key).await? {
                debug!(session = %key, thread_id = %binding.thread_id, "reusing session thread");
                return Ok(ResolvedThread {
                    thread_id: binding.thread_id,
                    created: false,
                });
            }
        }

        let thread = until_cancelled(cancel, self.provider.create_thread())
            .await
            .ok_or_else(|| AgentError::cancelled(None, None, None))?
            .map_err(|error| AgentError::provider("create_thread", None, None, None, error))?;
        info!(thread_id = %thread.id, scope = %self.scope, "created assistant thread");

        if let Some(key) = session_key {
            self.bind(key, &thread.id).await?;
        }
        Ok(ResolvedThread {
            thread_id: thread.id,
            created: true,
        })
    }

    async fn bind(&self, key: String, thread_id: &str) -> Result<(), AgentError> {
        self.store.put(ThreadBinding::new(key, thread_id)).await?;
        Ok(())
    }
}

/// Thread ids are interpolated into provider URLs, so only plain id
/// characters are accepted.
pub fn validate_thread_id(thread_id: &str) -> Result<(), AgentError> {
    if thread_id.is_empty() {
        return Err(AgentError::InvalidInput(
            "threadId must not be empty".to_string(),
        ));
    }
    if thread_id.len() > MAX_THREAD_ID_LEN {
        return Err(AgentError::InvalidInput(format!(
            "threadId exceeds {MAX_THREAD_ID_LEN} characters"
        )));
    }
    if !thread_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AgentError::InvalidInput(format!(
            "threadId '{thread_id}' contains unsupported characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_thread_id_accepts_provider_ids_only() {
        assert!(validate_thread_id("thread_abc123-XY").is_ok());
        assert!(validate_thread_id("").is_err());
        assert!(validate_thread_id("thread/../runs").is_err());
        assert!(validate_thread_id("thread abc").is_err());
        assert!(validate_thread_id(&"a".repeat(MAX_THREAD_ID_LEN + 1)).is_err());
    }
}
