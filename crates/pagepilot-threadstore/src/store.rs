use crate::types::{ConversationKey, ThreadBinding};

#[derive(Debug, thiserror::Error)]
pub enum ThreadStoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

pub type ThreadStoreResult<T> = Result<T, ThreadStoreError>;

/// Durable mapping from a conversation key to the provider thread serving it.
#[async_trait::async_trait]
pub trait ThreadStore: Send + Sync {
    async fn get(&self, key: &ConversationKey) -> ThreadStoreResult<Option<ThreadBinding>>;

    /// Inserts or replaces the binding for `binding.key`.
    async fn put(&self, binding: ThreadBinding) -> ThreadStoreResult<()>;
}
