use crate::store::{ThreadStoreError, ThreadStoreResult};
use serde::{Deserialize, Serialize};

pub type ConversationKey = String;

pub const MAX_KEY_LEN: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadBinding {
    pub key: ConversationKey,
    pub thread_id: String,
}

impl ThreadBinding {
    pub fn new(key: impl Into<String>, thread_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            thread_id: thread_id.into(),
        }
    }
}

pub fn validate_key(key: &str) -> ThreadStoreResult<()> {
    if key.trim().is_empty() {
        return Err(ThreadStoreError::InvalidInput(
            "conversation key must not be empty".to_string(),
        ));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(ThreadStoreError::InvalidInput(format!(
            "conversation key exceeds {MAX_KEY_LEN} bytes"
        )));
    }
    Ok(())
}
