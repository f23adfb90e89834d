use crate::store::{ThreadStore, ThreadStoreError, ThreadStoreResult};
use crate::types::{ConversationKey, ThreadBinding, validate_key};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub(crate) struct MemoryState {
    pub bindings: BTreeMap<ConversationKey, String>,
}

impl MemoryState {
    pub(crate) fn bind(&mut self, binding: ThreadBinding) -> ThreadStoreResult<()> {
        validate_key(&binding.key)?;
        if binding.thread_id.trim().is_empty() {
            return Err(ThreadStoreError::InvalidInput(
                "thread id must not be empty".to_string(),
            ));
        }
        self.bindings.insert(binding.key, binding.thread_id);
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryThreadStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_state(state: MemoryState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    pub(crate) fn snapshot(&self) -> ThreadStoreResult<MemoryState> {
        Ok(self.lock()?.clone())
    }

    pub(crate) fn replace(&self, state: MemoryState) -> ThreadStoreResult<()> {
        *self.lock()? = state;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .map(|state| state.bindings.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> ThreadStoreResult<std::sync::MutexGuard<'_, MemoryState>> {
        self.inner
            .lock()
            .map_err(|_| ThreadStoreError::Backend("memory thread store mutex poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl ThreadStore for MemoryThreadStore {
    async fn get(&self, key: &ConversationKey) -> ThreadStoreResult<Option<ThreadBinding>> {
        validate_key(key)?;
        let state = self.lock()?;
        Ok(state
            .bindings
            .get(key)
            .map(|thread_id| ThreadBinding::new(key.clone(), thread_id.clone())))
    }

    async fn put(&self, binding: ThreadBinding) -> ThreadStoreResult<()> {
        self.lock()?.bind(binding)
    }
}
