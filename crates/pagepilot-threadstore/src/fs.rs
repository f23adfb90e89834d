use crate::memory::{MemoryState, MemoryThreadStore};
use crate::store::{ThreadStore, ThreadStoreError, ThreadStoreResult};
use crate::types::{ConversationKey, ThreadBinding};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const STATE_FILE_NAME: &str = "thread-bindings.json";

/// File-backed store: the whole map is rewritten atomically after each change.
#[derive(Clone, Debug)]
pub struct FsThreadStore {
    state_file: PathBuf,
    inner: MemoryThreadStore,
    write_lock: Arc<Mutex<()>>,
}

impl FsThreadStore {
    pub fn new<P: AsRef<Path>>(root: P) -> ThreadStoreResult<Self> {
        fs::create_dir_all(root.as_ref()).map_err(|err| {
            ThreadStoreError::Backend(format!("create thread store root failed: {err}"))
        })?;
        let state_file = root.as_ref().join(STATE_FILE_NAME);
        let state = if state_file.exists() {
            let raw = fs::read(&state_file).map_err(|err| {
                ThreadStoreError::Backend(format!("read state file failed: {err}"))
            })?;
            serde_json::from_slice::<MemoryState>(&raw)
                .map_err(|err| ThreadStoreError::Serialization(err.to_string()))?
        } else {
            MemoryState::default()
        };

        Ok(Self {
            state_file,
            inner: MemoryThreadStore::from_state(state),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    /// Writes `state` to disk; callers commit it to memory only on success.
    fn persist(&self, state: &MemoryState) -> ThreadStoreResult<()> {
        let raw = serde_json::to_vec_pretty(state)
            .map_err(|err| ThreadStoreError::Serialization(err.to_string()))?;
        let tmp = self.state_file.with_extension("json.tmp");
        fs::write(&tmp, raw)
            .map_err(|err| ThreadStoreError::Backend(format!("write state file failed: {err}")))?;
        fs::rename(&tmp, &self.state_file)
            .map_err(|err| ThreadStoreError::Backend(format!("rename state file failed: {err}")))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ThreadStore for FsThreadStore {
    async fn get(&self, key: &ConversationKey) -> ThreadStoreResult<Option<ThreadBinding>> {
        self.inner.get(key).await
    }

    async fn put(&self, binding: ThreadBinding) -> ThreadStoreResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| ThreadStoreError::Backend("thread store write lock poisoned".to_string()))?;
        let mut next = self.inner.snapshot()?;
        next.bind(binding)?;
        self.persist(&next)?;
        self.inner.replace(next)
    }
}
