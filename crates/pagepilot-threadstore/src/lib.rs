pub mod fs;
pub mod memory;
pub mod store;
pub mod types;

pub use fs::FsThreadStore;
pub use memory::MemoryThreadStore;
pub use store::{ThreadStore, ThreadStoreError, ThreadStoreResult};
pub use types::{ConversationKey, MAX_KEY_LEN, ThreadBinding, validate_key};
