//! Provider adapter contract.

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::types::{CreateRunRequest, Message, Run, Thread, ToolOutput};

/// Hosted assistant reachable through threads and runs.
///
/// Every method is a single remote call. `get_run` and `list_messages` are
/// idempotent and safe to repeat; the others are not deduplicated remotely.
#[async_trait]
pub trait AssistantProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn create_thread(&self) -> Result<Thread, ProviderError>;

    async fn append_message(&self, thread_id: &str, content: &str)
    -> Result<Message, ProviderError>;

    async fn create_run(
        &self,
        thread_id: &str,
        request: CreateRunRequest,
    ) -> Result<Run, ProviderError>;

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ProviderError>;

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<Run, ProviderError>;

    /// Most recent messages first, at most `limit` of them.
    async fn list_messages(&self, thread_id: &str, limit: usize)
    -> Result<Vec<Message>, ProviderError>;
}
