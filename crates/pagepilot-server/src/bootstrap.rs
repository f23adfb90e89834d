//! Wires configuration into a ready-to-serve agent.

use crate::collaborators::{GithubRepositoryEditor, GraphPagePublisher, InMemoryTaskBoard};
use crate::config::ServerConfig;
use crate::server::ServerError;
use pagepilot_agent::{
    ChatAgent, DashboardCollaborators, ToolRegistry, TracingEventEmitter,
    build_dashboard_tool_registry,
};
use pagepilot_assistant::OpenAiAssistants;
use pagepilot_threadstore::{FsThreadStore, MemoryThreadStore, ThreadStore};
use std::sync::Arc;
use tracing::{info, warn};

/// Registers a tool for every collaborator the configuration enables.
pub fn build_tool_registry(config: &ServerConfig) -> Result<ToolRegistry, ServerError> {
    let mut collaborators = DashboardCollaborators {
        tasks: Some(Arc::new(InMemoryTaskBoard::new())),
        ..DashboardCollaborators::default()
    };
    match &config.facebook {
        Some(settings) => {
            collaborators.pages = Some(Arc::new(GraphPagePublisher::new(settings, None)?));
        }
        None => warn!("facebook page publishing disabled: no page credentials configured"),
    }
    match &config.github {
        Some(settings) => {
            collaborators.repository = Some(Arc::new(GithubRepositoryEditor::new(settings, None)?));
        }
        None => warn!("repository editing disabled: no GitHub credentials configured"),
    }

    let registry = build_dashboard_tool_registry(collaborators);
    info!(tools = ?registry.names(), "tool registry ready");
    Ok(registry)
}

pub fn build_agent(config: &ServerConfig) -> Result<ChatAgent, ServerError> {
    let provider = Arc::new(OpenAiAssistants::new(
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
    )?);
    let store: Arc<dyn ThreadStore> = match &config.thread_store_dir {
        Some(dir) => Arc::new(FsThreadStore::new(dir)?),
        None => Arc::new(MemoryThreadStore::new()),
    };
    let registry = Arc::new(build_tool_registry(config)?);

    let agent = ChatAgent::new_with_emitter(
        provider,
        registry,
        store,
        config.agent.clone(),
        Arc::new(TracingEventEmitter),
    )?;
    info!(
        assistant_id = %config.agent.assistant_id,
        thread_scope = %config.agent.thread_scope,
        "agent ready"
    );
    Ok(agent)
}
