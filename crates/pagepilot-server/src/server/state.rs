use crate::auth::ApiTokens;
use pagepilot_agent::ChatAgent;
use tokio_util::sync::CancellationToken;

/// Shared by every request; holds no per-request state.
pub struct AppState {
    agent: ChatAgent,
    tokens: ApiTokens,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(agent: ChatAgent, tokens: ApiTokens, shutdown: CancellationToken) -> Self {
        Self {
            agent,
            tokens,
            shutdown,
        }
    }

    pub fn agent(&self) -> &ChatAgent {
        &self.agent
    }

    pub fn tokens(&self) -> &ApiTokens {
        &self.tokens
    }

    /// Token for one request; cancelled when the server shuts down.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }
}
