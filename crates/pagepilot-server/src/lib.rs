//! HTTP front end and CLI plumbing for the PagePilot dashboard assistant.

pub mod auth;
pub mod bootstrap;
pub mod collaborators;
pub mod config;
pub mod server;
pub mod telemetry;

pub use auth::{ApiTokens, AuthenticatedSession};
pub use bootstrap::{build_agent, build_tool_registry};
pub use config::{ConfigError, FacebookSettings, GithubSettings, ServerConfig};
pub use server::{ApiError, AppState, ServerError, build_router, serve};
