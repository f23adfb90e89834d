//! Remote assistant provider contract for PagePilot.
//!
//! The agent run-loop talks to a hosted "assistant" through threads, runs and
//! tool-output submissions. This crate owns the typed view of those objects,
//! the provider trait the run-loop is written against, and the OpenAI
//! Assistants HTTP adapter used in production.

pub mod errors;
pub mod openai;
pub mod provider;
pub mod types;

pub use errors::{ConfigurationError, ProviderError};
pub use openai::OpenAiAssistants;
pub use provider::AssistantProvider;
pub use types::*;
