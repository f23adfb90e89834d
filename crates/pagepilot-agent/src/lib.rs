//! Conversational agent run-loop for PagePilot.
//!
//! A chat turn resolves a provider thread, appends the user's message, starts
//! an assistant run and polls it. Whenever the run stops to ask for tools, the
//! pending calls are dispatched concurrently against the tool registry and
//! the whole batch of outputs is submitted back before polling resumes. Once
//! the run completes, the newest assistant message becomes the reply.

pub mod agent;
mod cancellation;
pub mod config;
pub mod errors;
pub mod events;
pub mod poller;
pub mod reply;
pub mod threads;
pub mod tools;
pub mod truncation;

pub use agent::*;
pub use config::*;
pub use errors::*;
pub use events::*;
pub use poller::*;
pub use reply::*;
pub use threads::*;
pub use tools::*;
pub use truncation::*;
