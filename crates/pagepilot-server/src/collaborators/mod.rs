//! Concrete backends for the dashboard tools.

mod facebook;
mod github;
mod tasks;

pub use facebook::{DEFAULT_GRAPH_URL, GraphPagePublisher};
pub use github::{DEFAULT_GITHUB_API_URL, GithubRepositoryEditor};
pub use tasks::InMemoryTaskBoard;

use serde_json::Value;
use std::time::Duration;

pub(crate) const COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Pulls a human-readable message out of a JSON error body.
pub(crate) fn error_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_reads_graph_and_github_shapes() {
        assert_eq!(
            error_message(r#"{"error":{"message":"Invalid OAuth access token."}}"#, "x"),
            "Invalid OAuth access token."
        );
        assert_eq!(
            error_message(r#"{"message":"Bad credentials"}"#, "x"),
            "Bad credentials"
        );
        assert_eq!(error_message("<html>", "HTTP 502"), "HTTP 502");
    }
}
