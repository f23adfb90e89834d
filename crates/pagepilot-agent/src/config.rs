use crate::AgentError;
use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_EMPTY_REPLY_PLACEHOLDER: &str = "(The assistant returned no text.)";

/// Where the thread handle of a conversation lives between requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThreadScope {
    /// The client carries the thread id; nothing is stored server-side.
    #[default]
    Request,
    /// The thread is bound to the authenticated session in the thread store.
    Session,
}

impl ThreadScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Session => "session",
        }
    }
}

impl Display for ThreadScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreadScope {
    type Err = AgentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "request" => Ok(Self::Request),
            "session" => Ok(Self::Session),
            other => Err(AgentError::InvalidConfiguration(format!(
                "unknown thread scope '{other}'; expected 'request' or 'session'"
            ))),
        }
    }
}

/// Runtime configuration for chat turns.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentConfig {
    pub assistant_id: String,
    pub instructions: Option<String>,
    pub poll_interval: Duration,
    pub max_poll_attempts: usize,
    pub max_action_rounds: usize,
    pub tool_timeout: Duration,
    pub max_tool_output_chars: usize,
    pub reply_message_limit: usize,
    pub empty_reply_placeholder: String,
    pub thread_scope: ThreadScope,
    pub send_tool_definitions: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            assistant_id: String::new(),
            instructions: None,
            poll_interval: Duration::from_millis(1_000),
            max_poll_attempts: 60,
            max_action_rounds: 10,
            tool_timeout: Duration::from_secs(60),
            max_tool_output_chars: 20_000,
            reply_message_limit: 20,
            empty_reply_placeholder: DEFAULT_EMPTY_REPLY_PLACEHOLDER.to_string(),
            thread_scope: ThreadScope::Request,
            send_tool_definitions: false,
        }
    }
}

impl AgentConfig {
    pub fn new(assistant_id: impl Into<String>) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        if self.assistant_id.trim().is_empty() {
            return Err(AgentError::InvalidConfiguration(
                "assistant id must not be empty".to_string(),
            ));
        }
        if self.max_poll_attempts == 0 {
            return Err(AgentError::InvalidConfiguration(
                "max_poll_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_action_rounds == 0 {
            return Err(AgentError::InvalidConfiguration(
                "max_action_rounds must be at least 1".to_string(),
            ));
        }
        if self.reply_message_limit == 0 {
            return Err(AgentError::InvalidConfiguration(
                "reply_message_limit must be at least 1".to_string(),
            ));
        }
        if self.tool_timeout.is_zero() {
            return Err(AgentError::InvalidConfiguration(
                "tool_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Upper bound on how long one run may be polled, excluding tool time.
    pub fn max_poll_wait(&self) -> Duration {
        self.poll_interval
            .saturating_mul(u32::try_from(self.max_poll_attempts).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_config_defaults_match_baseline() {
        let config = AgentConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.max_poll_attempts, 60);
        assert_eq!(config.max_action_rounds, 10);
        assert_eq!(config.tool_timeout, Duration::from_secs(60));
        assert_eq!(config.reply_message_limit, 20);
        assert_eq!(config.thread_scope, ThreadScope::Request);
        assert!(!config.send_tool_definitions);
        assert_eq!(config.max_poll_wait(), Duration::from_secs(60));
    }

    #[test]
    fn validate_requires_assistant_and_positive_bounds() {
        assert!(AgentConfig::default().validate().is_err());
        assert!(AgentConfig::new("asst_1").validate().is_ok());

        let mut config = AgentConfig::new("asst_1");
        config.max_poll_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = AgentConfig::new("asst_1");
        config.max_action_rounds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn thread_scope_parses_case_insensitively() {
        assert_eq!("Session".parse::<ThreadScope>().ok(), Some(ThreadScope::Session));
        assert_eq!(" request ".parse::<ThreadScope>().ok(), Some(ThreadScope::Request));
        assert!("global".parse::<ThreadScope>().is_err());
    }
}
