use crate::auth::ApiTokens;
use pagepilot_agent::{AgentConfig, ThreadScope};
use pagepilot_assistant::openai::{API_KEY_ENV, BASE_URL_ENV};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const ADDR_ENV: &str = "PAGEPILOT_ADDR";
pub const API_TOKENS_ENV: &str = "PAGEPILOT_API_TOKENS";
pub const THREAD_SCOPE_ENV: &str = "PAGEPILOT_THREAD_SCOPE";
pub const THREAD_STORE_ENV: &str = "PAGEPILOT_THREAD_STORE";
pub const POLL_INTERVAL_MS_ENV: &str = "PAGEPILOT_POLL_INTERVAL_MS";
pub const MAX_POLL_ATTEMPTS_ENV: &str = "PAGEPILOT_MAX_POLL_ATTEMPTS";
pub const ASSISTANT_ID_ENV: &str = "OPENAI_ASSISTANT_ID";
pub const FACEBOOK_PAGE_ID_ENV: &str = "FACEBOOK_PAGE_ID";
pub const FACEBOOK_TOKEN_ENV: &str = "FACEBOOK_PAGE_ACCESS_TOKEN";
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const GITHUB_REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";
pub const GITHUB_BRANCH_ENV: &str = "GITHUB_BRANCH";

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_GITHUB_BRANCH: &str = "main";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct FacebookSettings {
    pub page_id: String,
    pub access_token: String,
}

impl fmt::Debug for FacebookSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacebookSettings")
            .field("page_id", &self.page_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct GithubSettings {
    pub token: String,
    pub repository: String,
    pub branch: String,
}

impl fmt::Debug for GithubSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubSettings")
            .field("repository", &self.repository)
            .field("branch", &self.branch)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Everything the binary needs, read from the environment.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub api_tokens: ApiTokens,
    pub thread_store_dir: Option<PathBuf>,
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub agent: AgentConfig,
    pub facebook: Option<FacebookSettings>,
    pub github: Option<GithubSettings>,
}

impl ServerConfig {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let addr = match get(ADDR_ENV) {
            Some(value) => value
                .parse()
                .map_err(|error| ConfigError::invalid(ADDR_ENV, format!("{error}")))?,
            None => DEFAULT_ADDR
                .parse()
                .map_err(|error| ConfigError::invalid(ADDR_ENV, format!("{error}")))?,
        };
        let api_tokens = match get(API_TOKENS_ENV) {
            Some(value) => ApiTokens::parse(&value)
                .map_err(|message| ConfigError::invalid(API_TOKENS_ENV, message))?,
            None => ApiTokens::default(),
        };

        let mut agent = AgentConfig::new(get(ASSISTANT_ID_ENV).ok_or(ConfigError::Missing(ASSISTANT_ID_ENV))?);
        if let Some(value) = get(THREAD_SCOPE_ENV) {
            agent.thread_scope = value
                .parse::<ThreadScope>()
                .map_err(|error| ConfigError::invalid(THREAD_SCOPE_ENV, error.to_string()))?;
        }
        if let Some(value) = get(POLL_INTERVAL_MS_ENV) {
            let millis = parse_positive(POLL_INTERVAL_MS_ENV, &value)?;
            agent.poll_interval = Duration::from_millis(millis);
        }
        if let Some(value) = get(MAX_POLL_ATTEMPTS_ENV) {
            agent.max_poll_attempts = parse_positive(MAX_POLL_ATTEMPTS_ENV, &value)? as usize;
        }

        let facebook = match (get(FACEBOOK_PAGE_ID_ENV), get(FACEBOOK_TOKEN_ENV)) {
            (Some(page_id), Some(access_token)) => Some(FacebookSettings {
                page_id,
                access_token,
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(FACEBOOK_TOKEN_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(FACEBOOK_PAGE_ID_ENV)),
        };
        let github = match (get(GITHUB_TOKEN_ENV), get(GITHUB_REPOSITORY_ENV)) {
            (Some(token), Some(repository)) => {
                if repository.split('/').filter(|part| !part.is_empty()).count() != 2 {
                    return Err(ConfigError::invalid(
                        GITHUB_REPOSITORY_ENV,
                        "expected owner/name",
                    ));
                }
                Some(GithubSettings {
                    token,
                    repository,
                    branch: get(GITHUB_BRANCH_ENV)
                        .unwrap_or_else(|| DEFAULT_GITHUB_BRANCH.to_string()),
                })
            }
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(GITHUB_REPOSITORY_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(GITHUB_TOKEN_ENV)),
        };

        Ok(Self {
            addr,
            api_tokens,
            thread_store_dir: get(THREAD_STORE_ENV).map(PathBuf::from),
            openai_api_key: get(API_KEY_ENV).ok_or(ConfigError::Missing(API_KEY_ENV))?,
            openai_base_url: get(BASE_URL_ENV),
            agent,
            facebook,
            github,
        })
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.parse::<u64>() {
        Ok(0) => Err(ConfigError::invalid(key, "must be greater than zero")),
        Ok(parsed) => Ok(parsed),
        Err(error) => Err(ConfigError::invalid(key, error.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("OPENAI_API_KEY", "sk-test"),
        ("OPENAI_ASSISTANT_ID", "asst_1"),
    ];

    #[test]
    fn minimal_environment_uses_defaults() {
        let config = ServerConfig::from_lookup(lookup(&REQUIRED)).expect("config loads");
        assert_eq!(config.addr.to_string(), DEFAULT_ADDR);
        assert_eq!(config.agent.assistant_id, "asst_1");
        assert_eq!(config.agent.thread_scope, ThreadScope::Request);
        assert!(config.api_tokens.is_empty());
        assert!(config.facebook.is_none());
        assert!(config.github.is_none());
        assert!(config.thread_store_dir.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("PAGEPILOT_ADDR", "0.0.0.0:9000"),
            ("PAGEPILOT_THREAD_SCOPE", "session"),
            ("PAGEPILOT_POLL_INTERVAL_MS", "250"),
            ("PAGEPILOT_MAX_POLL_ATTEMPTS", "8"),
            ("PAGEPILOT_API_TOKENS", "alice:tok-a, bob:tok-b"),
            ("GITHUB_TOKEN", "ghp_x"),
            ("GITHUB_REPOSITORY", "acme/site"),
        ]);
        let config = ServerConfig::from_lookup(lookup(&pairs)).expect("config loads");
        assert_eq!(config.addr.port(), 9000);
        assert_eq!(config.agent.thread_scope, ThreadScope::Session);
        assert_eq!(config.agent.poll_interval, Duration::from_millis(250));
        assert_eq!(config.agent.max_poll_attempts, 8);
        assert_eq!(config.api_tokens.session_for("tok-b"), Some("bob"));
        let github = config.github.expect("github configured");
        assert_eq!(github.branch, DEFAULT_GITHUB_BRANCH);
    }

    #[test]
    fn missing_and_invalid_values_are_reported() {
        let error = ServerConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk")]))
            .expect_err("assistant id required");
        assert_eq!(error, ConfigError::Missing(ASSISTANT_ID_ENV));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PAGEPILOT_MAX_POLL_ATTEMPTS", "0"));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { key: MAX_POLL_ATTEMPTS_ENV, .. })
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("FACEBOOK_PAGE_ID", "123"));
        assert_eq!(
            ServerConfig::from_lookup(lookup(&pairs)).expect_err("token required"),
            ConfigError::Missing(FACEBOOK_TOKEN_ENV)
        );
    }

    #[test]
    fn settings_debug_output_redacts_secrets() {
        let settings = FacebookSettings {
            page_id: "123".to_string(),
            access_token: "EAAB-secret".to_string(),
        };
        assert!(!format!("{settings:?}").contains("EAAB-secret"));
    }
}
