//! Error taxonomy for provider calls.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error)]
#[error("invalid provider configuration: {message}")]
pub struct ConfigurationError {
    pub message: String,
}

impl ConfigurationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum ProviderError {
    #[error("provider request failed with status {status}: {message}")]
    Http { status: u16, message: String },
    #[error("provider transport error: {0}")]
    Transport(String),
    #[error("provider response could not be decoded: {0}")]
    Decode(String),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl ProviderError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether repeating the same idempotent call later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Transport(_) => true,
            Self::Decode(_) | Self::Configuration(_) => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return Self::Decode(error.to_string());
        }
        if let Some(status) = error.status() {
            return Self::http(status.as_u16(), error.to_string());
        }
        Self::Transport(error.to_string())
    }
}
