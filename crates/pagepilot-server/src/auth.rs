use crate::server::{ApiError, AppState};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Bearer tokens accepted by the API, each bound to a session name.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiTokens {
    sessions_by_token: HashMap<String, String>,
}

impl ApiTokens {
    /// Parses `session:token` pairs separated by commas.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut tokens = Self::default();
        for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let Some((session, token)) = entry.split_once(':') else {
                return Err(format!("entry '{entry}' is not a session:token pair"));
            };
            let (session, token) = (session.trim(), token.trim());
            if session.is_empty() || token.is_empty() {
                return Err("session and token must both be non-empty".to_string());
            }
            tokens.insert(session, token)?;
        }
        Ok(tokens)
    }

    pub fn insert(&mut self, session: &str, token: &str) -> Result<(), String> {
        if self.sessions_by_token.contains_key(token) {
            return Err(format!("token for session '{session}' is already in use"));
        }
        self.sessions_by_token
            .insert(token.to_string(), session.to_string());
        Ok(())
    }

    pub fn session_for(&self, token: &str) -> Option<&str> {
        self.sessions_by_token.get(token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sessions_by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions_by_token.is_empty()
    }
}

impl fmt::Debug for ApiTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sessions: Vec<&str> = self.sessions_by_token.values().map(String::as_str).collect();
        sessions.sort_unstable();
        f.debug_struct("ApiTokens").field("sessions", &sessions).finish()
    }
}

/// Session name of a request carrying a known bearer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedSession(pub String);

impl AuthenticatedSession {
    /// Key under which session-scoped threads are stored.
    pub fn conversation_key(&self) -> String {
        format!("session:{}", self.0)
    }
}

impl FromRequestParts<Arc<AppState>> for AuthenticatedSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or_else(|| ApiError::unauthenticated("missing bearer token"))?;
        state
            .tokens()
            .session_for(token)
            .map(|session| Self(session.to_string()))
            .ok_or_else(|| ApiError::unauthenticated("unknown bearer token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_comma_separated_pairs() {
        let tokens = ApiTokens::parse("alice:tok-a, bob:tok-b,").expect("valid tokens");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens.session_for("tok-a"), Some("alice"));
        assert_eq!(tokens.session_for("tok-c"), None);
    }

    #[test]
    fn parse_rejects_malformed_and_duplicate_entries() {
        assert!(ApiTokens::parse("alice").is_err());
        assert!(ApiTokens::parse("alice:").is_err());
        assert!(ApiTokens::parse("alice:tok,bob:tok").is_err());
    }

    #[test]
    fn debug_output_hides_tokens() {
        let tokens = ApiTokens::parse("alice:super-secret").expect("valid tokens");
        let rendered = format!("{tokens:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("super-secret"));
    }
}
