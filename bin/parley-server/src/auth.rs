//! Session resolution from `Authorization: Bearer <token>`.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use parley_app_core::Caller;
use tracing::debug;

use crate::state::AppState;

/// Maps request headers to the calling user.
#[async_trait]
pub trait AuthProvider: Send + Sync + fmt::Debug {
    /// `None` when the request carries no valid session.
    async fn authenticate(&self, headers: &HeaderMap) -> Option<Caller>;
}

/// Fixed token table, usually from `PARLEY_API_TOKENS`.
#[derive(Clone, Default)]
pub struct StaticTokenAuth {
    tokens: HashMap<String, String>,
}

impl fmt::Debug for StaticTokenAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StaticTokenAuth({} tokens)", self.tokens.len())
    }
}

impl StaticTokenAuth {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ").or_else(|| raw.strip_prefix("bearer "))?;
    Some(token.trim()).filter(|t| !t.is_empty())
}

#[async_trait]
impl AuthProvider for StaticTokenAuth {
    async fn authenticate(&self, headers: &HeaderMap) -> Option<Caller> {
        let token = bearer_token(headers)?;
        match self.tokens.get(token) {
            Some(user_id) => Some(Caller::new(user_id.clone())),
            None => {
                debug!("unknown bearer token");
                None
            }
        }
    }
}

/// The session of a request, if any. Handlers decide when a missing session
/// is an error, since some checks come first.
#[derive(Debug, Clone)]
pub struct Session(pub Option<Caller>);

impl Session {
    pub fn caller(&self) -> Option<&Caller> {
        self.0.as_ref()
    }
}

impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        Ok(Session(state.auth.authenticate(&parts.headers).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[tokio::test]
    async fn known_tokens_resolve_to_their_user() {
        let auth = StaticTokenAuth::new(HashMap::from([("t1".to_owned(), "alice".to_owned())]));
        assert_eq!(auth.authenticate(&headers("Bearer t1")).await, Some(Caller::new("alice")));
        assert_eq!(auth.authenticate(&headers("Bearer t2")).await, None);
        assert_eq!(auth.authenticate(&headers("Basic t1")).await, None);
        assert_eq!(auth.authenticate(&HeaderMap::new()).await, None);
    }

    #[test]
    fn debug_hides_tokens() {
        let auth = StaticTokenAuth::new(HashMap::from([("secret".to_owned(), "alice".to_owned())]));
        assert!(!format!("{auth:?}").contains("secret"));
    }
}
