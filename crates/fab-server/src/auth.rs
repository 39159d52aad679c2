use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use fab_sdk::{ErrorKind, Fab, Requester};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// What a request presented to prove who it is.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

impl Credentials {
    /// Read the `Authorization` header. No header means anonymous; a header
    /// that is not `Bearer <token>` is rejected.
    pub fn from_headers(headers: &HeaderMap) -> ServerResult<Self> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Ok(Credentials::Anonymous);
        };
        let value = value
            .to_str()
            .map_err(|_| ServerError::Unauthorized("malformed Authorization header".into()))?;
        match value.strip_prefix("Bearer ").map(str::trim) {
            Some(token) if !token.is_empty() => Ok(Credentials::Bearer(token.to_string())),
            _ => Err(ServerError::Unauthorized(
                "expected `Authorization: Bearer <token>`".into(),
            )),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Bearer(token) => {
                let prefix: String = token.chars().take(8).collect();
                write!(f, "Bearer({prefix}…)")
            }
            Credentials::Anonymous => f.write_str("Anonymous"),
        }
    }
}

/// Turns credentials into the requester core operations run for.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Requester>;
}

/// Bearer tokens are session tokens issued by `POST /sessions`.
pub struct SessionAuth {
    fab: Arc<Fab>,
}

impl SessionAuth {
    pub fn new(fab: Arc<Fab>) -> Self {
        Self { fab }
    }
}

#[async_trait]
impl AuthProvider for SessionAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Requester> {
        let token = match credentials {
            Credentials::Anonymous => return Ok(Requester::Anonymous),
            Credentials::Bearer(token) => token.clone(),
        };
        let fab = Arc::clone(&self.fab);
        let result = tokio::task::spawn_blocking(move || fab.authenticate(&token))
            .await
            .map_err(|e| ServerError::Internal(format!("auth task failed: {e}")))?;
        match result {
            Ok(requester) => Ok(requester),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ServerError::Unauthorized("invalid or expired session".into()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Extractor yielding the authenticated requester, anonymous if the request
/// carried no credentials.
#[derive(Clone, Debug)]
pub struct Authenticated(pub Requester);

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let credentials = Credentials::from_headers(&parts.headers)?;
        let requester = state.auth.authenticate(&credentials).await?;
        Ok(Authenticated(requester))
    }
}
