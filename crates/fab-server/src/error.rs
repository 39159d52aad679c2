use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fab_sdk::{ErrorKind, SdkError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication failed: {0}")]
    Unauthorized(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Sdk(#[from] SdkError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServerError::Unauthorized(_) => ErrorKind::AuthFailed,
            ServerError::BadRequest(_) => ErrorKind::InvalidInput,
            ServerError::Sdk(e) => e.kind(),
            ServerError::Config(_) | ServerError::Io(_) | ServerError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// HTTP status for each failure category.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AuthFailed => StatusCode::UNAUTHORIZED,
        ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = if kind == ErrorKind::Internal {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            tracing::debug!(error = %self, kind = %kind, "request rejected");
            self.to_string()
        };
        let body = Json(json!({ "error": kind.as_str(), "message": message }));
        (status_for(kind), body).into_response()
    }
}
