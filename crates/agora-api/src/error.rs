use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use agora_notify::NotifyError;

use crate::lang;

/// Error raised by an action. Every variant renders as a localized JSON error.
#[derive(Debug, Error)]
pub enum ActionError {
    /// User-facing error identified by its language key.
    #[error("{key}")]
    Fatal { key: &'static str, status: StatusCode },

    /// Form validation failed; carries every failing key.
    #[error("validation failed: {}", .0.join(", "))]
    Validation(Vec<&'static str>),

    /// Storage or runtime failure. Logged, never shown to the client.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ActionError {
    pub fn fatal(key: &'static str, status: StatusCode) -> Self {
        Self::Fatal { key, status }
    }

    pub fn bad_request(key: &'static str) -> Self {
        Self::fatal(key, StatusCode::BAD_REQUEST)
    }

    pub fn unauthorized(key: &'static str) -> Self {
        Self::fatal(key, StatusCode::UNAUTHORIZED)
    }

    pub fn forbidden(key: &'static str) -> Self {
        Self::fatal(key, StatusCode::FORBIDDEN)
    }

    pub fn not_found(key: &'static str) -> Self {
        Self::fatal(key, StatusCode::NOT_FOUND)
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Fatal { key, .. } => key,
            Self::Validation(_) => "validation_failed",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Fatal { status, .. } => *status,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<NotifyError> for ActionError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::InvalidMode(_) => Self::bad_request("invalid_mode"),
        }
    }
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(e) => error!("Internal error: {:#}", e),
            other => debug!("Action failed: {}", other),
        }

        let details: Vec<_> = match &self {
            Self::Validation(keys) => keys
                .iter()
                .map(|k| json!({ "error": k, "message": lang::txt(k) }))
                .collect(),
            _ => vec![],
        };

        let key = self.key();
        let body = json!({
            "error": key,
            "message": lang::txt(key),
            "errors": details,
        });
        (self.status(), Json(body)).into_response()
    }
}
