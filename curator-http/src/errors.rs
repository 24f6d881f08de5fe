//! API error responses.
//!
//! Every failure is rendered as
//! `{"success": false, "error": msg, "errorDetails": {"errorCode", "errorMessage", "retryable"}}`
//! with the status taken from [`ErrorKind`].

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use curator_core::{CuratorError, ErrorKind};

#[derive(Debug)]
pub enum ApiError {
    /// Malformed request body or query string.
    BadRequest(String),
    Curator(CuratorError),
}

impl From<CuratorError> for ApiError {
    fn from(err: CuratorError) -> Self {
        Self::Curator(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(msg) => write!(f, "Bad Request: {msg}"),
            Self::Curator(err) => write!(f, "{err}"),
        }
    }
}

pub(crate) fn status_for(kind: ErrorKind) -> (StatusCode, &'static str) {
    match kind {
        ErrorKind::Validation => (StatusCode::BAD_REQUEST, "ERR_VALIDATION"),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "ERR_NOT_FOUND"),
        ErrorKind::Io => (StatusCode::INTERNAL_SERVER_ERROR, "ERR_IO"),
        ErrorKind::VersionControl => (StatusCode::INTERNAL_SERVER_ERROR, "ERR_VERSION_CONTROL"),
        ErrorKind::Job => (StatusCode::INTERNAL_SERVER_ERROR, "ERR_JOB"),
        ErrorKind::Timeout => (StatusCode::GATEWAY_TIMEOUT, "ERR_TIMEOUT"),
        ErrorKind::Conflict => (StatusCode::CONFLICT, "ERR_CONFLICT"),
        ErrorKind::Local => (StatusCode::INTERNAL_SERVER_ERROR, "ERR_INTERNAL"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, retryable) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "ERR_VALIDATION", msg.clone(), false),
            Self::Curator(err) => {
                let (status, code) = status_for(err.kind());
                (status, code, err.to_string(), err.is_retryable())
            }
        };

        if status.is_server_error() {
            error!(status = %status, code, error = %message, "Request failed");
        } else {
            warn!(status = %status, code, error = %message, "Request rejected");
        }

        let mut details = json!({
            "errorCode": code,
            "errorMessage": message,
            "retryable": retryable,
        });
        // A partial publish is reported with the files it left uncommitted.
        if let Self::Curator(CuratorError::UncommittedPublish { paths, .. }) = &self {
            details["uncommittedPaths"] = json!(paths);
        }

        let body = Json(json!({
            "success": false,
            "error": message,
            "errorDetails": details,
        }));
        (status, body).into_response()
    }
}
