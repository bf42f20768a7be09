use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Rejections produced before the pipeline is ever invoked.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match self {
            WebhookError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
        };
        let body = json!({
            "status": "error",
            "error": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Pipeline stage failures. Each variant carries the toolchain output that
/// explains it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeployError {
    #[error("clone failed: {0}")]
    Clone(String),
    #[error("build failed: {0}")]
    Build(String),
    #[error("tag failed: {0}")]
    Tag(String),
    #[error("push failed: {0}")]
    Push(String),
}
