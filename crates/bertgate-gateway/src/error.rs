//! Request-scoped failures and their HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bertgate_core::PostprocessError;
use bertgate_serving::InferenceError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Tokenizer or label map failed to load at startup.
    #[error("tokenizer or label map failed to load; service unavailable")]
    Unavailable,
    #[error("{0}")]
    BadRequest(String),
    /// Non-success status or transport failure from the inference service.
    #[error("inference service call failed: {0}")]
    Backend(String),
    /// Anything else going wrong mid-request. The cause is logged, never
    /// returned to the client.
    #[error("internal server error")]
    Internal(anyhow::Error),
}

impl GatewayError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Backend(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<InferenceError> for GatewayError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::Server { body, .. } => Self::Backend(body),
            InferenceError::Http(e) => Self::Backend(e.to_string()),
            other => Self::Internal(other.into()),
        }
    }
}

impl From<PostprocessError> for GatewayError {
    fn from(err: PostprocessError) -> Self {
        Self::Internal(err.into())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(cause) => error!(error = %format!("{cause:#}"), "request processing failed"),
            Self::Backend(body) => error!(body = %body, "inference service call failed"),
            Self::Unavailable | Self::BadRequest(_) => {}
        }
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
