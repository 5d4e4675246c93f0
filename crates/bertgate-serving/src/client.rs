//! HTTP client for the model-serving backend's predict endpoint.

use std::time::Duration;

use bertgate_core::{InferenceRequest, InferenceResponse, TokenizedBatch};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sent {expected} instances but received {got} predictions")]
    CountMismatch { expected: usize, got: usize },
}

impl InferenceError {
    /// True for failures reported by or on the way to the backend (bad
    /// status, connect error, timeout), as opposed to an unusable response.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Server { .. })
    }
}

/// Client for a TensorFlow Serving style `:predict` endpoint.
///
/// Never retries: every failure is reported to the caller as-is.
#[derive(Clone)]
pub struct InferenceClient {
    client: reqwest::Client,
    url: String,
}

impl InferenceClient {
    /// Create a client for the full predict URL, e.g.
    /// `http://localhost:8501/v1/models/bert-chinese:predict`.
    ///
    /// `timeout` bounds each call end to end.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one request carrying every row of `batch`.
    pub async fn predict(&self, batch: &TokenizedBatch) -> Result<InferenceResponse, InferenceError> {
        self.send(&InferenceRequest::from_batch(batch)).await
    }

    /// Send a prepared request. The response must hold exactly one prediction
    /// per instance.
    pub async fn send(&self, request: &InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        let expected = request.instances.len();

        debug!(url = %self.url, instances = expected, "calling inference service");
        let resp = self.client.post(&self.url).json(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("HTTP {status}: {e}"));
            return Err(InferenceError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let result: InferenceResponse = serde_json::from_str(&body)?;
        if result.predictions.len() != expected {
            return Err(InferenceError::CountMismatch {
                expected,
                got: result.predictions.len(),
            });
        }

        info!(predictions = result.predictions.len(), "inference complete");
        Ok(result)
    }
}
