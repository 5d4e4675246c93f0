//! JSON payloads exchanged with the model-serving backend.
//!
//! Follows the TensorFlow Serving REST "instances" row format: one object per
//! input row in the request, one prediction object per row in the response.

use serde::{Deserialize, Serialize};

use crate::batch::{EncodedRow, TokenizedBatch};

/// One encoded text as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceInstance {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub token_type_ids: Vec<i64>,
}

impl From<&EncodedRow> for InferenceInstance {
    fn from(row: &EncodedRow) -> Self {
        Self {
            input_ids: row.input_ids.clone(),
            attention_mask: row.attention_mask.clone(),
            token_type_ids: row.token_type_ids.clone(),
        }
    }
}

/// Request body for `POST <inference-url>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceRequest {
    /// Serving signature to invoke; omitted so the backend uses its default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_name: Option<String>,
    pub instances: Vec<InferenceInstance>,
}

impl InferenceRequest {
    pub fn from_batch(batch: &TokenizedBatch) -> Self {
        Self {
            signature_name: None,
            instances: batch.rows().iter().map(InferenceInstance::from).collect(),
        }
    }

    pub fn with_signature(mut self, name: impl Into<String>) -> Self {
        self.signature_name = Some(name.into());
        self
    }
}

/// A single raw prediction. `class_id` is only present when the exported
/// model emits it alongside the probability vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<i64>,
    pub probabilities: Vec<f64>,
}

/// Response body from the backend, order-aligned with the request instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub predictions: Vec<RawPrediction>,
}
