//! Turns raw backend predictions into labelled, user-facing records.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::labels::LabelMap;
use crate::wire::RawPrediction;

#[derive(Error, Debug, PartialEq)]
pub enum PostprocessError {
    #[error("class id {class_id} is out of range for {len} probabilities")]
    ClassIdOutOfRange { class_id: i64, len: usize },
    #[error("prediction has no probabilities")]
    EmptyProbabilities,
    #[error("{texts} texts but {predictions} predictions")]
    CountMismatch { texts: usize, predictions: usize },
}

/// Classification result for one input text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub input_text: String,
    pub predicted_label: String,
    pub confidence: f64,
    pub class_id: i64,
}

/// Index of the largest value; ties go to the lowest index.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Resolve the class id: the backend's explicit id if present, otherwise
/// the arg-max of the probability vector.
pub fn resolve_class_id(pred: &RawPrediction) -> Result<i64, PostprocessError> {
    match pred.class_id {
        Some(id) => Ok(id),
        None => argmax(&pred.probabilities)
            .map(|i| i as i64)
            .ok_or(PostprocessError::EmptyProbabilities),
    }
}

/// Build the record for one text from its raw prediction.
///
/// Unknown class ids resolve to the sentinel label; a class id that does not
/// index into `probabilities` fails the request.
pub fn postprocess(
    text: &str,
    pred: &RawPrediction,
    labels: &LabelMap,
) -> Result<PredictionRecord, PostprocessError> {
    let class_id = resolve_class_id(pred)?;
    let confidence = usize::try_from(class_id)
        .ok()
        .and_then(|i| pred.probabilities.get(i))
        .copied()
        .ok_or(PostprocessError::ClassIdOutOfRange {
            class_id,
            len: pred.probabilities.len(),
        })?;

    Ok(PredictionRecord {
        input_text: text.to_string(),
        predicted_label: labels.lookup(class_id).to_string(),
        confidence,
        class_id,
    })
}

/// Post-process a whole batch positionally. Any failing item fails the batch.
pub fn postprocess_batch<S: AsRef<str>>(
    texts: &[S],
    preds: &[RawPrediction],
    labels: &LabelMap,
) -> Result<Vec<PredictionRecord>, PostprocessError> {
    if texts.len() != preds.len() {
        return Err(PostprocessError::CountMismatch {
            texts: texts.len(),
            predictions: preds.len(),
        });
    }

    texts
        .iter()
        .zip(preds)
        .map(|(text, pred)| postprocess(text.as_ref(), pred, labels))
        .collect()
}
