//! Endpoint handlers.
//!
//! Both prediction endpoints check availability first, then validate the
//! body, then run tokenize → inference → post-process. Validation failures
//! never reach the backend.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bertgate_core::{PredictionRecord, postprocess_batch};
use bertgate_serving::InferenceClient;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use crate::error::GatewayError;
use crate::state::{AppState, Readiness, Resources};

const TEXT_BODY_MSG: &str = "request body must be JSON with a 'text' field";
const TEXT_VALUE_MSG: &str = "'text' must be a non-empty string";
const TEXTS_BODY_MSG: &str = "request body must be JSON with a 'texts' field holding a list of strings";
const TEXTS_VALUE_MSG: &str = "'texts' must be a non-empty list of non-empty strings";

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub results: Vec<PredictionRecord>,
}

/// `POST /predict` with `{"text": "..."}`.
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionRecord>, GatewayError> {
    let resources = state.resources()?;
    let text = parse_text(body)?;

    let records = classify(resources, &state.client, std::slice::from_ref(&text)).await?;
    let record = records
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::Internal(anyhow::anyhow!("no prediction for single text")))?;
    Ok(Json(record))
}

/// `POST /predict_batch` with `{"texts": ["...", ...]}`.
pub async fn predict_batch(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchResponse>, GatewayError> {
    let resources = state.resources()?;
    let texts = parse_texts(body)?;

    let results = classify(resources, &state.client, &texts).await?;
    Ok(Json(BatchResponse { results }))
}

/// `GET /health`: liveness only.
pub async fn health() -> Response {
    (StatusCode::OK, "OK").into_response()
}

/// `GET /ready`: whether tokenizer and label map loaded.
pub async fn ready(State(state): State<AppState>) -> Response {
    match state.readiness.as_ref() {
        Readiness::Ready(res) => (
            StatusCode::OK,
            Json(json!({ "status": "ready", "labels": res.labels.len() })),
        )
            .into_response(),
        Readiness::Unavailable(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "error": reason })),
        )
            .into_response(),
    }
}

/// Tokenize, call the backend once for all texts, and label the results.
/// All-or-nothing: any failing item fails the whole call.
async fn classify(
    resources: &Resources,
    client: &InferenceClient,
    texts: &[String],
) -> Result<Vec<PredictionRecord>, GatewayError> {
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let batch = resources.encoder.encode(&refs).map_err(GatewayError::Internal)?;

    let response = client.predict(&batch).await?;
    let records = postprocess_batch(texts, &response.predictions, &resources.labels)?;

    info!(count = records.len(), seq_len = batch.seq_len(), "classified");
    Ok(records)
}

fn body_object(body: Result<Json<Value>, JsonRejection>, msg: &str) -> Result<Value, GatewayError> {
    match body {
        Ok(Json(value @ Value::Object(_))) => Ok(value),
        _ => Err(GatewayError::bad_request(msg)),
    }
}

fn is_usable_text(s: &str) -> bool {
    !s.trim().is_empty()
}

fn parse_text(body: Result<Json<Value>, JsonRejection>) -> Result<String, GatewayError> {
    let mut value = body_object(body, TEXT_BODY_MSG)?;
    match value.get_mut("text").map(Value::take) {
        None => Err(GatewayError::bad_request(TEXT_BODY_MSG)),
        Some(Value::String(s)) if is_usable_text(&s) => Ok(s),
        Some(_) => Err(GatewayError::bad_request(TEXT_VALUE_MSG)),
    }
}

fn parse_texts(body: Result<Json<Value>, JsonRejection>) -> Result<Vec<String>, GatewayError> {
    let mut value = body_object(body, TEXTS_BODY_MSG)?;
    let items = match value.get_mut("texts").map(Value::take) {
        None => return Err(GatewayError::bad_request(TEXTS_BODY_MSG)),
        Some(Value::Array(items)) if !items.is_empty() => items,
        Some(_) => return Err(GatewayError::bad_request(TEXTS_VALUE_MSG)),
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) if is_usable_text(&s) => Ok(s),
            _ => Err(GatewayError::bad_request(TEXTS_VALUE_MSG)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(v: Value) -> Result<Json<Value>, JsonRejection> {
        Ok(Json(v))
    }

    #[test]
    fn text_is_returned_untrimmed() {
        assert_eq!(parse_text(body(json!({"text": " 好评 "}))).unwrap(), " 好评 ");
    }

    #[test]
    fn text_validation() {
        for bad in [
            json!({}),
            json!([]),
            json!("text"),
            json!({"text": ""}),
            json!({"text": "   "}),
            json!({"text": 3}),
            json!({"text": null}),
            json!({"text": ["a"]}),
        ] {
            assert!(
                matches!(parse_text(body(bad.clone())), Err(GatewayError::BadRequest(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn missing_text_field_message() {
        let err = parse_text(body(json!({"txt": "a"}))).unwrap_err();
        assert_eq!(err.to_string(), TEXT_BODY_MSG);
        let err = parse_text(body(json!({"text": 1}))).unwrap_err();
        assert_eq!(err.to_string(), TEXT_VALUE_MSG);
    }

    #[test]
    fn texts_validation() {
        assert_eq!(
            parse_texts(body(json!({"texts": ["好评", "差评"]}))).unwrap(),
            vec!["好评", "差评"]
        );
        for bad in [
            json!({}),
            json!({"texts": []}),
            json!({"texts": "好评"}),
            json!({"texts": ["ok", ""]}),
            json!({"texts": ["ok", " \t"]}),
            json!({"texts": ["ok", 1]}),
            json!({"texts": [null]}),
        ] {
            assert!(
                matches!(parse_texts(body(bad.clone())), Err(GatewayError::BadRequest(_))),
                "{bad} should be rejected"
            );
        }
    }
}
