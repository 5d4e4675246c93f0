mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bertgate_gateway::{AppState, build_app};
use common::{BrokenEncoder, MockBackend, Reply, labels, post_json, ready_app, send};
use serde_json::json;

#[tokio::test]
async fn predict_returns_labelled_record() {
    let backend = MockBackend::start(Reply::PerInstance(json!({
        "class_id": 1,
        "probabilities": [0.05, 0.9, 0.02, 0.02, 0.01]
    })))
    .await;

    let (status, body) = post_json(ready_app(&backend), "/predict", r#"{"text": "这手机拍照真好看"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["input_text"], "这手机拍照真好看");
    assert_eq!(body["predicted_label"], "好评");
    assert_eq!(body["class_id"], 1);
    assert_eq!(body["confidence"], 0.9);
    assert_eq!(backend.calls(), 1);

    // One instance with the encoder's output.
    let sent = backend.last_request().unwrap();
    assert_eq!(sent["instances"].as_array().unwrap().len(), 1);
    assert_eq!(sent["instances"][0]["input_ids"], json!([101, 8, 102]));
    assert_eq!(sent["instances"][0]["attention_mask"], json!([1, 1, 1]));
    assert_eq!(sent["instances"][0]["token_type_ids"], json!([0, 0, 0]));
}

#[tokio::test]
async fn predict_class_and_confidence_are_in_domain() {
    let backend = MockBackend::start(Reply::PerInstance(json!({
        "probabilities": [0.1, 0.2, 0.6, 0.05, 0.05]
    })))
    .await;

    for text in ["好", "电池太不耐用了", "a b c", "  padded  "] {
        let (status, body) =
            post_json(ready_app(&backend), "/predict", &json!({ "text": text }).to_string()).await;
        assert_eq!(status, StatusCode::OK);

        let class_id = body["class_id"].as_i64().unwrap();
        let label = body["predicted_label"].as_str().unwrap();
        assert!(labels().get(class_id).is_some() || label == bertgate_core::UNKNOWN_LABEL);
        let confidence = body["confidence"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&confidence));
        assert_eq!(class_id, 2);
    }
}

#[tokio::test]
async fn argmax_tie_resolves_to_lowest_index() {
    let backend = MockBackend::start(Reply::PerInstance(json!({"probabilities": [0.5, 0.5]}))).await;

    let (status, body) = post_json(ready_app(&backend), "/predict", r#"{"text": "一般"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["class_id"], 0);
    assert_eq!(body["predicted_label"], "差评");
    assert_eq!(body["confidence"], 0.5);
}

#[tokio::test]
async fn unknown_class_id_gets_sentinel_label() {
    let mut probabilities = vec![0.0; 1000];
    probabilities[999] = 0.7;
    let backend = MockBackend::start(Reply::PerInstance(json!({
        "class_id": 999,
        "probabilities": probabilities
    })))
    .await;

    let (status, body) = post_json(ready_app(&backend), "/predict", r#"{"text": "?"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["class_id"], 999);
    assert_eq!(body["predicted_label"], "unknown");
}

#[tokio::test]
async fn class_id_beyond_probabilities_is_opaque_500() {
    let backend = MockBackend::start(Reply::PerInstance(json!({
        "class_id": 999,
        "probabilities": [0.5, 0.5]
    })))
    .await;

    let (status, body) = post_json(ready_app(&backend), "/predict", r#"{"text": "?"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal server error");
}

#[tokio::test]
async fn invalid_bodies_never_reach_backend() {
    let backend = MockBackend::start(Reply::PerInstance(json!({"probabilities": [1.0]}))).await;

    for raw in [
        "",
        "not json",
        "{}",
        "[]",
        r#"{"txt": "a"}"#,
        r#"{"text": ""}"#,
        r#"{"text": "   "}"#,
        r#"{"text": 42}"#,
        r#"{"text": null}"#,
        r#"{"text": ["a"]}"#,
    ] {
        let (status, body) = post_json(ready_app(&backend), "/predict", raw).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {raw:?}");
        assert!(body["error"].is_string());
    }

    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn missing_content_type_is_bad_request() {
    let backend = MockBackend::start(Reply::PerInstance(json!({"probabilities": [1.0]}))).await;
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .body(Body::from(r#"{"text": "好"}"#))
        .unwrap();

    let (status, _) = send(ready_app(&backend), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn backend_error_surfaces_raw_text() {
    let backend = MockBackend::start(Reply::Fixed(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Servable not found for request".into(),
    ))
    .await;

    let (status, body) = post_json(ready_app(&backend), "/predict", r#"{"text": "好评"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let msg = body["error"].as_str().unwrap();
    assert!(msg.contains("Servable not found for request"), "got {msg}");
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn same_app_recovers_after_backend_error() {
    let backend = MockBackend::start(Reply::Sequence(vec![
        Reply::Fixed(StatusCode::INTERNAL_SERVER_ERROR, "model busy".into()),
        Reply::PerInstance(json!({"class_id": 0, "probabilities": [0.8, 0.2]})),
    ]))
    .await;
    let app = ready_app(&backend);

    let (status, body) = post_json(app.clone(), "/predict", r#"{"text": "差"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "inference service call failed: model busy");

    let (status, body) = post_json(app.clone(), "/predict", r#"{"text": "差"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predicted_label"], "差评");
    assert_eq!(body["confidence"], 0.8);

    let (status, body) = post_json(app, "/predict_batch", r#"{"texts": ["差", "差评"]}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert_eq!(backend.calls(), 3);
}

#[tokio::test]
async fn malformed_backend_response_is_opaque_500() {
    let backend = MockBackend::start(Reply::Fixed(StatusCode::OK, r#"{"outputs": 1}"#.into())).await;

    let (status, body) = post_json(ready_app(&backend), "/predict", r#"{"text": "好"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal server error");
}

#[tokio::test]
async fn unreachable_backend_is_500_with_transport_text() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = bertgate_serving::InferenceClient::new(
        format!("http://{addr}/predict"),
        std::time::Duration::from_secs(2),
    )
    .unwrap();
    let app = build_app(AppState::ready(Arc::new(common::FakeEncoder), labels(), client));

    let (status, body) = post_json(app, "/predict", r#"{"text": "好"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("inference service call failed:")
    );
}

#[tokio::test]
async fn encoder_failure_does_not_leak_details() {
    let backend = MockBackend::start(Reply::PerInstance(json!({"probabilities": [1.0]}))).await;
    let app = build_app(AppState::ready(Arc::new(BrokenEncoder), labels(), backend.client()));

    let (status, body) = post_json(app, "/predict", r#"{"text": "好"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal server error");
    assert!(!body.to_string().contains("/secret/path"));
    assert_eq!(backend.calls(), 0);
}
