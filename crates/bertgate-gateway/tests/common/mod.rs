// Shared fixtures for gateway integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::extract::State;
use axum::http::{Request, StatusCode, header::CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use bertgate_core::{EncodedRow, Encoder, LabelMap, TokenizedBatch};
use bertgate_gateway::{AppState, build_app};
use bertgate_serving::InferenceClient;
use serde_json::{Value, json};
use tower::ServiceExt;

/// What the mock inference service answers.
#[derive(Clone)]
pub enum Reply {
    /// The same status and raw body for every call.
    Fixed(StatusCode, String),
    /// One copy of this prediction per submitted instance.
    PerInstance(Value),
    /// Replies taken in call order; the last one repeats.
    Sequence(Vec<Reply>),
}

impl Reply {
    fn for_call(&self, call: usize) -> &Reply {
        match self {
            Reply::Sequence(replies) => match replies.get(call).or_else(|| replies.last()) {
                Some(reply) => reply.for_call(0),
                None => panic!("empty reply sequence"),
            },
            other => other,
        }
    }
}

#[derive(Clone)]
struct BackendState {
    reply: Reply,
    calls: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<Value>>>,
}

/// In-process stand-in for the model server, counting calls.
pub struct MockBackend {
    pub url: String,
    calls: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<Value>>>,
}

impl MockBackend {
    pub async fn start(reply: Reply) -> Self {
        let calls = Arc::new(AtomicUsize::new(0));
        let last_request = Arc::new(Mutex::new(None));
        let state = BackendState {
            reply,
            calls: calls.clone(),
            last_request: last_request.clone(),
        };

        let router = Router::new()
            .route("/predict", post(predict_handler))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            url: format!("http://{addr}/predict"),
            calls,
            last_request,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<Value> {
        self.last_request.lock().unwrap().clone()
    }

    pub fn client(&self) -> InferenceClient {
        InferenceClient::new(self.url.clone(), Duration::from_secs(5)).unwrap()
    }
}

async fn predict_handler(State(state): State<BackendState>, Json(body): Json<Value>) -> Response {
    let call = state.calls.fetch_add(1, Ordering::SeqCst);
    let instances = body["instances"].as_array().map(Vec::len).unwrap_or(0);
    *state.last_request.lock().unwrap() = Some(body);

    match state.reply.for_call(call) {
        Reply::Fixed(status, text) => (*status, text.clone()).into_response(),
        Reply::PerInstance(pred) => {
            Json(json!({ "predictions": vec![pred.clone(); instances] })).into_response()
        }
        Reply::Sequence(_) => unreachable!("sequences are resolved per call"),
    }
}

/// Deterministic encoder: `[CLS] <char count> [SEP]` per text.
pub struct FakeEncoder;

impl Encoder for FakeEncoder {
    fn encode(&self, texts: &[&str]) -> anyhow::Result<TokenizedBatch> {
        let rows = texts
            .iter()
            .map(|t| EncodedRow {
                input_ids: vec![101, t.chars().count() as i64, 102],
                attention_mask: vec![1, 1, 1],
                token_type_ids: vec![0, 0, 0],
            })
            .collect();
        Ok(TokenizedBatch::new(rows)?)
    }
}

/// Encoder that always fails, to exercise the opaque 500 path.
pub struct BrokenEncoder;

impl Encoder for BrokenEncoder {
    fn encode(&self, _texts: &[&str]) -> anyhow::Result<TokenizedBatch> {
        anyhow::bail!("tokenizer exploded at /secret/path")
    }
}

/// Five-label sentiment map used across tests.
pub fn labels() -> LabelMap {
    LabelMap::from_pairs([
        (0, "差评"),
        (1, "好评"),
        (2, "中评"),
        (3, "物流"),
        (4, "售后"),
    ])
    .unwrap()
}

pub fn ready_app(backend: &MockBackend) -> Router {
    build_app(AppState::ready(Arc::new(FakeEncoder), labels(), backend.client()))
}

pub async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}
