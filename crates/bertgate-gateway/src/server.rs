//! Router assembly and the serve loop.

use axum::Router;
use axum::routing::{get, post};
use bertgate_core::GatewayConfig;
use bertgate_serving::InferenceClient;
use tokio::signal;
use tracing::info;

use crate::handlers;
use crate::state::{AppState, load_resources};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(handlers::predict))
        .route("/predict_batch", post(handlers::predict_batch))
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .with_state(state)
}

/// Load startup resources, then serve until Ctrl+C or SIGTERM.
///
/// A tokenizer or label-map failure does not abort startup: the gateway
/// comes up and answers prediction requests with 503.
pub async fn serve(config: GatewayConfig) -> anyhow::Result<()> {
    let readiness = load_resources(&config);
    let client = InferenceClient::new(config.inference_url.clone(), config.timeout)?;
    let app = build_app(AppState::new(readiness, client));

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(
        addr = %listener.local_addr()?,
        inference_url = %config.inference_url,
        timeout_secs = config.timeout.as_secs(),
        "gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received terminate signal, shutting down"),
    }
}
