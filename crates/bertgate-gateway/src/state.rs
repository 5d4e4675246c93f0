//! Process-wide gateway state, built once before serving.

use std::sync::Arc;

use bertgate_ai::TextTokenizer;
use bertgate_core::{Encoder, GatewayConfig, LabelMap};
use bertgate_serving::InferenceClient;
use tracing::{error, info};

use crate::error::GatewayError;

/// Read-only startup resources shared by every request.
#[derive(Clone)]
pub struct Resources {
    pub encoder: Arc<dyn Encoder>,
    pub labels: Arc<LabelMap>,
}

/// Whether the startup resources loaded. An unavailable gateway keeps
/// serving and answers prediction requests with 503.
pub enum Readiness {
    Ready(Resources),
    Unavailable(String),
}

#[derive(Clone)]
pub struct AppState {
    pub readiness: Arc<Readiness>,
    pub client: InferenceClient,
}

impl AppState {
    pub fn new(readiness: Readiness, client: InferenceClient) -> Self {
        Self {
            readiness: Arc::new(readiness),
            client,
        }
    }

    pub fn ready(encoder: Arc<dyn Encoder>, labels: LabelMap, client: InferenceClient) -> Self {
        Self::new(
            Readiness::Ready(Resources {
                encoder,
                labels: Arc::new(labels),
            }),
            client,
        )
    }

    pub fn resources(&self) -> Result<&Resources, GatewayError> {
        match self.readiness.as_ref() {
            Readiness::Ready(res) => Ok(res),
            Readiness::Unavailable(_) => Err(GatewayError::Unavailable),
        }
    }
}

/// Load the tokenizer and label map. Any failure is logged and yields
/// [`Readiness::Unavailable`]; nothing is partially loaded.
pub fn load_resources(config: &GatewayConfig) -> Readiness {
    let tokenizer = match TextTokenizer::load(&config.tokenizer_dir, config.max_length) {
        Ok(t) => t,
        Err(e) => {
            error!(dir = %config.tokenizer_dir.display(), error = %format!("{e:#}"), "failed to load tokenizer");
            return Readiness::Unavailable(format!("tokenizer: {e:#}"));
        }
    };

    let labels = match LabelMap::load(&config.label_map) {
        Ok(l) => l,
        Err(e) => {
            error!(path = %config.label_map.display(), error = %e, "failed to load label map");
            return Readiness::Unavailable(format!("label map: {e}"));
        }
    };

    info!(labels = labels.len(), "gateway resources loaded");
    Readiness::Ready(Resources {
        encoder: Arc::new(tokenizer),
        labels: Arc::new(labels),
    })
}
