pub mod batch;
pub mod config;
pub mod labels;
pub mod postprocess;
pub mod wire;

pub use batch::{BatchError, EncodedRow, Encoder, TokenizedBatch};
pub use config::GatewayConfig;
pub use labels::{LabelMap, LabelMapError, UNKNOWN_LABEL};
pub use postprocess::{PostprocessError, PredictionRecord, postprocess, postprocess_batch};
pub use wire::{InferenceInstance, InferenceRequest, InferenceResponse, RawPrediction};
