//! Classification gateway: `/predict` and `/predict_batch` in front of a
//! model-serving backend.

pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use error::GatewayError;
pub use server::{build_app, serve};
pub use state::{AppState, Readiness, Resources, load_resources};
