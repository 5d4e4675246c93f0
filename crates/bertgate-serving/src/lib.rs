//! Inference backend transport: serializes tokenized batches into
//! TensorFlow Serving REST requests and decodes the predictions.

#[cfg(feature = "http")]
pub mod client;

#[cfg(feature = "http")]
pub use client::{InferenceClient, InferenceError};
