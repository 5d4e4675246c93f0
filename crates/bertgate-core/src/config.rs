//! Resolved gateway configuration shared by the server and the CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default TensorFlow Serving predict endpoint, resolvable by service name
/// inside a compose network.
pub const DEFAULT_INFERENCE_URL: &str =
    "http://inference-service:8501/v1/models/bert-chinese:predict";
pub const DEFAULT_TOKENIZER_DIR: &str = "saved_model/bert-chinese";
pub const LABEL_MAP_FILE: &str = "label2id.txt";
pub const DEFAULT_MAX_LENGTH: usize = 128;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub inference_url: String,
    pub tokenizer_dir: PathBuf,
    pub label_map: PathBuf,
    /// Maximum tokens per row, including special tokens.
    pub max_length: usize,
    /// Upper bound on a single backend call.
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let tokenizer_dir = PathBuf::from(DEFAULT_TOKENIZER_DIR);
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            inference_url: DEFAULT_INFERENCE_URL.to_string(),
            label_map: default_label_map(&tokenizer_dir),
            tokenizer_dir,
            max_length: DEFAULT_MAX_LENGTH,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// `label2id.txt` inside the tokenizer directory.
pub fn default_label_map(tokenizer_dir: &Path) -> PathBuf {
    tokenizer_dir.join(LABEL_MAP_FILE)
}
