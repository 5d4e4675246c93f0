mod bench;
mod predict;
mod report;

use std::path::PathBuf;
use std::time::Duration;

use bertgate_core::config::{
    DEFAULT_INFERENCE_URL, DEFAULT_MAX_LENGTH, DEFAULT_TIMEOUT_SECS, DEFAULT_TOKENIZER_DIR,
    default_label_map,
};
use bertgate_core::GatewayConfig;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bertgate", version, about = "BERT text-classification gateway")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway in front of the model server.
    Serve(ServeArgs),
    /// Tokenize locally and query the model server directly.
    Predict(predict::PredictArgs),
    /// Benchmark a running gateway.
    Bench(bench::BenchArgs),
}

/// Tokenizer and label map location, shared by `serve` and `predict`.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Directory with tokenizer.json or vocab.txt.
    #[arg(long, env = "BERTGATE_TOKENIZER_DIR", default_value = DEFAULT_TOKENIZER_DIR)]
    pub tokenizer_dir: PathBuf,

    /// Label map file [default: <tokenizer-dir>/label2id.txt].
    #[arg(long, env = "BERTGATE_LABEL_MAP")]
    pub label_map: Option<PathBuf>,

    /// Maximum tokens per text, including [CLS] and [SEP].
    #[arg(long, env = "BERTGATE_MAX_LENGTH", default_value_t = DEFAULT_MAX_LENGTH)]
    pub max_length: usize,
}

impl ModelArgs {
    pub fn label_map_path(&self) -> PathBuf {
        self.label_map
            .clone()
            .unwrap_or_else(|| default_label_map(&self.tokenizer_dir))
    }
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "BERTGATE_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "BERTGATE_PORT", default_value_t = 5001)]
    port: u16,

    /// Model server predict endpoint.
    #[arg(long, env = "TF_SERVING_URL", default_value = DEFAULT_INFERENCE_URL)]
    inference_url: String,

    #[command(flatten)]
    model: ModelArgs,

    /// Timeout for each call to the model server.
    #[arg(long, env = "BERTGATE_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
}

impl ServeArgs {
    fn into_config(self) -> GatewayConfig {
        GatewayConfig {
            host: self.host,
            port: self.port,
            inference_url: self.inference_url,
            label_map: self.model.label_map_path(),
            tokenizer_dir: self.model.tokenizer_dir,
            max_length: self.model.max_length,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            tracing::info!("bertgate v{}", env!("CARGO_PKG_VERSION"));
            bertgate_gateway::serve(args.into_config()).await
        }
        Command::Predict(args) => predict::run(args).await,
        Command::Bench(args) => bench::run(args).await,
    }
}
