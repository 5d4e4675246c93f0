//! Direct model-server client: tokenizes locally, calls the predict endpoint,
//! prints labelled results. Useful for checking an exported model without the
//! gateway in between.

use std::fmt::Write as _;
use std::time::Duration;

use anyhow::Context;
use bertgate_ai::TextTokenizer;
use bertgate_core::{InferenceRequest, LabelMap, PredictionRecord, postprocess_batch};
use bertgate_serving::InferenceClient;
use clap::Args;
use tracing::info;

use crate::ModelArgs;

const LOCAL_INFERENCE_URL: &str = "http://localhost:8501/v1/models/bert-chinese:predict";
const SIGNATURE_NAME: &str = "serving_default";

const SAMPLE_TEXTS: &[&str] = &[
    "这手机拍照真好看，我很喜欢！",
    "电池太不耐用了，一天要充好几次电。",
    "手机屏幕显示效果还行，中规中矩。",
];

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Texts to classify [default: three sample reviews].
    pub texts: Vec<String>,

    /// Model server predict endpoint.
    #[arg(long, default_value = LOCAL_INFERENCE_URL)]
    pub url: String,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Timeout for the model-server call.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

pub async fn run(args: PredictArgs) -> anyhow::Result<()> {
    let dir = &args.model.tokenizer_dir;
    anyhow::ensure!(
        dir.is_dir(),
        "tokenizer directory {} does not exist; export the trained model first",
        dir.display()
    );

    let tokenizer =
        TextTokenizer::load(dir, args.model.max_length).context("loading tokenizer")?;
    let label_path = args.model.label_map_path();
    let labels = LabelMap::load(&label_path)
        .with_context(|| format!("loading label map {}", label_path.display()))?;

    let texts: Vec<String> = if args.texts.is_empty() {
        SAMPLE_TEXTS.iter().map(|s| s.to_string()).collect()
    } else {
        args.texts
    };
    if let Some(i) = texts.iter().position(|t| t.trim().is_empty()) {
        anyhow::bail!("text #{} is empty", i + 1);
    }

    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let batch = tokenizer.encode_batch(&refs)?;
    let request = InferenceRequest::from_batch(&batch).with_signature(SIGNATURE_NAME);

    let client = InferenceClient::new(args.url.clone(), Duration::from_secs(args.timeout_secs))?;
    info!(url = %args.url, count = texts.len(), "sending request to model server");
    let response = client
        .send(&request)
        .await
        .with_context(|| format!("request to {} failed; is the model server running?", args.url))?;

    let records = postprocess_batch(&texts, &response.predictions, &labels)
        .context("unexpected prediction format")?;
    print!("{}", format_predictions(&records));
    Ok(())
}

/// One block per record: text, label and confidence to four decimals.
pub fn format_predictions(records: &[PredictionRecord]) -> String {
    let rule = "-".repeat(30);
    let mut out = String::new();
    let _ = writeln!(out, "\nPredictions\n{}", "=".repeat(30));
    for rec in records {
        let _ = writeln!(out, "text: '{}'", rec.input_text);
        let _ = writeln!(
            out,
            "  -> {} (class {}, confidence {:.4})",
            rec.predicted_label, rec.class_id, rec.confidence
        );
        let _ = writeln!(out, "{rule}");
    }
    out
}
