//! BERT tokenizer adapter.
//!
//! Loads a pretrained tokenizer from a model directory and encodes texts into
//! a [`TokenizedBatch`]: rows padded to the longest row in the batch,
//! truncated to `max_length`, with attention mask and segment ids.
//!
//! The directory must contain either `tokenizer.json` (preferred) or a BERT
//! `vocab.txt`, as written by `save_pretrained` for slow tokenizers.

use std::path::Path;

use anyhow::anyhow;
use bertgate_core::{EncodedRow, Encoder, TokenizedBatch};
use tokenizers::decoders::DecoderWrapper;
use tokenizers::models::ModelWrapper;
use tokenizers::models::wordpiece::WordPiece;
use tokenizers::normalizers::{BertNormalizer, NormalizerWrapper};
use tokenizers::pre_tokenizers::PreTokenizerWrapper;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::processors::PostProcessorWrapper;
use tokenizers::processors::bert::BertProcessing;
use tokenizers::{Model, PaddingParams, Tokenizer, TokenizerBuilder, TruncationParams};
use tracing::info;

const PAD_TOKEN: &str = "[PAD]";
const UNK_TOKEN: &str = "[UNK]";
const CLS_TOKEN: &str = "[CLS]";
const SEP_TOKEN: &str = "[SEP]";

/// Pretrained subword tokenizer configured for fixed-shape classifier input.
///
/// Read-only after construction; share it behind an `Arc`.
pub struct TextTokenizer {
    tokenizer: Tokenizer,
    max_length: usize,
}

impl TextTokenizer {
    /// Load from a directory containing `tokenizer.json` or `vocab.txt`.
    pub fn load(dir: &Path, max_length: usize) -> anyhow::Result<Self> {
        let json_path = dir.join("tokenizer.json");
        let vocab_path = dir.join("vocab.txt");

        let tokenizer = if json_path.exists() {
            Tokenizer::from_file(&json_path).map_err(|e| anyhow!("load tokenizer: {e}"))?
        } else if vocab_path.exists() {
            bert_wordpiece(&vocab_path)?
        } else {
            anyhow::bail!("neither tokenizer.json nor vocab.txt found in {dir:?}");
        };

        let this = Self::from_tokenizer(tokenizer, max_length)?;
        info!(dir = %dir.display(), max_length, "loaded tokenizer");
        Ok(this)
    }

    /// Wrap an already-built tokenizer, overriding its truncation and padding.
    pub fn from_tokenizer(mut tokenizer: Tokenizer, max_length: usize) -> anyhow::Result<Self> {
        anyhow::ensure!(max_length > 0, "max_length must be positive");

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("set truncation: {e}"))?;

        let pad_id = tokenizer.token_to_id(PAD_TOKEN).unwrap_or(0);

        // Pad every row to the longest row in the batch.
        tokenizer.with_padding(Some(PaddingParams {
            pad_id,
            pad_token: PAD_TOKEN.to_string(),
            ..Default::default()
        }));

        Ok(Self {
            tokenizer,
            max_length,
        })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Encode a batch of texts. An empty slice yields an empty batch.
    pub fn encode_batch(&self, texts: &[&str]) -> anyhow::Result<TokenizedBatch> {
        if texts.is_empty() {
            return Ok(TokenizedBatch::default());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow!("tokenize: {e}"))?;

        // Truncation and padding are already applied by the tokenizer.
        let rows = encodings
            .iter()
            .map(|encoding| EncodedRow {
                input_ids: widen(encoding.get_ids()),
                attention_mask: widen(encoding.get_attention_mask()),
                token_type_ids: widen(encoding.get_type_ids()),
            })
            .collect();

        Ok(TokenizedBatch::new(rows)?)
    }
}

impl Encoder for TextTokenizer {
    fn encode(&self, texts: &[&str]) -> anyhow::Result<TokenizedBatch> {
        self.encode_batch(texts)
    }
}

fn widen(values: &[u32]) -> Vec<i64> {
    values.iter().map(|&v| i64::from(v)).collect()
}

/// Build a BERT WordPiece tokenizer from a bare `vocab.txt`.
fn bert_wordpiece(vocab_path: &Path) -> anyhow::Result<Tokenizer> {
    let vocab = vocab_path
        .to_str()
        .ok_or_else(|| anyhow!("vocab path is not valid UTF-8: {vocab_path:?}"))?;

    let model = WordPiece::from_file(vocab)
        .unk_token(UNK_TOKEN.to_string())
        .build()
        .map_err(|e| anyhow!("load vocab: {e}"))?;

    let cls = special_id(&model, CLS_TOKEN)?;
    let sep = special_id(&model, SEP_TOKEN)?;

    let tokenizer = TokenizerBuilder::<
        ModelWrapper,
        NormalizerWrapper,
        PreTokenizerWrapper,
        PostProcessorWrapper,
        DecoderWrapper,
    >::new()
    .with_model(model.into())
    .with_normalizer(Some(BertNormalizer::default().into()))
    .with_pre_tokenizer(Some(BertPreTokenizer.into()))
    .with_post_processor(Some(
        BertProcessing::new((SEP_TOKEN.to_string(), sep), (CLS_TOKEN.to_string(), cls)).into(),
    ))
    .build()
    .map_err(|e| anyhow!("build tokenizer: {e}"))?;

    Ok(Tokenizer::from(tokenizer))
}

fn special_id(model: &WordPiece, token: &str) -> anyhow::Result<u32> {
    model
        .token_to_id(token)
        .ok_or_else(|| anyhow!("vocab.txt has no {token} token"))
}
