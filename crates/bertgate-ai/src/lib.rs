//! Tokenization layer: turns raw text into BERT model inputs.

#[cfg(feature = "hf")]
mod tokenizer;
#[cfg(feature = "hf")]
pub use tokenizer::TextTokenizer;
