//! Tokenized model inputs and the encoder seam used by the gateway.
//!
//! A [`TokenizedBatch`] is the fixed-shape tensor set a BERT-style classifier
//! consumes: one row per input text, every row padded to the same length.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BatchError {
    #[error(
        "row {row}: input_ids has {ids} tokens, attention_mask {mask}, token_type_ids {types}"
    )]
    RaggedRow {
        row: usize,
        ids: usize,
        mask: usize,
        types: usize,
    },
    #[error("row {row} has length {len}, expected {expected}")]
    UnevenRows {
        row: usize,
        len: usize,
        expected: usize,
    },
}

/// Token ids, attention mask and segment ids for a single text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRow {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub token_type_ids: Vec<i64>,
}

impl EncodedRow {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// A batch of encoded rows sharing one sequence length.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenizedBatch {
    rows: Vec<EncodedRow>,
}

impl TokenizedBatch {
    /// Build a batch, checking that every row is internally consistent and
    /// that all rows share the same length.
    pub fn new(rows: Vec<EncodedRow>) -> Result<Self, BatchError> {
        let expected = rows.first().map(EncodedRow::len).unwrap_or(0);

        for (row, r) in rows.iter().enumerate() {
            if r.attention_mask.len() != r.len() || r.token_type_ids.len() != r.len() {
                return Err(BatchError::RaggedRow {
                    row,
                    ids: r.len(),
                    mask: r.attention_mask.len(),
                    types: r.token_type_ids.len(),
                });
            }
            if r.len() != expected {
                return Err(BatchError::UnevenRows {
                    row,
                    len: r.len(),
                    expected,
                });
            }
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[EncodedRow] {
        &self.rows
    }

    /// Number of rows (one per input text).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Shared sequence length of every row, 0 for an empty batch.
    pub fn seq_len(&self) -> usize {
        self.rows.first().map(EncodedRow::len).unwrap_or(0)
    }
}

/// Converts raw texts into a [`TokenizedBatch`].
///
/// Callers validate texts before encoding: every text must be non-empty after
/// trimming. Implementations are loaded once and shared read-only between
/// request handlers.
pub trait Encoder: Send + Sync {
    fn encode(&self, texts: &[&str]) -> anyhow::Result<TokenizedBatch>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ids: &[i64], mask: &[i64], types: &[i64]) -> EncodedRow {
        EncodedRow {
            input_ids: ids.to_vec(),
            attention_mask: mask.to_vec(),
            token_type_ids: types.to_vec(),
        }
    }

    #[test]
    fn accepts_uniform_rows() {
        let batch = TokenizedBatch::new(vec![
            row(&[101, 8, 102], &[1, 1, 1], &[0, 0, 0]),
            row(&[101, 102, 0], &[1, 1, 0], &[0, 0, 0]),
        ])
        .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.seq_len(), 3);
    }

    #[test]
    fn rejects_ragged_row() {
        let err = TokenizedBatch::new(vec![row(&[101, 102], &[1], &[0, 0])]).unwrap_err();
        assert_eq!(
            err,
            BatchError::RaggedRow {
                row: 0,
                ids: 2,
                mask: 1,
                types: 2
            }
        );
    }

    #[test]
    fn rejects_uneven_rows() {
        let err = TokenizedBatch::new(vec![
            row(&[101, 102], &[1, 1], &[0, 0]),
            row(&[101, 7, 102], &[1, 1, 1], &[0, 0, 0]),
        ])
        .unwrap_err();
        assert!(matches!(err, BatchError::UnevenRows { row: 1, len: 3, expected: 2 }));
    }

    #[test]
    fn empty_batch() {
        let batch = TokenizedBatch::new(vec![]).unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.seq_len(), 0);
    }
}
