//! Class-id ↔ label mapping loaded from the training run's `label2id.txt`.
//!
//! The file is tab-separated, one `label<TAB>id` pair per line. The map is
//! built once at startup and is immutable afterwards; a load error leaves no
//! partial map behind.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Label returned for class ids the map does not know.
pub const UNKNOWN_LABEL: &str = "unknown";

#[derive(Error, Debug)]
pub enum LabelMapError {
    #[error("cannot read label map {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: expected `label<TAB>id`, got {content:?}")]
    Malformed { line: usize, content: String },
    #[error("line {line}: invalid class id {value:?}")]
    InvalidId { line: usize, value: String },
    #[error("line {line}: duplicate class id {id}")]
    DuplicateId { line: usize, id: i64 },
    #[error("line {line}: duplicate label {label:?}")]
    DuplicateLabel { line: usize, label: String },
}

/// Immutable bidirectional mapping between class ids and label strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    id_to_label: BTreeMap<i64, String>,
    label_to_id: HashMap<String, i64>,
}

impl LabelMap {
    /// Load a label map from a `label<TAB>id` file.
    pub fn load(path: &Path) -> Result<Self, LabelMapError> {
        let contents = std::fs::read_to_string(path).map_err(|source| LabelMapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map = Self::parse(&contents)?;
        tracing::info!(path = %path.display(), labels = map.len(), "loaded label map");
        Ok(map)
    }

    /// Parse label map file contents. Blank lines are skipped; line numbers in
    /// errors are 1-based.
    pub fn parse(contents: &str) -> Result<Self, LabelMapError> {
        let mut map = Self::default();

        for (idx, raw) in contents.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }

            let mut fields = trimmed.split('\t');
            let (Some(label), Some(id), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(LabelMapError::Malformed {
                    line,
                    content: raw.to_string(),
                });
            };

            let label = label.trim();
            if label.is_empty() {
                return Err(LabelMapError::Malformed {
                    line,
                    content: raw.to_string(),
                });
            }

            let id: i64 = match id.trim().parse() {
                Ok(id) if id >= 0 => id,
                _ => {
                    return Err(LabelMapError::InvalidId {
                        line,
                        value: id.to_string(),
                    });
                }
            };

            map.insert(line, id, label)?;
        }

        Ok(map)
    }

    /// Build a map from `(id, label)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, LabelMapError>
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        let mut map = Self::default();
        for (i, (id, label)) in pairs.into_iter().enumerate() {
            map.insert(i + 1, id, label.into())?;
        }
        Ok(map)
    }

    fn insert(&mut self, line: usize, id: i64, label: impl Into<String>) -> Result<(), LabelMapError> {
        let label = label.into();
        if self.id_to_label.contains_key(&id) {
            return Err(LabelMapError::DuplicateId { line, id });
        }
        if self.label_to_id.contains_key(&label) {
            return Err(LabelMapError::DuplicateLabel { line, label });
        }
        self.label_to_id.insert(label.clone(), id);
        self.id_to_label.insert(id, label);
        Ok(())
    }

    /// Label for `id`, or [`UNKNOWN_LABEL`] when the id is not in the map.
    pub fn lookup(&self, id: i64) -> &str {
        self.get(id).unwrap_or(UNKNOWN_LABEL)
    }

    pub fn get(&self, id: i64) -> Option<&str> {
        self.id_to_label.get(&id).map(String::as_str)
    }

    /// Reverse lookup.
    pub fn id_of(&self, label: &str) -> Option<i64> {
        self.label_to_id.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.id_to_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_label.is_empty()
    }

    /// `(id, label)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.id_to_label.iter().map(|(id, l)| (*id, l.as_str()))
    }
}
