use thiserror::Error;

use crate::storage::Backend;

/// Failure of a single persistence target during a fan-out write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFailure {
    pub backend: Backend,
    pub detail: String,
}

impl std::fmt::Display for TargetFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.backend, self.detail)
    }
}

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Invalid transportation type: {0}")]
    InvalidCategory(String),

    #[error("No {artifact} found in any checked backend")]
    NotFound { artifact: String },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Duplicate key '{key}' in column {column}")]
    DuplicateKey { column: String, key: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("{backend} backend unavailable: {detail}")]
    BackendUnavailable { backend: Backend, detail: String },

    #[error("Write failed for {} target(s): {}", .0.len(), join_failures(.0))]
    PartialWriteFailure(Vec<TargetFailure>),

    #[error("Invalid row count: {0} (must be at least 1)")]
    InvalidRowCount(usize),

    #[error("{artifact} already exists in {backend} and overwrite is not enabled")]
    OverwriteRefused { artifact: String, backend: Backend },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn join_failures(failures: &[TargetFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, DataError>;
