//! Error types for question-bank operations.
//!
//! Uses [`thiserror`] for ergonomic error derivation. Every I/O or JSON error
//! carries the path it happened on, since the operator reads these messages
//! to decide which file to fix before rerunning a command.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Fatal error for question-bank operations.
#[derive(Debug, Error)]
pub enum BankError {
    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file is not valid JSON, or does not match the question-bank shape.
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serializing a document failed.
    #[error("failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A distribution plan cannot be applied.
    #[error("invalid distribution plan: {0}")]
    InvalidPlan(String),

    /// A built-in rewrite pattern failed to compile.
    #[error("bad rewrite pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl BankError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        BankError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn json(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        BankError::Json {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Returns `true` if the error means the input file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BankError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Convenience alias for results in this crate.
pub type BankResult<T> = Result<T, BankError>;
