//! Error types for the numeric helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NumericError {
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed matrix file {path}: {reason}")]
    Format { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, NumericError>;
