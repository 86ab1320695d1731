//! Error types for Verdant

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Verdant operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An input raster is missing or cannot be decoded
    #[error("cannot read {}: {reason}", path.display())]
    InputAccess { path: PathBuf, reason: String },

    /// An output file cannot be created or encoded
    #[error("cannot write {}: {reason}", path.display())]
    OutputWrite { path: PathBuf, reason: String },

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Unsupported coordinate transform: {from} -> {to}")]
    UnsupportedCrs { from: String, to: String },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn input(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::InputAccess {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn output(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::OutputWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for Verdant operations
pub type Result<T> = std::result::Result<T, Error>;
