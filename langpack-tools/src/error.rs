//! Error types for the language pack tools

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the JSON tools. All of them abort the invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Input file not found: {0}")]
    InputFileMissing(PathBuf),

    #[error("Invalid JSON in {path}: {reason}")]
    InputJsonInvalid { path: PathBuf, reason: String },

    #[error("Chunk size must be at least 1, got {0}")]
    InvalidChunkSize(usize),

    #[error("Expected a JSON object at the root of {0}")]
    NotAnObject(String),

    #[error("No part_*.json files found in {0}")]
    NoChunksFound(PathBuf),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    pub fn invalid_json(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ToolError::InputJsonInvalid {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ToolError>;
