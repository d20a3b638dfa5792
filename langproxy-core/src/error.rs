//! Error types for interception operations

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the interception engine.
///
/// Only startup failures (binding the listener, loading the CA) are fatal.
/// Everything that can go wrong while a request is in flight is logged by the
/// caller and degrades to passing the request through.
#[derive(Debug, Error)]
pub enum InterceptError {
    /// The configuration file does not exist
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed
    #[error("Failed to parse configuration {}: {reason}", path.display())]
    ConfigParse { path: PathBuf, reason: String },

    /// A rule pattern failed to compile; only that rule is skipped
    #[error("Invalid pattern in rule '{rule}': {reason}")]
    RulePatternInvalid { rule: String, reason: String },

    /// A rule redirects with a status outside 3xx; only that rule is skipped
    #[error("Rule '{rule}' has non-redirect status {status}")]
    RuleStatusInvalid { rule: String, status: u16 },

    /// The configured local language pack is not a readable regular file
    #[error("Local file unavailable: {}", .0.display())]
    LocalFileMissing(PathBuf),

    /// Network error or non-200 status while fetching a remote resource
    #[error("Remote fetch failed for {url}: {reason}")]
    RemoteFetchFailed { url: String, reason: String },

    /// Listener or admin server errors
    #[error("Network error: {0}")]
    Network(String),

    /// CA generation or loading errors
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// Semantically invalid configuration values
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
