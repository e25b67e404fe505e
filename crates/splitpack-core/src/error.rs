use std::path::PathBuf;
use thiserror::Error;

/// Core error type for configuration and setup.
///
/// Failures of the per-file stage itself are reported through
/// [`TransformError`](crate::transform::TransformError) instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Replacement for `{name}` is not a valid expression: {message}")]
    InvalidReplacement { name: String, message: String },

    #[error("Invalid define `{0}`, expected NAME=EXPRESSION")]
    InvalidDefine(String),
}
