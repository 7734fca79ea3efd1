//! Error types for docchunk.
//!
//! Library crates use [`DocChunkError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all docchunk operations.
#[derive(Debug, thiserror::Error)]
pub enum DocChunkError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The element document itself could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A single element from the upstream extractor is missing a required field.
    /// The element is skipped; the pass continues.
    #[error("malformed block at element {index}: {message}")]
    MalformedBlock { index: usize, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad output target, inconsistent input, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocChunkError>;

impl DocChunkError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a malformed-block error for the element at `index`.
    pub fn malformed(index: usize, msg: impl Into<String>) -> Self {
        Self::MalformedBlock {
            index,
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
