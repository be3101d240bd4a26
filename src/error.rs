//! Error types for every fallible edge of the crate.
//!
//! - [`SanitizeError`] - reading input or writing sanitized output
//! - [`PolicyError`] - loading a JSON sanitization policy
//! - [`StorageError`] - failures raised by a storage backend
//! - [`MediaError`] - media queries the environment cannot evaluate
//! - [`Unavailable`] - what the safe wrappers report instead of the above

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("failed to read html input")]
    Read(#[source] io::Error),
    #[error("failed to serialize sanitized html")]
    Serialize(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read sanitization policy")]
    Io(#[from] io::Error),
    #[error("invalid sanitization policy: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend refuses every operation, like a browser with storage turned off.
    #[error("storage is disabled")]
    Disabled,
    #[error("storage quota of {quota} bytes exceeded")]
    QuotaExceeded { quota: usize },
    #[error("storage file could not be accessed")]
    Io(#[from] io::Error),
    #[error("storage file is corrupt")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("unsupported media query: {0}")]
    Unsupported(String),
    #[error("media queries are not supported by this environment")]
    NotSupported,
}

/// The feature behind a safe wrapper could not be used. The cause has already been logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("feature unavailable")]
pub struct Unavailable;
