//! Error types for binding administration.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while administering site bindings.
#[derive(Debug, Error)]
pub enum BindingError {
    /// The request config does not say where the site is served from.
    #[error("No website root configured for {domain}")]
    MissingWebsiteRoot { domain: String },

    /// The provider issued no HTTP challenge to publish.
    #[error("No HTTP challenge response available for {domain}")]
    MissingChallenge { domain: String },

    /// Failed to write a file into the site.
    #[error("Failed to write {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Certificate artifact not found.
    #[error("Certificate artifact not found: {path}")]
    ArtifactNotFound { path: PathBuf },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BindingError {
    /// Creates a write failed error.
    pub fn write_failed(path: PathBuf, source: std::io::Error) -> Self {
        Self::WriteFailed { path, source }
    }
}
