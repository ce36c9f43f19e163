//! Error types for listing extraction and persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching, extracting or persisting postings.
#[derive(Debug, Error)]
pub enum ListingsError {
    /// HTTP request failed.
    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The careers page answered with a non-success status.
    #[error("fetch failed: {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The page content could not be read as a listing page.
    #[error("parse failure: {0}")]
    Parse(String),

    /// Invalid extractor configuration (bad selector, bad URL).
    #[error("invalid extractor configuration: {0}")]
    InvalidConfig(String),

    /// Snapshot file could not be read or written.
    #[error("snapshot IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot could not be serialized.
    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ListingsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
