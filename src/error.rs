//! Error types for the packaging pipeline.
//!
//! Every variant is fatal to a run. Recoverable situations (unresolved
//! references, skipped unknown blocks) never surface as errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::media::MediaError;

/// Errors that abort a packaging run
#[derive(Debug, Error)]
pub enum PackError {
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input file {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid article file pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("Invalid reference pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Media inspection failed for {}: {source}", asset.display())]
    Media {
        asset: PathBuf,
        #[source]
        source: MediaError,
    },

    #[error("Video has no display aspect ratio: {}", asset.display())]
    MissingAspectRatio { asset: PathBuf },

    #[error("Bookmark references unknown article '{article_name}'")]
    DanglingBookmark { article_name: String },

    #[error("Article '{article_name}' is bookmarked more than once")]
    DuplicateBookmark { article_name: String },

    #[error("Bookmark for '{article_name}' has invalid created_at '{value}'")]
    InvalidBookmarkDate { article_name: String, value: String },

    #[error("Article '{article}' contains unknown block type '{block_type}'")]
    UnknownBlock { article: String, block_type: String },

    #[error("Article '{article}' has a malformed block at index {index}: {source}")]
    MalformedBlock {
        article: String,
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Article name '{name}' is used by more than one article")]
    DuplicateArticle { name: String },

    #[error("Raw content of article '{article}' is not valid JSON: {source}")]
    CorruptRawContent {
        article: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Lifecycle violation: {0}")]
    Lifecycle(String),

    #[error("Output already exists: {}", .0.display())]
    OutputExists(PathBuf),

    #[error("Guide directory is locked by another writer: {}", .0.display())]
    Locked(PathBuf),
}

impl PackError {
    /// Wrap an IO error with the path that caused it
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the library
pub type Result<T, E = PackError> = std::result::Result<T, E>;
