//! Application-wide error types.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to resolve {locator}: {reason}")]
    ResolutionFailed { locator: String, reason: String },

    #[error("Failed to fetch {locator}: {reason}")]
    FetchFailed { locator: String, reason: String },

    #[error("Remux of {} failed with exit code {code}: {detail}", .path.display())]
    RemuxFailed {
        path: PathBuf,
        code: i32,
        detail: String,
    },

    #[error("IO error while {op} {}: {source}", .path.display())]
    Filesystem {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn resolution(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ResolutionFailed {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    pub fn fetch(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FetchFailed {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    pub fn remux(path: impl Into<PathBuf>, code: i32, detail: impl Into<String>) -> Self {
        Self::RemuxFailed {
            path: path.into(),
            code,
            detail: detail.into(),
        }
    }

    pub fn io_path(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Filesystem {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether this error only aborts the item being processed.
    ///
    /// The queue runner keeps going after an item-scoped error; anything else
    /// (broken configuration, serialization of our own state) is reported the
    /// same way but indicates the next item will most likely fail too.
    pub fn is_item_scoped(&self) -> bool {
        matches!(
            self,
            Self::ResolutionFailed { .. }
                | Self::FetchFailed { .. }
                | Self::RemuxFailed { .. }
                | Self::Filesystem { .. }
                | Self::NotFound { .. }
        )
    }
}
