use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Common error type for cache operations
#[derive(Error, Diagnostic, Debug)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Content hash calculation failed for {path}: {reason}")]
    HashFailure { path: PathBuf, reason: String },

    #[error("Cache version mismatch in {path}: expected {expected}, found {found}")]
    VersionMismatch {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    #[error("Failed to remove stale cache directory {path}: {source}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CacheError {
    /// Map an I/O error on `path`, turning `NotFound` into [`CacheError::FileNotFound`].
    pub fn from_io<P: Into<PathBuf>>(path: P, error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path.into())
        } else {
            Self::Io(error)
        }
    }

    /// Whether this error means the target simply does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::FileNotFound(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// A specialized result type for cache operations
pub type CacheResult<T> = std::result::Result<T, CacheError>;
