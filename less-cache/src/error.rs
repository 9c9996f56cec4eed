use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by [`LessCache`](crate::LessCache).
///
/// Unreadable or malformed cache entries never show up here. They are
/// treated as misses.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to compile {}: {message}", .path.display())]
    Compile { path: PathBuf, message: String },

    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),

    #[error("Cache error: {0}")]
    Cache(#[from] less_cache_core::CacheError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn invalid_config<S: ToString>(message: S) -> Self {
        Self::InvalidConfig(message.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
