//! Whole-file JSON records.
//!
//! Writes go through a temporary file in the destination directory followed
//! by a rename, so readers observe either the previous record or the new one.

use crate::error::{CacheError, CacheResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::trace;

/// Read and decode the JSON record at `path`.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> CacheResult<T> {
    let content = fs::read(path)
        .await
        .map_err(|e| CacheError::from_io(path, e))?;
    Ok(serde_json::from_slice(&content)?)
}

/// Encode `value` and atomically replace the record at `path` with it.
///
/// Parent directories are created as needed.
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> CacheResult<()> {
    let content = serde_json::to_vec(value)?;
    let parent = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&parent).await?;

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> CacheResult<()> {
        let mut temp = tempfile::NamedTempFile::new_in(&parent)?;
        temp.write_all(&content)?;
        temp.persist(&target).map_err(|e| CacheError::Io(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| CacheError::Io(std::io::Error::other(e)))??;

    trace!(path = %path.display(), "Wrote cache record");
    Ok(())
}

/// Remove `path` and everything below it.
///
/// A directory that is already gone counts as removed.
pub async fn remove_dir_all_best_effort(path: &Path) -> CacheResult<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CacheError::Cleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}
