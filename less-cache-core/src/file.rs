use crate::error::{CacheError, CacheResult};
use blake3::Hasher;
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Compute a hash of raw bytes
pub fn compute_bytes_hash(content: &[u8]) -> String {
    blake3::hash(content).to_hex().to_string()
}

/// Compute a hash of a string
pub fn compute_string_hash(content: &str) -> String {
    compute_bytes_hash(content.as_bytes())
}

/// Digest a file's contents without loading it into memory.
///
/// A missing file maps to [`CacheError::FileNotFound`].
pub fn compute_file_hash<P: AsRef<Path>>(path: P) -> CacheResult<String> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| CacheError::from_io(path, e))?;

    let mut hasher = Hasher::new();
    hasher
        .update_reader(file)
        .map_err(|e| CacheError::HashFailure {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Recursively collect every regular file below `dir`.
///
/// Symlinks are followed. Entries are sorted by file name at every level so
/// two walks over an unchanged tree yield the same order. A missing root or
/// unreadable entries are skipped rather than reported.
pub fn walk_files<P: AsRef<Path>>(dir: P) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}
