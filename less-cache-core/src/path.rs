//! Path helpers for portable cache layouts.

use std::path::{Component, Path, PathBuf};

/// Express `to` relative to `from`.
///
/// Relative inputs are taken against the current directory first. Paths that
/// do not live under `from` (the relative form would start with `..`, or no
/// relative form exists) are returned in absolute form. `to == from` yields
/// the empty path.
pub fn relativize<F: AsRef<Path>, T: AsRef<Path>>(from: F, to: T) -> PathBuf {
    let from = absolutize(from.as_ref());
    let to = absolutize(to.as_ref());
    match pathdiff::diff_paths(&to, &from) {
        Some(relative) if !matches!(relative.components().next(), Some(Component::ParentDir)) => {
            relative
        }
        _ => to,
    }
}

fn absolutize(path: &Path) -> PathBuf {
    let resolved = if path.as_os_str().is_empty() {
        std::env::current_dir()
    } else {
        std::path::absolute(path)
    };
    resolved.unwrap_or_else(|_| path.to_path_buf())
}

/// String form of a path as it appears in digests and persisted records.
pub fn path_key<P: AsRef<Path>>(path: P) -> String {
    path.as_ref().to_string_lossy().into_owned()
}
