//! Mapping from a source file to the location of its cache entry.

use less_cache_core::{compute_string_hash, path_key, relativize};
use std::path::{Path, PathBuf};

/// Subdirectory of a namespace holding cache entries.
pub const CONTENT_DIR_NAME: &str = "content";

/// Extension of cache entry files.
pub const ENTRY_EXTENSION: &str = "json";

/// Resolves `(namespace, source file)` pairs to entry paths.
///
/// The source file's directory, relativized against the resource path when
/// one is configured, is digested into a single path segment. Entries for
/// files with the same name in different directories therefore never
/// collide, the path length is bounded, and two checkouts with the same
/// relative layout produce identical paths.
#[derive(Clone, Debug, Default)]
pub struct CachePathResolver {
    resource_path: Option<PathBuf>,
}

impl CachePathResolver {
    pub fn new(resource_path: Option<PathBuf>) -> Self {
        Self { resource_path }
    }

    pub fn entry_path(&self, namespace_dir: &Path, source_path: &Path) -> PathBuf {
        let stem = source_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = format!("{stem}.{ENTRY_EXTENSION}");

        let mut directory = source_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        if let Some(root) = &self.resource_path {
            directory = relativize(root, &directory);
        }

        let mut path = namespace_dir.join(CONTENT_DIR_NAME);
        // Sources directly under the resource path have no directory segment.
        if !directory.as_os_str().is_empty() {
            path.push(compute_string_hash(&path_key(&directory)));
        }
        path.push(file_name);
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_entry_path_digests_directory() {
        let resolver = CachePathResolver::default();
        let path = resolver.entry_path(Path::new("/cache/ns"), Path::new("/project/ui/button.less"));
        assert_eq!(
            path,
            Path::new("/cache/ns/content")
                .join(compute_string_hash("/project/ui"))
                .join("button.json")
        );
    }

    #[test]
    fn test_same_name_in_different_directories() {
        let resolver = CachePathResolver::default();
        let ns = Path::new("/cache/ns");
        assert_ne!(
            resolver.entry_path(ns, Path::new("/project/a/index.less")),
            resolver.entry_path(ns, Path::new("/project/b/index.less"))
        );
    }

    #[test]
    fn test_relativized_paths_are_portable() {
        let ns = Path::new("/cache/ns");
        let one = CachePathResolver::new(Some(PathBuf::from("/home/one/project")))
            .entry_path(ns, Path::new("/home/one/project/ui/button.less"));
        let two = CachePathResolver::new(Some(PathBuf::from("/srv/two/project")))
            .entry_path(ns, Path::new("/srv/two/project/ui/button.less"));
        assert_eq!(one, two);
        assert_eq!(
            one,
            ns.join("content")
                .join(compute_string_hash("ui"))
                .join("button.json")
        );
    }

    #[test]
    fn test_source_at_resource_root() {
        let resolver = CachePathResolver::new(Some(PathBuf::from("/project")));
        assert_eq!(
            resolver.entry_path(Path::new("/cache/ns"), Path::new("/project/imports.less")),
            PathBuf::from("/cache/ns/content/imports.json")
        );
    }

    #[test]
    fn test_source_outside_resource_path_uses_absolute_directory() {
        let resolver = CachePathResolver::new(Some(PathBuf::from("/project")));
        assert_eq!(
            resolver.entry_path(Path::new("/cache/ns"), Path::new("/vendor/theme.less")),
            Path::new("/cache/ns/content")
                .join(compute_string_hash("/vendor"))
                .join("theme.json")
        );
    }
}
