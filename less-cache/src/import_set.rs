//! Tracking of the import search paths and the files reachable under them.
//!
//! Every ordered list of search paths owns a namespace directory inside the
//! cache directory, named after the digest of the list. Switching to a
//! different list switches namespaces and leaves the old one untouched on
//! disk. Re-applying the same list after files were added, removed or moved
//! below it wipes the namespace, since entries only record the files the
//! compiler actually read and cannot see an import that would now resolve
//! elsewhere. Content changes of existing files are left to the per-entry
//! import digests.

use less_cache_core::{
    CacheError, compute_string_hash, path_key, read_json, relativize, remove_dir_all_best_effort,
    walk_files, write_json,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the manifest file stored in each namespace directory.
pub const MANIFEST_FILE_NAME: &str = "imports.json";

/// The cache subtree belonging to one ordered list of search paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Namespace {
    /// Digest of the (relativized) search paths.
    pub digest: String,
    /// Namespace directory inside the primary cache directory.
    pub dir: PathBuf,
    /// Namespace directory inside the fallback cache directory, if any.
    pub fallback_dir: Option<PathBuf>,
    /// The search paths as configured.
    pub import_paths: Vec<PathBuf>,
}

impl Namespace {
    pub fn new(
        cache_dir: &Path,
        fallback_dir: Option<&Path>,
        resource_path: Option<&Path>,
        import_paths: Vec<PathBuf>,
    ) -> Self {
        let digest = namespace_digest(&import_paths, resource_path);
        Self {
            dir: cache_dir.join(&digest),
            fallback_dir: fallback_dir.map(|dir| dir.join(&digest)),
            digest,
            import_paths,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE_NAME)
    }
}

/// Digest identifying an ordered list of search paths.
pub fn namespace_digest(import_paths: &[PathBuf], resource_path: Option<&Path>) -> String {
    let joined = import_paths
        .iter()
        .map(|path| match resource_path {
            Some(root) => path_key(relativize(root, path)),
            None => path_key(path),
        })
        .collect::<Vec<_>>()
        .join("\n");
    compute_string_hash(&joined)
}

/// Files discovered under a namespace's search paths.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportManifest {
    pub imported_files: Vec<String>,
}

/// List every regular file below `import_paths`, in search-path order.
///
/// Missing or unreadable directories contribute nothing.
pub async fn enumerate(import_paths: &[PathBuf], resource_path: Option<&Path>) -> Vec<String> {
    let import_paths = import_paths.to_vec();
    let resource_path = resource_path.map(Path::to_path_buf);

    tokio::task::spawn_blocking(move || {
        import_paths
            .iter()
            .flat_map(|dir| walk_files(dir))
            .map(|file| match &resource_path {
                Some(root) => path_key(relativize(root, &file)),
                None => path_key(&file),
            })
            .collect::<Vec<String>>()
    })
    .await
    .unwrap_or_else(|e| {
        warn!(error = %e, "Import path enumeration failed");
        Vec::new()
    })
}

/// Owns the active namespace and the file set last seen under it.
#[derive(Debug)]
pub struct ImportSetTracker {
    cache_dir: PathBuf,
    fallback_dir: Option<PathBuf>,
    resource_path: Option<PathBuf>,
    namespace: Namespace,
    /// `None` until the first apply (or a manifest from a previous process).
    imported_files: Option<Vec<String>>,
}

impl ImportSetTracker {
    pub fn new(
        cache_dir: PathBuf,
        fallback_dir: Option<PathBuf>,
        resource_path: Option<PathBuf>,
        import_paths: Vec<PathBuf>,
    ) -> Self {
        let namespace = Namespace::new(
            &cache_dir,
            fallback_dir.as_deref(),
            resource_path.as_deref(),
            import_paths,
        );
        Self {
            cache_dir,
            fallback_dir,
            resource_path,
            namespace,
            imported_files: None,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn imported_files(&self) -> Option<&[String]> {
        self.imported_files.as_deref()
    }

    /// Apply the configured search paths for the first time.
    ///
    /// A manifest left by an earlier process seeds the previous file set, so
    /// drift that happened in between clears the namespace. Without one this
    /// only records the manifest.
    pub async fn load(&mut self) -> Result<Namespace, CacheError> {
        if self.imported_files.is_none() {
            match read_json::<ImportManifest>(&self.namespace.manifest_path()).await {
                Ok(manifest) => self.imported_files = Some(manifest.imported_files),
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    debug!(error = %e, "Ignoring unreadable import manifest");
                }
            }
        }

        let import_paths = self.namespace.import_paths.clone();
        self.apply(import_paths).await
    }

    /// Switch to `import_paths`, invalidating the namespace if the files
    /// below the same search paths changed.
    pub async fn apply(&mut self, import_paths: Vec<PathBuf>) -> Result<Namespace, CacheError> {
        let files = enumerate(&import_paths, self.resource_path.as_deref()).await;
        let next = Namespace::new(
            &self.cache_dir,
            self.fallback_dir.as_deref(),
            self.resource_path.as_deref(),
            import_paths,
        );

        if next.digest != self.namespace.digest {
            debug!(
                from = %self.namespace.digest,
                to = %next.digest,
                "Import paths changed, switching namespace"
            );
        } else if self
            .imported_files
            .as_ref()
            .is_some_and(|previous| *previous != files)
        {
            debug!(
                namespace = %next.digest,
                "Files under the import paths changed, clearing namespace"
            );
            remove_namespace(&next.dir).await;
        }

        let manifest = ImportManifest {
            imported_files: files,
        };
        write_json(&next.manifest_path(), &manifest).await?;

        self.imported_files = Some(manifest.imported_files);
        self.namespace = next.clone();
        Ok(next)
    }
}

/// Delete a namespace directory, retrying once.
///
/// Failures are logged and otherwise ignored: entries left behind still
/// carry their import digests.
async fn remove_namespace(dir: &Path) {
    if let Err(e) = remove_dir_all_best_effort(dir).await {
        debug!(error = %e, "Retrying namespace cleanup");
        if let Err(e) = remove_dir_all_best_effort(dir).await {
            warn!(error = %e, "Leaving stale cache namespace in place");
        }
    }
}
