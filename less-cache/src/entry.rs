//! Persisted cache entries and the primary/fallback store around them.

use futures::future::join_all;
use less_cache_core::{
    CacheError, CacheResult, compute_file_hash, compute_string_hash, read_json, write_json,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

use crate::cache_path::CachePathResolver;
use crate::compiler::SourceOverrides;
use crate::import_set::Namespace;

/// Entry format version - increment when the entry layout changes
pub const CACHE_VERSION: u32 = 1;

/// A file the compiler read, with the digest of what it read.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ImportDigest {
    /// Relativized path when a resource path is configured, otherwise the
    /// path as the compiler requested it.
    pub path: String,
    pub digest: String,
}

/// The persisted result of compiling one source file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheEntry {
    /// Digest of the source text.
    pub digest: String,
    pub output: String,
    pub imports: Vec<ImportDigest>,
    pub version: u32,
}

impl CacheEntry {
    pub fn new(digest: String, output: String, imports: Vec<ImportDigest>) -> Self {
        Self {
            digest,
            output,
            imports,
            version: CACHE_VERSION,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    Primary,
    Fallback,
}

/// Reads and writes entries in a namespace, consulting the fallback
/// directory on primary misses and mirroring between the two in sync mode.
#[derive(Clone, Debug)]
pub struct EntryStore {
    resolver: CachePathResolver,
    overrides: SourceOverrides,
    sync_caches: bool,
}

impl EntryStore {
    pub fn new(resolver: CachePathResolver, overrides: SourceOverrides, sync_caches: bool) -> Self {
        Self {
            resolver,
            overrides,
            sync_caches,
        }
    }

    pub fn entry_path(&self, namespace_dir: &Path, source_path: &Path) -> PathBuf {
        self.resolver.entry_path(namespace_dir, source_path)
    }

    /// Return the cached output for `source_path` if a valid entry exists.
    ///
    /// An entry is valid when its source digest equals `digest`, its
    /// version is current, and every recorded import still has the recorded
    /// digest.
    pub async fn get(
        &self,
        namespace: &Namespace,
        source_path: &Path,
        digest: &str,
    ) -> Option<String> {
        let primary = self.entry_path(&namespace.dir, source_path);
        let fallback = namespace
            .fallback_dir
            .as_ref()
            .map(|dir| self.entry_path(dir, source_path));

        let (entry, origin) = match read_entry(&primary).await {
            Ok(entry) => (entry, Origin::Primary),
            Err(e) => {
                trace!(path = %primary.display(), error = %e, "No usable primary entry");
                let fallback = fallback.as_ref()?;
                match read_entry(fallback).await {
                    Ok(entry) => (entry, Origin::Fallback),
                    Err(e) => {
                        trace!(path = %fallback.display(), error = %e, "No usable fallback entry");
                        return None;
                    }
                }
            }
        };

        if entry.digest != digest {
            trace!(
                cached = %entry.digest,
                current = %digest,
                "Source digest mismatch"
            );
            return None;
        }

        if !self.imports_unchanged(&entry.imports).await {
            return None;
        }

        if self.sync_caches {
            match (origin, &fallback) {
                (Origin::Fallback, _) => mirror(&primary, &entry).await,
                (Origin::Primary, Some(fallback)) => mirror(fallback, &entry).await,
                (Origin::Primary, None) => {}
            }
        }

        Some(entry.output)
    }

    /// Write a fresh entry to the primary directory, and to the fallback
    /// directory in sync mode.
    pub async fn put(
        &self,
        namespace: &Namespace,
        source_path: &Path,
        digest: String,
        output: String,
        imports: Vec<ImportDigest>,
    ) -> CacheResult<()> {
        let entry = CacheEntry::new(digest, output, imports);
        write_json(&self.entry_path(&namespace.dir, source_path), &entry).await?;

        if self.sync_caches {
            if let Some(dir) = &namespace.fallback_dir {
                mirror(&self.entry_path(dir, source_path), &entry).await;
            }
        }

        Ok(())
    }

    /// Current digest of a recorded import path.
    pub async fn digest_for_path(&self, key: &str) -> CacheResult<String> {
        if let Some(source) = self.overrides.get(key) {
            return Ok(compute_string_hash(&source));
        }

        let path = self.overrides.resolve(key);
        let hashed = path.clone();
        tokio::task::spawn_blocking(move || compute_file_hash(&hashed))
            .await
            .map_err(|e| CacheError::HashFailure {
                path,
                reason: e.to_string(),
            })?
    }

    async fn imports_unchanged(&self, imports: &[ImportDigest]) -> bool {
        let checks = imports.iter().map(|import| self.digest_for_path(&import.path));
        let results = join_all(checks).await;

        for (import, result) in imports.iter().zip(results) {
            match result {
                Ok(digest) if digest == import.digest => {}
                Ok(_) => {
                    trace!("Import '{}' changed, cache invalid", import.path);
                    return false;
                }
                Err(e) => {
                    trace!(error = %e, "Import '{}' unreadable, cache invalid", import.path);
                    return false;
                }
            }
        }

        true
    }
}

async fn read_entry(path: &Path) -> CacheResult<CacheEntry> {
    let entry: CacheEntry = read_json(path).await?;
    if entry.version != CACHE_VERSION {
        return Err(CacheError::VersionMismatch {
            path: path.to_path_buf(),
            expected: CACHE_VERSION,
            found: entry.version,
        });
    }
    Ok(entry)
}

async fn mirror(path: &Path, entry: &CacheEntry) {
    if let Err(e) = write_json(path, entry).await {
        warn!(path = %path.display(), error = %e, "Failed to mirror cache entry");
    }
}
