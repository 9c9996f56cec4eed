//! The seam between the cache and the stylesheet compiler.
//!
//! The cache never parses stylesheets itself. It hands the source text to a
//! [`Compiler`] together with a [`RenderContext`], and the compiler performs
//! every file read through the context. The context resolves reads against
//! the in-memory [`SourceOverrides`] before touching disk and records the
//! digest of everything it returned, which becomes the entry's import list.

use less_cache_core::{compute_string_hash, path_key, relativize};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::entry::ImportDigest;

/// A stylesheet compiler.
///
/// Implementations must read imported files through
/// [`RenderContext::read_file`]; reads that bypass the context are invisible
/// to the cache and will not invalidate entries when they change.
pub trait Compiler: Send + Sync + 'static {
    /// Compile `source` into its output, or fail with a human-readable error.
    fn render(&self, source: &str, ctx: &mut RenderContext) -> miette::Result<String>;
}

impl<F> Compiler for F
where
    F: Fn(&str, &mut RenderContext) -> miette::Result<String> + Send + Sync + 'static,
{
    fn render(&self, source: &str, ctx: &mut RenderContext) -> miette::Result<String> {
        self(source, ctx)
    }
}

/// In-memory sources that take precedence over files on disk.
///
/// Keys are paths relativized against the resource path when one is
/// configured, and plain path strings otherwise. Clones share the same table.
#[derive(Clone, Debug, Default)]
pub struct SourceOverrides {
    resource_path: Option<PathBuf>,
    sources: Arc<RwLock<HashMap<String, String>>>,
}

impl SourceOverrides {
    pub fn new(resource_path: Option<PathBuf>, sources: HashMap<String, String>) -> Self {
        Self {
            resource_path,
            sources: Arc::new(RwLock::new(sources)),
        }
    }

    /// The key `path` is stored under, both here and in cache entries.
    pub fn key_for(&self, path: &Path) -> String {
        match &self.resource_path {
            Some(root) => path_key(relativize(root, path)),
            None => path_key(path),
        }
    }

    /// Where a key lives on disk.
    pub fn resolve(&self, key: &str) -> PathBuf {
        let path = Path::new(key);
        match &self.resource_path {
            Some(root) if !path.is_absolute() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.sources
            .read()
            .ok()
            .and_then(|sources| sources.get(key).cloned())
    }

    pub fn insert(&self, key: String, source: String) {
        if let Ok(mut sources) = self.sources.write() {
            sources.insert(key, source);
        }
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.sources
            .write()
            .ok()
            .and_then(|mut sources| sources.remove(key))
    }
}

/// Everything a compiler invocation may look at, plus the sink that records
/// which files it read.
#[derive(Debug)]
pub struct RenderContext {
    source_path: PathBuf,
    search_paths: Vec<PathBuf>,
    overrides: SourceOverrides,
    imports: Vec<ImportDigest>,
}

impl RenderContext {
    pub fn new(source_path: PathBuf, search_paths: Vec<PathBuf>, overrides: SourceOverrides) -> Self {
        Self {
            source_path,
            search_paths,
            overrides,
            imports: Vec::new(),
        }
    }

    /// Path of the file being compiled.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Ordered search paths for resolving imports.
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Read a file on behalf of the compiler and record its digest.
    ///
    /// Failed reads are not recorded, so a compiler may probe several
    /// candidate locations for one import.
    pub fn read_file(&mut self, path: &Path) -> io::Result<String> {
        let key = self.overrides.key_for(path);
        let content = match self.overrides.get(&key) {
            Some(source) => source,
            None => std::fs::read_to_string(path)?,
        };

        if !self.imports.iter().any(|import| import.path == key) {
            self.imports.push(ImportDigest {
                digest: compute_string_hash(&content),
                path: key,
            });
        }

        Ok(content)
    }

    /// Files read so far, in first-read order.
    pub fn imports(&self) -> &[ImportDigest] {
        &self.imports
    }

    pub fn into_imports(self) -> Vec<ImportDigest> {
        self.imports
    }
}
