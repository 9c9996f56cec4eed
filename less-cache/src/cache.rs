//! The compilation entry point.
//!
//! [`LessCache`] computes the digest of a source, asks the [`EntryStore`] for
//! a valid entry in the active namespace and, on a miss, runs the
//! [`Compiler`] and stores what it produced.

use less_cache_core::compute_string_hash;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::cache_path::CachePathResolver;
use crate::compiler::{Compiler, RenderContext, SourceOverrides};
use crate::config::CacheConfig;
use crate::entry::{EntryStore, ImportDigest};
use crate::error::{Error, Result};
use crate::import_set::{ImportSetTracker, Namespace};

/// Hit and miss counts since the cache was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> Stats {
        Stats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// A stylesheet compilation cache.
///
/// Import path changes are applied one at a time, in the order they were
/// requested. A compilation waits for every change queued ahead of it and
/// then runs without holding any lock, so compilations of different files
/// proceed concurrently.
pub struct LessCache {
    cache_dir: PathBuf,
    /// Serializes import path changes. `tokio::sync::Mutex` is fair, so
    /// waiters are served in FIFO order.
    tracker: Mutex<ImportSetTracker>,
    namespace: RwLock<Arc<Namespace>>,
    store: EntryStore,
    overrides: SourceOverrides,
    compiler: Arc<dyn Compiler>,
    counters: Counters,
}

impl LessCache {
    /// Create a cache for `config`, compiling misses with `compiler`.
    ///
    /// Nothing is read from disk until [`load`](Self::load) or the first
    /// compilation.
    pub fn new<C: Compiler>(config: CacheConfig, compiler: C) -> Result<Self> {
        config.validate()?;

        let CacheConfig {
            cache_dir,
            import_paths,
            resource_path,
            fallback_dir,
            sync_caches,
            sources,
        } = config;

        let overrides = SourceOverrides::new(resource_path.clone(), sources);
        let store = EntryStore::new(
            CachePathResolver::new(resource_path.clone()),
            overrides.clone(),
            sync_caches,
        );
        let tracker =
            ImportSetTracker::new(cache_dir.clone(), fallback_dir, resource_path, import_paths);
        let namespace = Arc::new(tracker.namespace().clone());

        Ok(Self {
            cache_dir,
            tracker: Mutex::new(tracker),
            namespace: RwLock::new(namespace),
            store,
            overrides,
            compiler: Arc::new(compiler),
            counters: Counters::default(),
        })
    }

    /// Apply the configured import paths, picking up the manifest left by a
    /// previous process.
    pub async fn load(&self) -> Result<()> {
        let mut tracker = self.tracker.lock().await;
        let namespace = tracker.load().await?;
        self.publish(namespace);
        Ok(())
    }

    /// Replace the import search paths.
    pub async fn set_import_paths(&self, import_paths: Vec<PathBuf>) -> Result<()> {
        let mut tracker = self.tracker.lock().await;
        let namespace = tracker.apply(import_paths).await?;
        self.publish(namespace);
        Ok(())
    }

    pub fn import_paths(&self) -> Vec<PathBuf> {
        self.namespace().import_paths.clone()
    }

    pub fn directory(&self) -> &Path {
        &self.cache_dir
    }

    /// The namespace compilations currently read from and write to.
    pub fn namespace(&self) -> Arc<Namespace> {
        match self.namespace.read() {
            Ok(namespace) => Arc::clone(&*namespace),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    pub fn stats(&self) -> Stats {
        self.counters.snapshot()
    }

    /// Serve `path` from memory instead of disk, for compilation entry
    /// points and imports alike.
    pub fn set_source<S: Into<String>>(&self, path: &Path, source: S) {
        self.overrides.insert(self.overrides.key_for(path), source.into());
    }

    pub fn remove_source(&self, path: &Path) -> Option<String> {
        self.overrides.remove(&self.overrides.key_for(path))
    }

    /// Compile the file at `path`, reading it from the override table or disk.
    pub async fn compile_file(&self, path: &Path) -> Result<String> {
        self.compile(path, None).await
    }

    /// Compile `source` as if it were the content of `path`.
    pub async fn compile_source(&self, path: &Path, source: &str) -> Result<String> {
        self.compile(path, Some(source)).await
    }

    /// Return the compiled output for `path`, from the cache when a valid
    /// entry exists.
    #[instrument(skip(self, path, source), fields(path = %path.display()))]
    pub async fn compile(&self, path: &Path, source: Option<&str>) -> Result<String> {
        // Wait for queued import path changes.
        drop(self.tracker.lock().await);
        let namespace = self.namespace();

        let source = match source {
            Some(source) => source.to_string(),
            None => self.read_source(path).await?,
        };
        let digest = compute_string_hash(&source);

        if let Some(output) = self.store.get(&namespace, path, &digest).await {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!(namespace = %namespace.digest, "Cache hit");
            return Ok(output);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        debug!(namespace = %namespace.digest, "Cache miss");

        let (output, imports) = self.render(path, source, &namespace).await?;
        if let Err(e) = self
            .store
            .put(&namespace, path, digest, output.clone(), imports)
            .await
        {
            // Log but don't fail - the output is still valid
            warn!(error = %e, "Failed to store compiled output in cache");
        }

        Ok(output)
    }

    fn publish(&self, namespace: Namespace) {
        let namespace = Arc::new(namespace);
        match self.namespace.write() {
            Ok(mut current) => *current = namespace,
            Err(poisoned) => *poisoned.into_inner() = namespace,
        }
    }

    async fn read_source(&self, path: &Path) -> Result<String> {
        if let Some(source) = self.overrides.get(&self.overrides.key_for(path)) {
            return Ok(source);
        }

        tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::NotFound(path.to_path_buf())
            } else {
                e.into()
            }
        })
    }

    /// Run the compiler on a blocking worker, collecting the files it read.
    async fn render(
        &self,
        path: &Path,
        source: String,
        namespace: &Namespace,
    ) -> Result<(String, Vec<ImportDigest>)> {
        let compiler = Arc::clone(&self.compiler);
        let mut ctx = RenderContext::new(
            path.to_path_buf(),
            namespace.import_paths.clone(),
            self.overrides.clone(),
        );

        let (result, ctx) = tokio::task::spawn_blocking(move || {
            let result = compiler.render(&source, &mut ctx);
            (result, ctx)
        })
        .await
        .map_err(|e| Error::Compile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let output = result.map_err(|e| Error::Compile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok((output, ctx.into_imports()))
    }
}
