use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::Error;

/// Configuration for a [`LessCache`](crate::LessCache).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Directory the cache namespaces are stored in.
    pub cache_dir: PathBuf,
    /// Ordered search paths handed to the compiler.
    #[serde(default)]
    pub import_paths: Vec<PathBuf>,
    /// Root used to relativize paths, making caches portable between
    /// checkouts or machines.
    #[serde(default)]
    pub resource_path: Option<PathBuf>,
    /// Secondary cache directory consulted when the primary has no entry.
    #[serde(default)]
    pub fallback_dir: Option<PathBuf>,
    /// Mirror entries between the primary and fallback directories.
    #[serde(default)]
    pub sync_caches: bool,
    /// Initial in-memory sources, keyed by relativized path.
    #[serde(default)]
    pub sources: HashMap<String, String>,
}

impl CacheConfig {
    pub fn new<P: Into<PathBuf>>(cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Default::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::invalid_config("cacheDir is required"));
        }
        if self.sync_caches && self.fallback_dir.is_none() {
            tracing::debug!("syncCaches is set without a fallbackDir, nothing will be mirrored");
        }
        Ok(())
    }
}

impl TryFrom<serde_json::Value> for CacheConfig {
    type Error = serde_json::Error;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        serde_json::from_value(json)
    }
}
