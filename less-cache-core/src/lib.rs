//! # less-cache-core
//!
//! Core utilities for content-addressed caching in less-cache.
//!
//! This library provides the leaf functionality the stylesheet cache is
//! built on, including:
//!
//! - Content digests and recursive file enumeration
//! - Path relativization for portable cache layouts
//! - Atomic JSON record persistence
//! - Common error types

pub mod error;
pub mod file;
pub mod json;
pub mod path;

// Re-export common types for convenience
pub use error::{CacheError, CacheResult};
pub use file::{compute_bytes_hash, compute_file_hash, compute_string_hash, walk_files};
pub use json::{read_json, remove_dir_all_best_effort, write_json};
pub use path::{path_key, relativize};
