//! A dependency-aware compilation cache for stylesheets.
//!
//! [`LessCache`] returns previously compiled output for a source file as long
//! as neither the source nor any file the compiler read while producing it
//! has changed, and otherwise runs the [`Compiler`] and stores the result.
//!
//! Entries live under a namespace directory derived from the ordered import
//! search paths:
//!
//! ```text
//! <cache_dir>/<namespace digest>/imports.json
//! <cache_dir>/<namespace digest>/content/<directory digest>/<name>.json
//! ```
//!
//! A fallback directory with the same layout can back the primary one, and
//! in sync mode entries are mirrored between the two.

pub mod cache;
pub mod cache_path;
pub mod compiler;
pub mod config;
pub mod entry;
pub mod error;
pub mod import_set;

pub use cache::{LessCache, Stats};
pub use compiler::{Compiler, RenderContext, SourceOverrides};
pub use config::CacheConfig;
pub use entry::{CACHE_VERSION, CacheEntry, ImportDigest};
pub use error::{Error, Result};
pub use import_set::{ImportManifest, Namespace};
