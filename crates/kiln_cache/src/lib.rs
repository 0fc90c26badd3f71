//! Compiled-artifact caching for deterministic compilers.
//!
//! Given a source file and a [`SourceCompiler`], an [`ArtifactCache`] avoids
//! recompiling unchanged sources: compiled bytes are persisted under a key
//! derived from the source path, and every lookup validates the stored
//! entry's freshness against the source's current modification time before
//! reusing it. Four storage backends are provided — disabled (null), a cache
//! file beside each source (flat), a shared escaped-key directory (hashed),
//! and an embedded key-value store (kv).
//!
//! Reads are fail-safe: a missing, stale, or undecodable entry is a cache
//! miss that triggers recompilation, never a hard failure. Only true I/O
//! faults and compiler rejections surface as errors.

#![warn(missing_docs)]

pub mod backend;
pub mod cache;
pub mod compiler;
pub mod error;
pub mod freshness;
pub mod image;
pub mod key;
pub mod source;

pub use backend::{FlatFileBackend, HashedFileBackend, KeyValueBackend, NullBackend, StorageBackend};
pub use cache::{ArtifactCache, CacheStats, Resolved, StatsSnapshot};
pub use compiler::{CompileError, SourceCompiler};
pub use error::{CacheError, DecodeError};
pub use image::{ArtifactImage, SnapshotCompiler};
pub use key::StorageKey;
pub use source::SourceUnit;
