//! The cache orchestrator.
//!
//! [`ArtifactCache`] ties a storage backend and a compiler together: on
//! every resolution it derives the entry key, checks existence and
//! freshness against the live source, and either deserializes the stored
//! bytes or compiles fresh and writes the result back.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use kiln_common::{SourceDigest, Stamp};
use kiln_config::CacheSection;

use crate::backend::{self, StorageBackend};
use crate::compiler::SourceCompiler;
use crate::error::CacheError;
use crate::freshness;
use crate::key::StorageKey;
use crate::source::SourceUnit;

/// The outcome of a cache resolution.
#[derive(Debug)]
pub enum Resolved<A> {
    /// The stored entry was fresh and deserialized successfully.
    Loaded(A),
    /// The source was (re)compiled and the entry written back.
    Compiled(A),
    /// The entry is missing or stale and compile-if-missing is disabled;
    /// the caller decides whether to compile through another path.
    Miss,
}

impl<A> Resolved<A> {
    /// The artifact, if one was produced.
    pub fn into_artifact(self) -> Option<A> {
        match self {
            Resolved::Loaded(artifact) | Resolved::Compiled(artifact) => Some(artifact),
            Resolved::Miss => None,
        }
    }
}

/// Resolution counters owned by one cache instance.
///
/// Thread-safe; shared implicitly by every caller of the owning cache.
#[derive(Debug, Default)]
pub struct CacheStats {
    loaded: AtomicU64,
    compiled: AtomicU64,
}

impl CacheStats {
    fn record_load(&self) {
        self.loaded.fetch_add(1, Ordering::Relaxed);
    }

    fn record_compile(&self) {
        self.compiled.fetch_add(1, Ordering::Relaxed);
    }

    /// A point-in-time copy of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            loaded: self.loaded.load(Ordering::Relaxed),
            compiled: self.compiled.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of a cache's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Resolutions served from storage.
    pub loaded: u64,
    /// Resolutions (or forced stores) that ran the compiler.
    pub compiled: u64,
}

/// A compiled-artifact cache over one backend and one compiler.
///
/// Construction selects everything up front; nothing rebinds later. The
/// cache itself is synchronous and stateless apart from its counters, so one
/// instance may be shared across threads (and the same backing store may be
/// shared across processes). Two concurrent resolutions of the same stale
/// source may both compile and both write; the backend's atomic writes make
/// that a last-writer-wins race, never a corruption.
pub struct ArtifactCache<C: SourceCompiler> {
    backend: Box<dyn StorageBackend>,
    compiler: C,
    compile_if_missing: bool,
    stats: CacheStats,
}

impl<C: SourceCompiler> ArtifactCache<C> {
    /// Creates a cache over an explicit backend.
    ///
    /// When `compile_if_missing` is `false`, a miss or stale entry resolves
    /// to [`Resolved::Miss`] instead of compiling.
    pub fn new(backend: Box<dyn StorageBackend>, compiler: C, compile_if_missing: bool) -> Self {
        Self {
            backend,
            compiler,
            compile_if_missing,
            stats: CacheStats::default(),
        }
    }

    /// Creates a cache with the backend selected by a `[cache]` config
    /// section.
    pub fn from_config(cache: &CacheSection, compiler: C) -> Result<Self, CacheError> {
        let backend = backend::from_config(cache)?;
        Ok(Self::new(backend, compiler, cache.compile_if_missing))
    }

    /// The compiler this cache wraps.
    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Current counter values.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Resolves a source into an artifact, reusing the stored entry when it
    /// is present and fresh.
    ///
    /// Stored bytes that fail to deserialize are treated as a miss and
    /// recompiled — a corrupted or incompatible entry must never fail the
    /// resolution path. An existence-check failure likewise degrades to a
    /// miss while compile-if-missing is enabled.
    pub fn resolve(&self, source: &Path) -> Result<Resolved<C::Artifact>, CacheError> {
        let unit = SourceUnit::new(source);
        let key = self.backend.derive(source)?;

        if let Some(artifact) = self.try_load(&unit, &key)? {
            self.stats.record_load();
            debug!(source = %source.display(), "loaded cached artifact");
            return Ok(Resolved::Loaded(artifact));
        }

        if !self.compile_if_missing {
            debug!(source = %source.display(), "cache miss, compile-if-missing disabled");
            return Ok(Resolved::Miss);
        }

        let artifact = self.compile_into(&unit, &key)?;
        Ok(Resolved::Compiled(artifact))
    }

    /// Compiles the source and stores the entry, regardless of freshness.
    pub fn compile_and_store(&self, source: &Path) -> Result<C::Artifact, CacheError> {
        let unit = SourceUnit::new(source);
        let key = self.backend.derive(source)?;
        self.compile_into(&unit, &key)
    }

    /// Removes the entry for a source. Idempotent: invalidating an absent
    /// entry succeeds.
    pub fn invalidate(&self, source: &Path) -> Result<(), CacheError> {
        let key = self.backend.derive(source)?;
        self.backend.delete(&key)
    }

    /// Reads the raw stored bytes for a source without any freshness check.
    ///
    /// Audit accessor for verification tooling; `None` when no entry is
    /// stored.
    pub fn stored_bytes(&self, source: &Path) -> Result<Option<Vec<u8>>, CacheError> {
        let key = self.backend.derive(source)?;
        self.backend.read(&key)
    }

    fn try_load(
        &self,
        unit: &SourceUnit,
        key: &StorageKey,
    ) -> Result<Option<C::Artifact>, CacheError> {
        let exists = match self.backend.exists(key) {
            Ok(exists) => exists,
            Err(e) if self.compile_if_missing => {
                warn!(source = %unit.path().display(), error = %e,
                      "existence check failed, treating as miss");
                false
            }
            Err(e) => return Err(e),
        };
        if !exists {
            return Ok(None);
        }

        // Freshness is judged against the source's state right now, never
        // against anything remembered from an earlier resolution.
        let stored = self.backend.stored_stamp(key)?;
        if !freshness::is_fresh(stored, unit.mtime()?) {
            debug!(source = %unit.path().display(), "stored entry is stale");
            return Ok(None);
        }

        let Some(bytes) = self.backend.read(key)? else {
            // Deleted between the existence check and the read; a miss.
            return Ok(None);
        };

        match self.compiler.deserialize(&bytes) {
            Ok(artifact) => Ok(Some(artifact)),
            Err(e) => {
                warn!(source = %unit.path().display(), error = %e,
                      "stored artifact rejected, recompiling");
                Ok(None)
            }
        }
    }

    fn compile_into(
        &self,
        unit: &SourceUnit,
        key: &StorageKey,
    ) -> Result<C::Artifact, CacheError> {
        let source_bytes = unit.read()?;
        let digest = SourceDigest::from_bytes(&source_bytes);

        let compiled = self
            .compiler
            .compile(&source_bytes, &digest)
            .map_err(|e| CacheError::Compile {
                path: unit.path().to_path_buf(),
                reason: e.reason,
            })?;

        // Deserialize before storing: bytes that do not round-trip must
        // never land in the cache.
        let artifact = self
            .compiler
            .deserialize(&compiled)
            .map_err(|e| CacheError::Compile {
                path: unit.path().to_path_buf(),
                reason: format!("fresh artifact failed to deserialize: {e}"),
            })?;

        self.backend.write(key, &compiled, Stamp::now())?;
        self.stats.record_compile();
        debug!(source = %unit.path().display(), bytes = compiled.len(), "compiled and stored");
        Ok(artifact)
    }
}

impl<C: SourceCompiler> Drop for ArtifactCache<C> {
    fn drop(&mut self) {
        let snapshot = self.stats.snapshot();
        debug!(
            loaded = snapshot.loaded,
            compiled = snapshot.compiled,
            "artifact cache statistics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FlatFileBackend, HashedFileBackend, KeyValueBackend, NullBackend};
    use crate::compiler::CompileError;
    use crate::error::DecodeError;
    use crate::image::SnapshotCompiler;
    use filetime::FileTime;
    use std::path::PathBuf;

    /// A compiler that rejects every source.
    struct RejectingCompiler;

    impl SourceCompiler for RejectingCompiler {
        type Artifact = ();

        fn compile(&self, _: &[u8], _: &SourceDigest) -> Result<Vec<u8>, CompileError> {
            Err(CompileError::new("nothing compiles"))
        }

        fn deserialize(&self, _: &[u8]) -> Result<(), DecodeError> {
            Err(DecodeError::BadMagic)
        }
    }

    fn write_source(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn flat_cache() -> ArtifactCache<SnapshotCompiler> {
        ArtifactCache::new(Box::new(FlatFileBackend::new()), SnapshotCompiler, true)
    }

    #[test]
    fn first_resolve_compiles_second_loads() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "a.src", b"print 1");
        let cache = flat_cache();

        let first = cache.resolve(&source).unwrap();
        assert!(matches!(first, Resolved::Compiled(_)));
        assert!(dir.path().join("a.src.kc").is_file());

        let second = cache.resolve(&source).unwrap();
        assert!(matches!(second, Resolved::Loaded(_)));

        assert_eq!(cache.stats(), StatsSnapshot { loaded: 1, compiled: 1 });
    }

    #[test]
    fn repeated_resolves_yield_identical_bytes_without_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "a.src", b"stable content");
        let cache = flat_cache();

        let a = cache.resolve(&source).unwrap().into_artifact().unwrap();
        let stored_after_first = cache.stored_bytes(&source).unwrap().unwrap();

        let b = cache.resolve(&source).unwrap().into_artifact().unwrap();
        let stored_after_second = cache.stored_bytes(&source).unwrap().unwrap();

        assert_eq!(a, b);
        assert_eq!(stored_after_first, stored_after_second);
        // The second resolve performed zero compilations.
        assert_eq!(cache.stats().compiled, 1);
    }

    #[test]
    fn advanced_source_mtime_triggers_recompile_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "a.src", b"version one");
        let cache = flat_cache();

        cache.resolve(&source).unwrap();

        // Edit the source and push its mtime past the stored entry's.
        std::fs::write(&source, b"version two").unwrap();
        let future = FileTime::from_unix_time(Stamp::now().as_unix_secs() as i64 + 100, 0);
        filetime::set_file_mtime(&source, future).unwrap();

        let resolved = cache.resolve(&source).unwrap();
        let Resolved::Compiled(artifact) = resolved else {
            panic!("expected recompilation of a stale entry");
        };
        assert_eq!(artifact.payload, b"version two");
        assert_eq!(cache.stats().compiled, 2);

        // The entry was superseded, not merged.
        let stored = cache.stored_bytes(&source).unwrap().unwrap();
        let image = SnapshotCompiler.deserialize(&stored).unwrap();
        assert_eq!(image.payload, b"version two");
    }

    #[test]
    fn kv_stale_stamp_triggers_recompile() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "a.src", b"content");
        let store_root = dir.path().join("store");

        let backend = KeyValueBackend::open(&store_root).unwrap();
        let key = backend.derive(&source).unwrap();
        // An entry stamped long before the source's mtime.
        backend
            .write(&key, b"outdated bytes", Stamp::from_unix_secs(1))
            .unwrap();

        let cache = ArtifactCache::new(Box::new(backend), SnapshotCompiler, true);
        assert!(matches!(
            cache.resolve(&source).unwrap(),
            Resolved::Compiled(_)
        ));
        // The rewrite stamped the entry at the current time, so it now loads.
        assert!(matches!(
            cache.resolve(&source).unwrap(),
            Resolved::Loaded(_)
        ));
    }

    #[test]
    fn kv_body_without_stamp_recompiles_and_writes_both() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "a.src", b"content");
        let store_root = dir.path().join("store");

        let backend = KeyValueBackend::open(&store_root).unwrap();
        let key = backend.derive(&source).unwrap();
        backend.write_body_only(&key, b"unstamped body").unwrap();

        let cache = ArtifactCache::new(Box::new(backend), SnapshotCompiler, true);
        assert!(matches!(
            cache.resolve(&source).unwrap(),
            Resolved::Compiled(_)
        ));
        // Both records were written: the entry now loads as fresh.
        assert!(matches!(
            cache.resolve(&source).unwrap(),
            Resolved::Loaded(_)
        ));
        assert_eq!(cache.stats(), StatsSnapshot { loaded: 1, compiled: 1 });
    }

    #[test]
    fn corrupt_entry_recompiles_without_crashing() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "a.src", b"good content");
        let cache = flat_cache();

        cache.resolve(&source).unwrap();

        // Corrupt the stored entry under its valid key.
        std::fs::write(dir.path().join("a.src.kc"), b"garbage garbage").unwrap();

        let resolved = cache.resolve(&source).unwrap();
        let Resolved::Compiled(artifact) = resolved else {
            panic!("expected recompilation of a corrupt entry");
        };
        assert_eq!(artifact.payload, b"good content");

        // The overwrite produced a valid entry again.
        assert!(matches!(
            cache.resolve(&source).unwrap(),
            Resolved::Loaded(_)
        ));
    }

    #[test]
    fn invalidate_removes_hashed_entry() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "a.src", b"content");
        let backend = HashedFileBackend::new(&dir.path().join("cache")).unwrap();
        let cache = ArtifactCache::new(Box::new(backend), SnapshotCompiler, true);

        cache.resolve(&source).unwrap();
        assert!(cache.stored_bytes(&source).unwrap().is_some());

        cache.invalidate(&source).unwrap();
        assert!(cache.stored_bytes(&source).unwrap().is_none());

        // Invalidation is idempotent.
        cache.invalidate(&source).unwrap();

        assert!(matches!(
            cache.resolve(&source).unwrap(),
            Resolved::Compiled(_)
        ));
        assert_eq!(cache.stats().compiled, 2);
    }

    #[test]
    fn null_backend_always_compiles_and_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "a.src", b"content");
        let cache = ArtifactCache::new(Box::new(NullBackend), SnapshotCompiler, true);

        assert!(matches!(
            cache.resolve(&source).unwrap(),
            Resolved::Compiled(_)
        ));
        assert!(matches!(
            cache.resolve(&source).unwrap(),
            Resolved::Compiled(_)
        ));
        assert_eq!(cache.stats(), StatsSnapshot { loaded: 0, compiled: 2 });

        // Only the source itself exists; no entry was persisted anywhere.
        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn miss_when_compile_if_missing_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "a.src", b"content");
        let cache = ArtifactCache::new(Box::new(FlatFileBackend::new()), SnapshotCompiler, false);

        assert!(matches!(cache.resolve(&source).unwrap(), Resolved::Miss));
        assert!(!dir.path().join("a.src.kc").exists());
        assert_eq!(cache.stats(), StatsSnapshot { loaded: 0, compiled: 0 });

        // Forced compilation still works, and the entry then loads.
        cache.compile_and_store(&source).unwrap();
        assert!(matches!(
            cache.resolve(&source).unwrap(),
            Resolved::Loaded(_)
        ));
    }

    #[test]
    fn compile_and_store_ignores_freshness() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "a.src", b"content");
        let cache = flat_cache();

        cache.resolve(&source).unwrap();
        cache.compile_and_store(&source).unwrap();
        assert_eq!(cache.stats().compiled, 2);
    }

    #[test]
    fn compile_failure_surfaces_and_caches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "bad.src", b"does not matter");
        let cache = ArtifactCache::new(Box::new(FlatFileBackend::new()), RejectingCompiler, true);

        let err = cache.resolve(&source).unwrap_err();
        match err {
            CacheError::Compile { path, reason } => {
                assert_eq!(path, source);
                assert_eq!(reason, "nothing compiles");
            }
            other => panic!("expected a compile error, got {other}"),
        }
        assert!(!dir.path().join("bad.src.kc").exists());
        assert_eq!(cache.stats().compiled, 0);
    }

    #[test]
    fn missing_source_is_a_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = flat_cache();
        let err = cache.resolve(&dir.path().join("ghost.src")).unwrap_err();
        assert!(matches!(err, CacheError::Source { .. }));
    }

    #[test]
    fn empty_source_path_is_a_key_error() {
        let cache = flat_cache();
        let err = cache.resolve(Path::new("")).unwrap_err();
        assert!(matches!(err, CacheError::InvalidKey { .. }));
    }

    #[test]
    fn stored_bytes_expose_audit_digest() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "a.src", b"audit content");
        let cache = flat_cache();

        cache.resolve(&source).unwrap();
        let stored = cache.stored_bytes(&source).unwrap().unwrap();
        let embedded = cache.compiler().source_digest(&stored).unwrap();
        assert_eq!(embedded, SourceDigest::from_bytes(b"audit content"));
    }

    #[test]
    fn from_config_builds_a_working_cache() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "a.src", b"content");

        let mut section = kiln_config::KilnConfig::default().cache;
        section.storage_root = dir.path().join("cache");
        let cache = ArtifactCache::from_config(&section, SnapshotCompiler).unwrap();

        assert!(matches!(
            cache.resolve(&source).unwrap(),
            Resolved::Compiled(_)
        ));
        assert!(matches!(
            cache.resolve(&source).unwrap(),
            Resolved::Loaded(_)
        ));
    }
}
