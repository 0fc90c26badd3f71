//! Storage backends: where compiled artifacts live.
//!
//! A backend persists raw compiled bytes plus the freshness stamp for each
//! entry. Four strategies are provided; exactly one is selected and built at
//! startup from the configuration — the orchestrator never branches on the
//! variant.

mod flat;
mod hashed;
mod kv;
mod null;

pub use flat::FlatFileBackend;
pub use hashed::HashedFileBackend;
pub use kv::KeyValueBackend;
pub use null::NullBackend;

use std::io::Write;
use std::path::Path;

use kiln_common::Stamp;
use kiln_config::{BackendKind, CacheSection};

use crate::error::CacheError;
use crate::key::StorageKey;

/// The capability set every storage strategy implements.
///
/// Absence is not an error anywhere in this trait: `exists` answers `false`,
/// `read` and `stored_stamp` answer `None`, and `delete` succeeds on a
/// missing entry. Only true I/O faults return `Err`.
///
/// Implementations are safe for concurrent callers; writes are atomic, so a
/// reader racing a writer observes either the old entry or the new one,
/// never a partial write.
pub trait StorageBackend: Send + Sync {
    /// Derives this backend's storage key for a source path.
    fn derive(&self, source: &Path) -> Result<StorageKey, CacheError>;

    /// Reports whether an entry is present under the key.
    fn exists(&self, key: &StorageKey) -> Result<bool, CacheError>;

    /// Reads an entry's bytes; `None` is a miss.
    fn read(&self, key: &StorageKey) -> Result<Option<Vec<u8>>, CacheError>;

    /// Stores an entry, replacing any previous one atomically.
    ///
    /// `stamp` is the freshness token captured by the caller at write time;
    /// filesystem backends may ignore it and let the entry's own mtime serve
    /// instead.
    fn write(&self, key: &StorageKey, bytes: &[u8], stamp: Stamp) -> Result<(), CacheError>;

    /// Removes an entry. Deleting an absent key is not an error.
    fn delete(&self, key: &StorageKey) -> Result<(), CacheError>;

    /// Reads the freshness stamp of an entry; `None` if the entry or its
    /// stamp is absent.
    fn stored_stamp(&self, key: &StorageKey) -> Result<Option<Stamp>, CacheError>;
}

/// Builds the backend selected by the configuration.
///
/// This is the only place a [`BackendKind`] is inspected; the returned
/// trait object is used uniformly afterwards.
pub fn from_config(cache: &CacheSection) -> Result<Box<dyn StorageBackend>, CacheError> {
    match cache.backend {
        BackendKind::Null => Ok(Box::new(NullBackend)),
        BackendKind::Flat => Ok(Box::new(FlatFileBackend::new())),
        BackendKind::Hashed => Ok(Box::new(HashedFileBackend::new(&cache.storage_root)?)),
        BackendKind::Kv => Ok(Box::new(KeyValueBackend::open(&cache.storage_root)?)),
    }
}

// Shared filesystem primitives for the flat and hashed backends.

fn expect_path<'a>(key: &'a StorageKey) -> Result<&'a Path, CacheError> {
    match key {
        StorageKey::Path(path) => Ok(path),
        StorageKey::Record(name) => Err(CacheError::InvalidKey {
            reason: format!("filesystem backend given record key '{name}'"),
        }),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn file_exists(path: &Path) -> Result<bool, CacheError> {
    match std::fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_error(path, e)),
    }
}

fn read_file(path: &Path) -> Result<Option<Vec<u8>>, CacheError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(path, e)),
    }
}

/// Writes via a temp file in the destination directory and renames it over
/// the target, so readers never observe a partial entry.
fn write_file_atomic(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| io_error(path, e))?;
    tmp.write_all(bytes).map_err(|e| io_error(path, e))?;
    tmp.persist(path).map_err(|e| io_error(path, e.error))?;
    Ok(())
}

fn delete_file(path: &Path) -> Result<(), CacheError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error(path, e)),
    }
}

fn file_stamp(path: &Path) -> Result<Option<Stamp>, CacheError> {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(path, e)),
    };
    let modified = meta.modified().map_err(|e| io_error(path, e))?;
    Ok(Some(Stamp::from_system_time(modified)))
}
