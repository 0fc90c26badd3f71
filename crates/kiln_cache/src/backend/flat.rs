//! The sibling-file backend.

use std::path::Path;

use kiln_common::Stamp;

use crate::error::CacheError;
use crate::key::{self, StorageKey};

use super::{delete_file, expect_path, file_exists, file_stamp, read_file, write_file_atomic,
            StorageBackend};

/// Stores each entry as a file beside its source (`<source>.kc`).
///
/// Requires write access to every source's directory. The entry file's own
/// mtime is the freshness stamp: an atomic write timestamps the entry at
/// write time without a separate metadata field, and the stamp travels with
/// the file if the tree is copied with timestamps preserved.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatFileBackend;

impl FlatFileBackend {
    /// Creates the backend. No filesystem state is touched until first use.
    pub fn new() -> Self {
        Self
    }
}

impl StorageBackend for FlatFileBackend {
    fn derive(&self, source: &Path) -> Result<StorageKey, CacheError> {
        key::flat_key(source)
    }

    fn exists(&self, key: &StorageKey) -> Result<bool, CacheError> {
        file_exists(expect_path(key)?)
    }

    fn read(&self, key: &StorageKey) -> Result<Option<Vec<u8>>, CacheError> {
        read_file(expect_path(key)?)
    }

    fn write(&self, key: &StorageKey, bytes: &[u8], _stamp: Stamp) -> Result<(), CacheError> {
        write_file_atomic(expect_path(key)?, bytes)
    }

    fn delete(&self, key: &StorageKey) -> Result<(), CacheError> {
        delete_file(expect_path(key)?)
    }

    fn stored_stamp(&self, key: &StorageKey) -> Result<Option<Stamp>, CacheError> {
        file_stamp(expect_path(key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_in(dir: &Path) -> std::path::PathBuf {
        let source = dir.join("a.src");
        std::fs::write(&source, b"source text").unwrap();
        source
    }

    #[test]
    fn entry_lives_beside_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());

        let backend = FlatFileBackend::new();
        let key = backend.derive(&source).unwrap();
        backend.write(&key, b"compiled", Stamp::now()).unwrap();

        assert!(dir.path().join("a.src.kc").is_file());
    }

    #[test]
    fn roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());

        let backend = FlatFileBackend::new();
        let key = backend.derive(&source).unwrap();

        assert!(!backend.exists(&key).unwrap());
        assert!(backend.read(&key).unwrap().is_none());

        backend.write(&key, b"compiled", Stamp::now()).unwrap();
        assert!(backend.exists(&key).unwrap());
        assert_eq!(backend.read(&key).unwrap().unwrap(), b"compiled");
    }

    #[test]
    fn overwrite_replaces_entry() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());

        let backend = FlatFileBackend::new();
        let key = backend.derive(&source).unwrap();
        backend.write(&key, b"old", Stamp::now()).unwrap();
        backend.write(&key, b"new", Stamp::now()).unwrap();
        assert_eq!(backend.read(&key).unwrap().unwrap(), b"new");
    }

    #[test]
    fn stamp_present_after_write() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());

        let backend = FlatFileBackend::new();
        let key = backend.derive(&source).unwrap();
        assert!(backend.stored_stamp(&key).unwrap().is_none());

        backend.write(&key, b"compiled", Stamp::now()).unwrap();
        let stamp = backend.stored_stamp(&key).unwrap().unwrap();
        assert!(stamp > Stamp::from_unix_secs(1_577_836_800));
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());

        let backend = FlatFileBackend::new();
        let key = backend.derive(&source).unwrap();
        backend.write(&key, b"compiled", Stamp::now()).unwrap();

        backend.delete(&key).unwrap();
        assert!(!backend.exists(&key).unwrap());
        // Second delete of an absent entry is fine.
        backend.delete(&key).unwrap();
    }
}
