//! The disabled backend.

use std::path::Path;

use kiln_common::Stamp;

use crate::error::CacheError;
use crate::key::StorageKey;

use super::StorageBackend;

/// A backend that stores nothing.
///
/// Every lookup misses and every mutation is a no-op, so a cache built over
/// it compiles fresh on each resolution without the orchestrator special-
/// casing "caching disabled". The derived key is a constant placeholder that
/// is never dereferenced.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl StorageBackend for NullBackend {
    fn derive(&self, _source: &Path) -> Result<StorageKey, CacheError> {
        Ok(StorageKey::Record(String::new()))
    }

    fn exists(&self, _key: &StorageKey) -> Result<bool, CacheError> {
        Ok(false)
    }

    fn read(&self, _key: &StorageKey) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    fn write(&self, _key: &StorageKey, _bytes: &[u8], _stamp: Stamp) -> Result<(), CacheError> {
        Ok(())
    }

    fn delete(&self, _key: &StorageKey) -> Result<(), CacheError> {
        Ok(())
    }

    fn stored_stamp(&self, _key: &StorageKey) -> Result<Option<Stamp>, CacheError> {
        Ok(None)
    }
}
