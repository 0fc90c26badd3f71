//! The shared-directory backend.

use std::path::{Path, PathBuf};

use kiln_common::Stamp;

use crate::error::CacheError;
use crate::key::{self, StorageKey};

use super::{delete_file, expect_path, file_exists, file_stamp, read_file, write_file_atomic,
            StorageBackend};

/// Subdirectory of the storage root holding the entries.
const OBJECTS_SUBDIR: &str = "objects";

/// Stores all entries flat in one configured directory under escaped keys.
///
/// Unlike [`FlatFileBackend`](super::FlatFileBackend), sources can live on
/// read-only trees: only the storage root needs write access. Entry file
/// mtimes serve as freshness stamps, as in the flat backend.
#[derive(Debug, Clone)]
pub struct HashedFileBackend {
    objects_dir: PathBuf,
}

impl HashedFileBackend {
    /// Creates the backend rooted at `storage_root`, creating
    /// `<storage_root>/objects` if absent. Safe to repeat across runs.
    pub fn new(storage_root: &Path) -> Result<Self, CacheError> {
        let objects_dir = storage_root.join(OBJECTS_SUBDIR);
        std::fs::create_dir_all(&objects_dir).map_err(|e| CacheError::Io {
            path: objects_dir.clone(),
            source: e,
        })?;
        Ok(Self { objects_dir })
    }

    /// The directory holding the entries.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }
}

impl StorageBackend for HashedFileBackend {
    fn derive(&self, source: &Path) -> Result<StorageKey, CacheError> {
        key::hashed_key(&self.objects_dir, source)
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
