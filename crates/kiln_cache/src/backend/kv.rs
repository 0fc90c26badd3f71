//! The embedded key-value backend.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};

use kiln_common::Stamp;

use crate::error::CacheError;
use crate::key::{self, StorageKey};

use super::StorageBackend;

/// Table holding compiled bytes, keyed by source path.
const BODY_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("body");

/// Table holding write-time freshness stamps, keyed by source path.
const STAMP_TABLE: TableDefinition<&str, u64> = TableDefinition::new("stamp");

/// Name of the store file within the storage root.
const STORE_FILE: &str = "store.redb";

/// Stores entries in a redb database at `<storage_root>/store.redb`.
///
/// Body bytes and the freshness stamp are separate records under the same
/// key: a body whose stamp record is missing reads back as never-stamped,
/// which the freshness policy treats as stale — possibly mismatched bytes
/// are recompiled rather than served. Each write commits both records in a
/// single transaction, so readers see entries all-or-nothing.
///
/// The database handle is owned by this instance for its lifetime and closed
/// when the backend is dropped. It must not be opened a second time in the
/// same process; share one backend instance instead (the handle is safe for
/// concurrent use).
pub struct KeyValueBackend {
    db: Database,
}

fn store_err(e: impl std::fmt::Display) -> CacheError {
    CacheError::Store {
        reason: e.to_string(),
    }
}

fn expect_record<'a>(key: &'a StorageKey) -> Result<&'a str, CacheError> {
    match key {
        StorageKey::Record(name) => Ok(name),
        StorageKey::Path(path) => Err(CacheError::InvalidKey {
            reason: format!("key-value backend given path key '{}'", path.display()),
        }),
    }
}

impl KeyValueBackend {
    /// Opens (creating if necessary) the store under `storage_root` and
    /// ensures both tables exist. Safe to repeat across process runs.
    pub fn open(storage_root: &Path) -> Result<Self, CacheError> {
        std::fs::create_dir_all(storage_root).map_err(|e| CacheError::Io {
            path: storage_root.to_path_buf(),
            source: e,
        })?;
        let db = Database::create(storage_root.join(STORE_FILE)).map_err(store_err)?;

        let txn = db.begin_write().map_err(store_err)?;
        {
            txn.open_table(BODY_TABLE).map_err(store_err)?;
            txn.open_table(STAMP_TABLE).map_err(store_err)?;
        }
        txn.commit().map_err(store_err)?;

        Ok(Self { db })
    }

    /// Test seam: stores a body without its stamp record, simulating an
    /// entry written by an older tool that never stamped it.
    #[cfg(test)]
    pub(crate) fn write_body_only(
        &self,
        key: &StorageKey,
        bytes: &[u8],
    ) -> Result<(), CacheError> {
        let name = expect_record(key)?;
        let txn = self.db.begin_write().map_err(store_err)?;
        {
            let mut body = txn.open_table(BODY_TABLE).map_err(store_err)?;
            body.insert(name, bytes).map_err(store_err)?;
        }
        txn.commit().map_err(store_err)
    }
}

impl StorageBackend for KeyValueBackend {
    fn derive(&self, source: &Path) -> Result<StorageKey, CacheError> {
        key::record_key(source)
    }

    fn exists(&self, key: &StorageKey) -> Result<bool, CacheError> {
        let name = expect_record(key)?;
        let txn = self.db.begin_read().map_err(store_err)?;
        let body = txn.open_table(BODY_TABLE).map_err(store_err)?;
        Ok(body.get(name).map_err(store_err)?.is_some())
    }

    fn read(&self, key: &StorageKey) -> Result<Option<Vec<u8>>, CacheError> {
        let name = expect_record(key)?;
        let txn = self.db.begin_read().map_err(store_err)?;
        let body = txn.open_table(BODY_TABLE).map_err(store_err)?;
        Ok(body.get(name).map_err(store_err)?.map(|v| v.value().to_vec()))
    }

    fn write(&self, key: &StorageKey, bytes: &[u8], stamp: Stamp) -> Result<(), CacheError> {
        let name = expect_record(key)?;
        let txn = self.db.begin_write().map_err(store_err)?;
        {
            let mut body = txn.open_table(BODY_TABLE).map_err(store_err)?;
            body.insert(name, bytes).map_err(store_err)?;
            let mut stamps = txn.open_table(STAMP_TABLE).map_err(store_err)?;
            stamps.insert(name, stamp.as_unix_secs()).map_err(store_err)?;
        }
        txn.commit().map_err(store_err)
    }

    fn delete(&self, key: &StorageKey) -> Result<(), CacheError> {
        let name = expect_record(key)?;
        let txn = self.db.begin_write().map_err(store_err)?;
        {
            let mut body = txn.open_table(BODY_TABLE).map_err(store_err)?;
            body.remove(name).map_err(store_err)?;
            let mut stamps = txn.open_table(STAMP_TABLE).map_err(store_err)?;
            stamps.remove(name).map_err(store_err)?;
        }
        txn.commit().map_err(store_err)
    }

    fn stored_stamp(&self, key: &StorageKey) -> Result<Option<Stamp>, CacheError> {
        let name = expect_record(key)?;
        let txn = self.db.begin_read().map_err(store_err)?;
        let stamps = txn.open_table(STAMP_TABLE).map_err(store_err)?;
        Ok(stamps
            .get(name)
            .map_err(store_err)?
            .map(|v| Stamp::from_unix_secs(v.value())))
    }
}
