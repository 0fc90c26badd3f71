//! Source units: the inputs being compiled.

use std::path::{Path, PathBuf};

use kiln_common::Stamp;

use crate::error::CacheError;

/// A source file as the cache sees it: a path with readable content and an
/// observable modification time.
///
/// Observations are live — content and mtime are read from the filesystem on
/// every call, never memoized, because freshness must always be judged
/// against the source's current state.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    path: PathBuf,
}

impl SourceUnit {
    /// Wraps a source path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The source path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the source's current byte content.
    pub fn read(&self) -> Result<Vec<u8>, CacheError> {
        std::fs::read(&self.path).map_err(|e| CacheError::Source {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Observes the source's current modification time.
    pub fn mtime(&self) -> Result<Stamp, CacheError> {
        let meta = std::fs::metadata(&self.path).map_err(|e| CacheError::Source {
            path: self.path.clone(),
            source: e,
        })?;
        let modified = meta.modified().map_err(|e| CacheError::Source {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(Stamp::from_system_time(modified))
    }
}
