//! Storage key derivation.
//!
//! Each backend addresses entries differently: the flat backend stores a
//! sibling file next to the source, the hashed backend flattens arbitrary
//! source paths into one shared directory through a canonical escape, and
//! the key-value backend uses the source path as a record name. Derivation
//! is deterministic and, for the filesystem variants, injective: distinct
//! sources can never collide on one key.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::CacheError;

/// Extension appended to a source path to name its flat cache entry.
pub const FLAT_SUFFIX: &str = "kc";

/// Bytes that pass through the hashed-key escape unchanged.
///
/// Everything else becomes `%XX` (two uppercase hex digits). `%` is outside
/// the allow-list and therefore always escaped, which makes the mapping
/// injective: an escaped key can only be produced by exactly one input.
fn is_plain(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-')
}

/// A backend-specific entry address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKey {
    /// A filesystem location (flat and hashed backends).
    Path(PathBuf),
    /// A record name in a key-value store.
    Record(String),
}

fn reject_empty(source: &Path) -> Result<(), CacheError> {
    if source.as_os_str().is_empty() {
        return Err(CacheError::InvalidKey {
            reason: "empty source path".to_string(),
        });
    }
    Ok(())
}

/// Derives the sibling-file key for the flat backend: `<source>.kc`.
///
/// Appends to the full file name rather than replacing the extension, so
/// `a.src` and `a` map to distinct keys.
pub fn flat_key(source: &Path) -> Result<StorageKey, CacheError> {
    reject_empty(source)?;
    let mut name = OsString::from(source.as_os_str());
    name.push(".");
    name.push(FLAT_SUFFIX);
    Ok(StorageKey::Path(PathBuf::from(name)))
}

/// Derives the shared-directory key for the hashed backend.
///
/// The whole source path is escaped into a single flat file name inside
/// `objects_dir`, so entries for sources at any directory depth live side by
/// side.
pub fn hashed_key(objects_dir: &Path, source: &Path) -> Result<StorageKey, CacheError> {
    reject_empty(source)?;
    let escaped = escape_component(&source.to_string_lossy());
    Ok(StorageKey::Path(objects_dir.join(escaped)))
}

/// Derives the record name for the key-value backend.
pub fn record_key(source: &Path) -> Result<StorageKey, CacheError> {
    reject_empty(source)?;
    Ok(StorageKey::Record(source.to_string_lossy().into_owned()))
}

/// Escapes a path string into a filesystem-legal flat file name.
pub fn escape_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        if is_plain(byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
