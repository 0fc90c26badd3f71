//! The freshness policy: when may a stored entry be reused?

use kiln_common::Stamp;

/// Returns `true` if an entry stamped at `stored` is still valid for a
/// source last modified at `source_mtime`.
///
/// Fresh means `stored >= source_mtime` at whole-second resolution. The
/// comparison is conservative in one direction only: a false negative
/// merely recompiles. Known limitation, kept deliberately: a source edited
/// within the same second as the store compares equal and is deemed fresh;
/// correcting this (e.g. by gating on content digests) would change
/// observable caching behavior.
///
/// An absent stamp (`None`) is never fresh. This is how a key-value entry
/// whose body was written but whose stamp record is missing forces a safe
/// recompilation instead of serving possibly mismatched bytes.
pub fn is_fresh(stored: Option<Stamp>, source_mtime: Stamp) -> bool {
    match stored {
        Some(stamp) => stamp >= source_mtime,
        None => false,
    }
}
