//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Absence is never an error: a missing entry, a stale entry, and an entry
/// that fails to decode are all normal misses handled by recompilation.
/// This enum covers the faults that must reach the caller — storage I/O
/// failures, unreadable sources, compiler rejections, and underivable keys.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing a filesystem entry.
    #[error("storage I/O error at {path}: {source}")]
    Io {
        /// The entry path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The key-value store reported a failure.
    #[error("key-value store error: {reason}")]
    Store {
        /// Description of the store failure.
        reason: String,
    },

    /// The source file itself could not be read or observed.
    #[error("cannot read source {path}: {source}")]
    Source {
        /// The source path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The compiler rejected the source. Never cached.
    #[error("compilation of {path} failed: {reason}")]
    Compile {
        /// The source path.
        path: PathBuf,
        /// The compiler's failure description, verbatim.
        reason: String,
    },

    /// A storage key could not be derived from the source identifier.
    #[error("invalid storage key: {reason}")]
    InvalidKey {
        /// Description of the derivation problem.
        reason: String,
    },
}

/// Failures decoding stored artifact bytes.
///
/// A `DecodeError` on bytes read back from a backend means the entry is
/// corrupt or was written by an incompatible version; the cache recovers by
/// recompiling. A `DecodeError` on freshly compiled bytes is escalated as a
/// compile failure.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The byte stream ended before the header was complete.
    #[error("artifact truncated")]
    Truncated,

    /// The magic bytes did not identify a kiln artifact.
    #[error("not a kiln artifact (bad magic)")]
    BadMagic,

    /// The artifact was written with an unsupported format version.
    #[error("unsupported artifact format version: expected {expected}, got {actual}")]
    UnsupportedVersion {
        /// The format version this build understands.
        expected: u32,
        /// The version found in the header.
        actual: u32,
    },

    /// The payload checksum did not match the header.
    #[error("artifact checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The checksum recorded in the header.
        expected: String,
        /// The checksum computed from the payload.
        actual: String,
    },

    /// The header could not be deserialized.
    #[error("malformed artifact header: {reason}")]
    Malformed {
        /// Description of the decoding failure.
        reason: String,
    },
}
