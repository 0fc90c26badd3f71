//! Configuration types deserialized from `kiln.toml`.

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// The top-level configuration parsed from `kiln.toml`.
///
/// Both sections are optional; an empty file (or a missing one, via
/// [`load_or_default`](crate::load_or_default)) yields the defaults: hashed
/// backend rooted at `.kiln`, compile-if-missing enabled.
#[derive(Debug, Clone, Deserialize)]
pub struct KilnConfig {
    /// Cache backend selection and policy.
    #[serde(default)]
    pub cache: CacheSection,
    /// Source discovery settings for batch commands.
    #[serde(default)]
    pub source: SourceSection,
}

impl Default for KilnConfig {
    fn default() -> Self {
        Self {
            cache: CacheSection::default(),
            source: SourceSection::default(),
        }
    }
}

/// The `[cache]` section: which backend to build and how it behaves.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// The storage backend variant.
    #[serde(default)]
    pub backend: BackendKind,

    /// Root directory for the hashed and key-value backends.
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,

    /// Whether a miss or stale entry triggers compilation. When disabled,
    /// `resolve` reports a miss and the caller decides what to do.
    #[serde(default = "default_true")]
    pub compile_if_missing: bool,

    /// Whether to emit per-resolution debug output.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            storage_root: default_storage_root(),
            compile_if_missing: true,
            verbose: false,
        }
    }
}

/// The `[source]` section: how batch commands discover source files.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSection {
    /// File extensions (without the dot) treated as compilable sources when
    /// a directory is passed to a batch command.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
        }
    }
}

/// The storage backend variant to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Caching disabled; every operation is a no-op.
    Null,
    /// One cache file beside each source.
    Flat,
    /// All cache files in one shared directory under escaped keys.
    Hashed,
    /// An embedded key-value store.
    Kv,
}

impl Default for BackendKind {
    fn default() -> Self {
        BackendKind::Hashed
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Null => "null",
            BackendKind::Flat => "flat",
            BackendKind::Hashed => "hashed",
            BackendKind::Kv => "kv",
        };
        f.write_str(name)
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from(".kiln")
}

fn default_true() -> bool {
    true
}

fn default_extensions() -> Vec<String> {
    vec!["src".to_string()]
}
