//! Configuration loading for the kiln artifact cache.
//!
//! Configuration lives in a `kiln.toml` file at the project root. It selects
//! exactly one storage backend and its parameters at startup; there is no
//! late rebinding and no environment-variable branching in the core.

#![warn(missing_docs)]

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, load_or_default, CONFIG_FILE};
pub use types::{BackendKind, CacheSection, KilnConfig, SourceSection};
