//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{BackendKind, KilnConfig};
use std::path::Path;

/// Name of the configuration file looked up at the project root.
pub const CONFIG_FILE: &str = "kiln.toml";

/// Loads and validates a `kiln.toml` configuration from a project directory.
pub fn load_config(project_dir: &Path) -> Result<KilnConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `kiln.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<KilnConfig, ConfigError> {
    let config: KilnConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Loads `kiln.toml` from a project directory, falling back to defaults when
/// the file does not exist.
///
/// A present-but-invalid file is still an error; only absence is forgiven.
pub fn load_or_default(project_dir: &Path) -> Result<KilnConfig, ConfigError> {
    if project_dir.join(CONFIG_FILE).exists() {
        load_config(project_dir)
    } else {
        Ok(KilnConfig::default())
    }
}

/// Validates that configuration values are usable by the selected backend.
fn validate_config(config: &KilnConfig) -> Result<(), ConfigError> {
    let needs_root = matches!(config.cache.backend, BackendKind::Hashed | BackendKind::Kv);
    if needs_root && config.cache.storage_root.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "cache.storage_root must not be empty for the {} backend",
            config.cache.backend
        )));
    }
    if config.source.extensions.iter().any(|e| e.is_empty()) {
        return Err(ConfigError::ValidationError(
            "source.extensions must not contain empty entries".to_string(),
        ));
    }
    Ok(())
}
