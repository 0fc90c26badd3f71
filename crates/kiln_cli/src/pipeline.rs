//! Shared helpers for CLI commands.
//!
//! Contains the common steps every subcommand runs: resolving the project
//! root, loading `kiln.toml` (or defaults), building the cache from the
//! configuration, and expanding path arguments into concrete source files.

use std::path::{Path, PathBuf};

use tracing::debug;

use kiln_cache::{ArtifactCache, SnapshotCompiler};
use kiln_config::{KilnConfig, CONFIG_FILE};

use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing
/// `kiln.toml`. Returns `None` if no parent has one.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir →
/// itself). Otherwise walks up from the current directory looking for
/// `kiln.toml`, falling back to the current directory itself: kiln runs
/// with default configuration in projects that never wrote one.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            Ok(p.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")))
        } else {
            Ok(p)
        }
    } else {
        let cwd = std::env::current_dir()?;
        Ok(find_project_root(&cwd).unwrap_or_else(|| {
            debug!("no {CONFIG_FILE} found, using defaults in the current directory");
            cwd
        }))
    }
}

/// Loads the configuration and builds the cache it selects.
///
/// A relative `storage_root` is anchored at the project root, so commands
/// behave the same from any working directory inside the project.
pub fn load_cache(
    global: &GlobalArgs,
) -> Result<(KilnConfig, ArtifactCache<SnapshotCompiler>), Box<dyn std::error::Error>> {
    let project_root = resolve_project_root(global)?;
    let config = kiln_config::load_or_default(&project_root)?;

    let mut cache_section = config.cache.clone();
    if cache_section.storage_root.is_relative() {
        cache_section.storage_root = project_root.join(&cache_section.storage_root);
    }

    let cache = ArtifactCache::from_config(&cache_section, SnapshotCompiler)?;
    Ok((config, cache))
}

/// Expands path arguments into a sorted list of source files.
///
/// A directory is searched recursively for files whose extension matches
/// `extensions`; a file path is taken as-is, whatever its extension — naming
/// a file explicitly is an instruction, not a query.
pub fn collect_sources(
    paths: &[String],
    extensions: &[String],
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut sources = Vec::new();
    for raw in paths {
        let path = PathBuf::from(raw);
        if path.is_dir() {
            walk_dir(&path, extensions, &mut sources)?;
        } else {
            sources.push(path);
        }
    }
    sources.sort();
    sources.dedup();
    Ok(sources)
}

fn walk_dir(
    dir: &Path,
    extensions: &[String],
    out: &mut Vec<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_dir(&path, extensions, out)?;
        } else if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if extensions.iter().any(|wanted| wanted == ext) {
                out.push(path);
            }
        }
    }
    Ok(())
}
