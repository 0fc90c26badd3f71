//! `kiln compile` — batch compile-and-store.
//!
//! Expands the path arguments into source files, forces compilation of each
//! one, and stores the artifacts. Failures are reported per source and do
//! not stop the batch; the exit code reflects whether any source failed.

use std::path::PathBuf;

use rayon::prelude::*;

use crate::pipeline::{collect_sources, load_cache};
use crate::{GlobalArgs, PathsArgs};

/// Runs the `kiln compile` command.
///
/// Returns exit code 0 if every source compiled, 1 otherwise.
pub fn run(args: &PathsArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (config, cache) = load_cache(global)?;
    let sources = collect_sources(&args.paths, &config.source.extensions)?;

    if sources.is_empty() {
        if !global.quiet {
            eprintln!("warning: no source files found");
        }
        return Ok(0);
    }

    // One cache shared across workers; compilation races on distinct
    // sources are independent, and the backend tolerates concurrent writes.
    let mut failures: Vec<(PathBuf, String)> = sources
        .par_iter()
        .filter_map(|source| match cache.compile_and_store(source) {
            Ok(_) => None,
            Err(e) => Some((source.clone(), e.to_string())),
        })
        .collect();
    failures.sort();

    for (path, reason) in &failures {
        eprintln!("error: {}: {}", path.display(), reason);
    }

    if !global.quiet {
        eprintln!(
            "   Compiled {} source(s), {} failure(s)",
            cache.stats().compiled,
            failures.len()
        );
    }

    Ok(if failures.is_empty() { 0 } else { 1 })
}
