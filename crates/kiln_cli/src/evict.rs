//! `kiln evict` — remove cached entries.

use crate::pipeline::{collect_sources, load_cache};
use crate::{GlobalArgs, PathsArgs};

/// Runs the `kiln evict` command.
///
/// Eviction is idempotent per source — evicting a source that was never
/// cached succeeds silently. Returns exit code 0 unless a backend failure
/// occurred.
pub fn run(args: &PathsArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (config, cache) = load_cache(global)?;
    let sources = collect_sources(&args.paths, &config.source.extensions)?;

    let mut failures = 0usize;
    for source in &sources {
        if let Err(e) = cache.invalidate(source) {
            eprintln!("error: {}: {}", source.display(), e);
            failures += 1;
        }
    }

    if !global.quiet {
        eprintln!(
            "   Evicted {} entrie(s), {} failure(s)",
            sources.len() - failures,
            failures
        );
    }

    Ok(if failures == 0 { 0 } else { 1 })
}
