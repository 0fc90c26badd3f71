//! `kiln verify` — audit cached entries against current sources.
//!
//! For each source, reads the stored entry (if any), extracts the source
//! digest embedded at compile time, and compares it with a digest of the
//! source currently on disk. This catches entries whose freshness stamp
//! lies — e.g. after a restore that reset mtimes — which the automatic
//! timestamp policy deliberately does not.

use kiln_cache::SourceCompiler;
use kiln_common::SourceDigest;

use crate::pipeline::{collect_sources, load_cache};
use crate::{GlobalArgs, PathsArgs};

/// Runs the `kiln verify` command.
///
/// Prints one status line per source: `ok` (digests match), `stale` (they
/// differ), `undecodable` (the entry cannot be decoded), or `missing` (no
/// entry stored). Missing entries are informational; `stale` and
/// `undecodable` produce exit code 1.
pub fn run(args: &PathsArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (config, cache) = load_cache(global)?;
    let sources = collect_sources(&args.paths, &config.source.extensions)?;

    let mut bad = 0usize;
    let mut missing = 0usize;

    for source in &sources {
        let status = match cache.stored_bytes(source)? {
            None => {
                missing += 1;
                "missing"
            }
            Some(bytes) => match cache.compiler().source_digest(&bytes) {
                None => {
                    bad += 1;
                    "undecodable"
                }
                Some(stored) => {
                    let current = SourceDigest::from_file(source)?;
                    if stored == current {
                        "ok"
                    } else {
                        bad += 1;
                        "stale"
                    }
                }
            },
        };
        println!("{status:>12}  {}", source.display());
    }

    if !global.quiet {
        eprintln!(
            "   Verified {} source(s): {} problem(s), {} missing",
            sources.len(),
            bad,
            missing
        );
    }

    Ok(if bad == 0 { 0 } else { 1 })
}
