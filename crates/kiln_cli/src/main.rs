//! kiln CLI — batch management of a compiled-artifact cache.
//!
//! Provides `kiln compile` for warming the cache over files and directory
//! trees, `kiln evict` for removing entries, and `kiln verify` for auditing
//! stored entries against the sources currently on disk.

#![warn(missing_docs)]

mod compile;
mod evict;
mod pipeline;
mod verify;

use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// kiln — a compiled-artifact cache.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Kiln artifact cache")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `kiln.toml` configuration file or project directory.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile sources and store their artifacts, regardless of freshness.
    Compile(PathsArgs),
    /// Remove cached entries for sources.
    Evict(PathsArgs),
    /// Audit cached entries against the current source digests.
    Verify(PathsArgs),
}

/// Paths accepted by the batch subcommands.
#[derive(Parser, Debug)]
pub struct PathsArgs {
    /// Source files or directories. Directories are searched recursively
    /// for files with the configured source extensions; files are taken
    /// as-is.
    #[arg(required = true)]
    pub paths: Vec<String>,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file or project directory.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Compile(ref args) => compile::run(args, &global),
        Command::Evict(ref args) => evict::run(args, &global),
        Command::Verify(ref args) => verify::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_compile_single_path() {
        let cli = Cli::parse_from(["kiln", "compile", "src/a.src"]);
        match cli.command {
            Command::Compile(ref args) => assert_eq!(args.paths, vec!["src/a.src"]),
            _ => panic!("expected Compile command"),
        }
    }

    #[test]
    fn parse_compile_multiple_paths() {
        let cli = Cli::parse_from(["kiln", "compile", "src", "lib", "extra.src"]);
        match cli.command {
            Command::Compile(ref args) => {
                assert_eq!(args.paths, vec!["src", "lib", "extra.src"]);
            }
            _ => panic!("expected Compile command"),
        }
    }

    #[test]
    fn compile_requires_a_path() {
        assert!(Cli::try_parse_from(["kiln", "compile"]).is_err());
    }

    #[test]
    fn parse_evict() {
        let cli = Cli::parse_from(["kiln", "evict", "a.src"]);
        match cli.command {
            Command::Evict(ref args) => assert_eq!(args.paths, vec!["a.src"]),
            _ => panic!("expected Evict command"),
        }
    }

    #[test]
    fn parse_verify() {
        let cli = Cli::parse_from(["kiln", "verify", "src"]);
        match cli.command {
            Command::Verify(ref args) => assert_eq!(args.paths, vec!["src"]),
            _ => panic!("expected Verify command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["kiln", "--quiet", "compile", "a.src"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
    }

    #[test]
    fn parse_verbose_flag() {
        let cli = Cli::parse_from(["kiln", "--verbose", "verify", "a.src"]);
        assert!(cli.verbose);
        assert!(!cli.quiet);
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from(["kiln", "--config", "/path/to/kiln.toml", "evict", "a.src"]);
        assert_eq!(cli.config.as_deref(), Some("/path/to/kiln.toml"));
    }

    #[test]
    fn parse_flags_after_subcommand() {
        let cli = Cli::parse_from(["kiln", "compile", "a.src", "--quiet"]);
        assert!(cli.quiet);
    }
}
