//! Mergeboard CLI - validate content, simulate games and inspect saves.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Mergeboard - a deterministic merge-board game engine
#[derive(Parser, Debug)]
#[command(name = "mergeboard")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log engine activity at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate an item catalog and, optionally, a game config against it
    Validate {
        /// Catalog JSON file
        #[arg(required = true)]
        catalog: PathBuf,

        /// Game config JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Play games with the greedy auto-player and report statistics
    Simulate {
        /// Base seed; run N uses seed + N (default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Steps per game (default: 1000)
        #[arg(long, default_value = "1000")]
        steps: u32,

        /// Number of games to play (default: 1)
        #[arg(short, long, default_value = "1")]
        runs: u64,

        /// Number of threads (default: all cores)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Catalog JSON file (default: built-in content)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Game config JSON file (default: built-in content)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::SimFormat,

        /// Show progress bar
        #[arg(long)]
        progress: bool,
    },

    /// Print the board and economy stored in a save file
    Inspect {
        /// Snapshot JSON file
        #[arg(required = true)]
        save: PathBuf,

        /// Catalog JSON file (default: built-in content)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Game config JSON file (default: built-in content)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write a fresh save file for a new game
    NewSave {
        /// Output snapshot path
        #[arg(required = true)]
        path: PathBuf,

        /// Catalog JSON file (default: built-in content)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Game config JSON file (default: built-in content)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let result = match args.command {
        Commands::Validate { catalog, config } => {
            cli::validate::execute(&catalog, config.as_deref())
        }

        Commands::Simulate {
            seed,
            steps,
            runs,
            threads,
            catalog,
            config,
            format,
            progress,
        } => {
            let options = cli::simulate::SimulateOptions {
                seed,
                steps,
                runs,
                threads,
                format,
                progress,
            };
            cli::simulate::execute(catalog.as_deref(), config.as_deref(), options)
        }

        Commands::Inspect {
            save,
            catalog,
            config,
        } => cli::inspect::execute(&save, catalog.as_deref(), config.as_deref()),

        Commands::NewSave {
            path,
            catalog,
            config,
        } => cli::new_save::execute(&path, catalog.as_deref(), config.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_new_save_takes_no_seed() {
        let args = Args::try_parse_from(["mergeboard", "new-save", "save.json"]).unwrap();
        assert!(matches!(args.command, Commands::NewSave { .. }));
        let seeded = Args::try_parse_from(["mergeboard", "new-save", "save.json", "--seed", "7"]);
        assert!(seeded.is_err());
    }

    #[test]
    fn test_new_save_writes_loadable_snapshot() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fresh.json");
        cli::new_save::execute(&path, None, None).unwrap();

        let snapshot = mergeboard::Snapshot::load(&path).unwrap();
        assert!(!snapshot.items.is_empty());
    }
}
