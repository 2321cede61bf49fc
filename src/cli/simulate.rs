//! Simulate command implementation.

use super::output::{JsonSimSummary, SimStats, format_sim_text};
use super::{CliError, SimFormat, load_content, seed_or_random};
use indicatif::{ProgressBar, ProgressStyle};
use mergeboard::sim::{SimConfig, run_simulation};
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;

/// Options for the simulate command.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SimulateOptions {
    /// Base seed; game N uses `seed + N`.
    pub(crate) seed: Option<u64>,
    /// Steps per game.
    pub(crate) steps: u32,
    /// Number of games.
    pub(crate) runs: u64,
    /// Worker threads.
    pub(crate) threads: Option<usize>,
    /// Output format.
    pub(crate) format: SimFormat,
    /// Show a progress bar.
    pub(crate) progress: bool,
}

/// Execute the simulate command.
///
/// # Errors
///
/// Returns an error if the content cannot be loaded or every game fails.
pub(crate) fn execute(
    catalog: Option<&Path>,
    config: Option<&Path>,
    options: SimulateOptions,
) -> Result<(), CliError> {
    let (catalog, config) = load_content(catalog, config)?;
    config.validate(&catalog)?;

    // Set thread pool size if specified
    if let Some(num_threads) = options.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let base_seed = seed_or_random(options.seed);
    let sim = SimConfig {
        steps: options.steps,
        ..SimConfig::default()
    };

    let pb = if options.progress {
        let style = ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} games ({per_sec})",
            )
            .map_err(|e| CliError::new(format!("Invalid progress template: {e}")))?
            .progress_chars("=>-");
        let pb = ProgressBar::new(options.runs);
        pb.set_style(style);
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();

    // Each thread folds into its own SimStats; the partials are merged at the end
    let stats = (0..options.runs)
        .into_par_iter()
        .fold(SimStats::default, |mut local, i| {
            let seed = base_seed.wrapping_add(i);
            match run_simulation(seed, &catalog, &config, sim) {
                Ok(result) => local.add_result(&result),
                Err(e) => {
                    tracing::warn!(seed, error = %e, "simulation failed");
                    local.add_failure();
                }
            }
            if let Some(pb) = &pb {
                pb.inc(1);
            }
            local
        })
        .reduce(SimStats::default, |mut a, b| {
            a.merge(&b);
            a
        });

    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }

    if stats.games_played == 0 && stats.failures > 0 {
        return Err(CliError::new(format!(
            "all {} simulations failed",
            stats.failures
        )));
    }

    let duration = start.elapsed();

    match options.format {
        SimFormat::Text => {
            print!("{}", format_sim_text(&stats));
            println!();
            println!("Duration: {:.2}s", duration.as_secs_f64());
        }
        SimFormat::Json => {
            let summary = JsonSimSummary::from_stats(&stats, base_seed, options.steps);
            let json = serde_json::to_string_pretty(&summary)
                .map_err(|e| CliError::new(format!("JSON serialization failed: {e}")))?;
            println!("{json}");
        }
    }

    Ok(())
}
