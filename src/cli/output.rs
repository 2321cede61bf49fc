//! Output formatting utilities for CLI.

use mergeboard::sim::SimulationResult;
use serde::Serialize;

/// Aggregated statistics across simulated games.
#[derive(Debug, Clone, Default)]
pub(super) struct SimStats {
    /// Games that ran to completion.
    pub(super) games_played: u64,
    /// Games that stopped on an engine error.
    pub(super) failures: u64,
    total_merges: u64,
    total_taps: u64,
    total_energy_starved: u64,
    total_chests: u64,
    total_sold: u64,
    total_gates: u64,
    total_idle: u64,
    total_levels: u64,
    total_coins: u64,
    min_level: Option<u32>,
    max_level: u32,
    /// Single-game result, kept when exactly one game ran.
    pub(super) single: Option<SimulationResult>,
}

impl SimStats {
    /// Add a game result to the stats.
    pub(super) fn add_result(&mut self, result: &SimulationResult) {
        self.games_played += 1;
        self.total_merges += u64::from(result.merges);
        self.total_taps += u64::from(result.taps);
        self.total_energy_starved += u64::from(result.energy_starved);
        self.total_chests += u64::from(result.chests_opened);
        self.total_sold += u64::from(result.items_sold);
        self.total_gates += u64::from(result.gates_completed);
        self.total_idle += u64::from(result.idle_steps);
        self.total_levels += u64::from(result.level);
        self.total_coins = self.total_coins.saturating_add(result.coins);
        self.min_level = Some(self.min_level.map_or(result.level, |m| m.min(result.level)));
        self.max_level = self.max_level.max(result.level);
        self.single = (self.games_played == 1).then_some(*result);
    }

    /// Record a game that failed.
    pub(super) fn add_failure(&mut self) {
        self.failures += 1;
    }

    /// Merge stats from another thread.
    pub(super) fn merge(&mut self, other: &Self) {
        self.single = match (self.games_played, other.games_played) {
            (0, 1) => other.single,
            (1, 0) => self.single,
            _ => None,
        };
        self.games_played += other.games_played;
        self.failures += other.failures;
        self.total_merges += other.total_merges;
        self.total_taps += other.total_taps;
        self.total_energy_starved += other.total_energy_starved;
        self.total_chests += other.total_chests;
        self.total_sold += other.total_sold;
        self.total_gates += other.total_gates;
        self.total_idle += other.total_idle;
        self.total_levels += other.total_levels;
        self.total_coins = self.total_coins.saturating_add(other.total_coins);
        self.min_level = match (self.min_level, other.min_level) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max_level = self.max_level.max(other.max_level);
    }

    #[allow(clippy::cast_precision_loss)]
    fn avg(&self, total: u64) -> f64 {
        if self.games_played == 0 {
            return 0.0;
        }
        total as f64 / self.games_played as f64
    }
}

/// JSON-serializable simulation summary.
#[derive(Debug, Serialize)]
pub(super) struct JsonSimSummary {
    /// Base seed.
    pub(super) seed: u64,
    /// Steps per game.
    pub(super) steps: u32,
    /// Games that ran to completion.
    pub(super) games_played: u64,
    /// Games that stopped on an engine error.
    pub(super) failures: u64,
    /// Mean merges per game.
    pub(super) avg_merges: f64,
    /// Mean generator taps per game.
    pub(super) avg_taps: f64,
    /// Mean taps refused for lack of energy.
    pub(super) avg_energy_starved: f64,
    /// Mean chests opened per game.
    pub(super) avg_chests_opened: f64,
    /// Mean items sold per game.
    pub(super) avg_items_sold: f64,
    /// Mean gates completed per game.
    pub(super) avg_gates_completed: f64,
    /// Mean final level.
    pub(super) avg_level: f64,
    /// Mean final coins.
    pub(super) avg_coins: f64,
    /// Lowest final level.
    pub(super) min_level: u32,
    /// Highest final level.
    pub(super) max_level: u32,
    /// Full result when a single game ran.
    pub(super) game: Option<SimulationResult>,
}

impl JsonSimSummary {
    /// Create from aggregated stats.
    pub(super) fn from_stats(stats: &SimStats, seed: u64, steps: u32) -> Self {
        Self {
            seed,
            steps,
            games_played: stats.games_played,
            failures: stats.failures,
            avg_merges: stats.avg(stats.total_merges),
            avg_taps: stats.avg(stats.total_taps),
            avg_energy_starved: stats.avg(stats.total_energy_starved),
            avg_chests_opened: stats.avg(stats.total_chests),
            avg_items_sold: stats.avg(stats.total_sold),
            avg_gates_completed: stats.avg(stats.total_gates),
            avg_level: stats.avg(stats.total_levels),
            avg_coins: stats.avg(stats.total_coins),
            min_level: stats.min_level.unwrap_or(0),
            max_level: stats.max_level,
            game: stats.single,
        }
    }
}

/// Format one game as human-readable text.
fn format_single(result: &SimulationResult) -> String {
    let mut output = String::new();

    output.push_str(&format!("Simulation (seed: {})\n", result.seed));
    output.push_str(&format!(
        "  Steps: {} ({} idle, {}s simulated)\n",
        result.steps,
        result.idle_steps,
        result.elapsed_ms / 1_000
    ));
    output.push_str(&format!(
        "  Merges: {} ({} with absorption)\n",
        result.merges, result.absorptions
    ));
    output.push_str(&format!(
        "  Taps: {} ({} refused for energy)\n",
        result.taps, result.energy_starved
    ));
    output.push_str(&format!(
        "  Chests opened: {}  Items sold: {}  Gates completed: {}\n\n",
        result.chests_opened, result.items_sold, result.gates_completed
    ));
    output.push_str(&format!(
        "  Final: level {}, {} coins, {} gems, {} energy, {} items on board\n",
        result.level, result.coins, result.gems, result.energy, result.items_on_board
    ));

    output
}

/// Format simulation stats as human-readable text.
pub(super) fn format_sim_text(stats: &SimStats) -> String {
    if let Some(result) = &stats.single
        && stats.failures == 0
    {
        return format_single(result);
    }

    let mut output = String::new();

    output.push_str(&format!(
        "Simulation Results ({} games)\n",
        stats.games_played
    ));
    output.push_str("========================================\n\n");

    output.push_str("Per-game averages:\n");
    output.push_str(&format!("  Merges:          {:.1}\n", stats.avg(stats.total_merges)));
    output.push_str(&format!("  Taps:            {:.1}\n", stats.avg(stats.total_taps)));
    output.push_str(&format!(
        "  Energy-starved:  {:.1}\n",
        stats.avg(stats.total_energy_starved)
    ));
    output.push_str(&format!("  Chests opened:   {:.1}\n", stats.avg(stats.total_chests)));
    output.push_str(&format!("  Items sold:      {:.1}\n", stats.avg(stats.total_sold)));
    output.push_str(&format!("  Gates completed: {:.1}\n", stats.avg(stats.total_gates)));
    output.push_str(&format!("  Idle steps:      {:.1}\n", stats.avg(stats.total_idle)));
    output.push_str(&format!("  Coins:           {:.1}\n\n", stats.avg(stats.total_coins)));

    output.push_str(&format!(
        "Final level: {:.2} avg (min {}, max {})\n",
        stats.avg(stats.total_levels),
        stats.min_level.unwrap_or(0),
        stats.max_level
    ));
    if stats.failures > 0 {
        output.push_str(&format!("Failed games: {}\n", stats.failures));
    }

    output
}
