//! Greedy auto-player for balancing and benchmarks.
//!
//! Provides a pure function interface: `(seed, catalog, config) -> SimulationResult`.
//! The same inputs always give the same result: time comes from a
//! [`ManualClock`] and randomness from a seeded [`StdRng`].
//!
//! Each step the player does the first thing that applies:
//! 1. complete a ready gate
//! 2. merge the first mergeable pair (row-major)
//! 3. open a chest
//! 4. tap a ready generator
//! 5. sell a max-tier item when the board is full
//! 6. wait: advance the clock and regenerate energy

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::clock::{ManualClock, Timestamp};
use crate::config::GameConfig;
use crate::game::{
    Category, ChestOutcome, GateOutcome, GateStatus, GeneratorStatus, ItemCatalog, ItemId,
    ItemTypeId, MergeOutcome, ProduceOutcome, SaleOutcome, assert_invariants,
};
use crate::session::{GameSession, SessionError};

/// Simulation start time (2024-01-01T00:00:00Z).
pub const SIM_EPOCH: Timestamp = 1_704_067_200_000;

/// Auto-player settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimConfig {
    /// Number of steps to play.
    pub steps: u32,
    /// Clock advance for a waiting step.
    pub idle_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            steps: 1_000,
            idle_ms: 30_000,
        }
    }
}

/// Outcome of one simulated game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SimulationResult {
    /// The seed used.
    pub seed: u64,
    /// Steps played.
    pub steps: u32,
    /// Successful merges.
    pub merges: u32,
    /// Merges that absorbed a third item.
    pub absorptions: u32,
    /// Successful generator taps.
    pub taps: u32,
    /// Taps rejected for lack of energy.
    pub energy_starved: u32,
    /// Chests opened.
    pub chests_opened: u32,
    /// Items sold.
    pub items_sold: u32,
    /// Gates completed.
    pub gates_completed: u32,
    /// Waiting steps.
    pub idle_steps: u32,
    /// Final level.
    pub level: u32,
    /// Final coins.
    pub coins: u64,
    /// Final gems.
    pub gems: u64,
    /// Final energy.
    pub energy: u64,
    /// Items on the board at the end.
    pub items_on_board: u32,
    /// Simulated time elapsed.
    pub elapsed_ms: u64,
}

type SimSession = GameSession<ManualClock, StdRng>;

/// Play one game with the greedy auto-player.
///
/// Debug builds check the engine invariants after every step.
///
/// # Errors
///
/// Returns [`SessionError`] if the session cannot start, or if an action
/// hits a catalog fault.
pub fn run_simulation(
    seed: u64,
    catalog: &ItemCatalog,
    config: &GameConfig,
    sim: SimConfig,
) -> Result<SimulationResult, SessionError> {
    let mut session = GameSession::new(
        catalog.clone(),
        config.clone(),
        ManualClock::new(SIM_EPOCH),
        StdRng::seed_from_u64(seed),
    )?;
    let mut result = SimulationResult {
        seed,
        ..SimulationResult::default()
    };

    for _ in 0..sim.steps {
        step(&mut session, &mut result, sim)?;
        assert_invariants(session.board(), session.catalog(), session.economy());
        result.steps += 1;
    }

    let economy = session.economy();
    result.level = economy.level();
    result.coins = economy.coins();
    result.gems = economy.gems();
    result.energy = economy.energy();
    result.items_on_board = u32::try_from(session.board().len()).unwrap_or(u32::MAX);
    result.elapsed_ms = session.now().saturating_sub(SIM_EPOCH);

    tracing::debug!(
        seed,
        merges = result.merges,
        taps = result.taps,
        level = result.level,
        "simulation finished"
    );
    Ok(result)
}

fn step(
    session: &mut SimSession,
    result: &mut SimulationResult,
    sim: SimConfig,
) -> Result<(), SessionError> {
    if let Some(gate_id) = ready_gate(session)?
        && let GateOutcome::Completed { .. } = session.complete_gate(&gate_id)?
    {
        result.gates_completed += 1;
        return Ok(());
    }

    if let Some((source, target)) = mergeable_pair(session)
        && let MergeOutcome::Merged(report) = session.try_merge(source, target)?
    {
        result.merges += 1;
        if report.absorbed.is_some() {
            result.absorptions += 1;
        }
        return Ok(());
    }

    for chest in items_in(session, Category::Chest) {
        if let ChestOutcome::Opened(_) = session.open_chest(chest)? {
            result.chests_opened += 1;
            return Ok(());
        }
    }

    for generator in items_in(session, Category::Generator) {
        if session.generator_status(generator)? != Some(GeneratorStatus::Ready) {
            continue;
        }
        match session.tap(generator)? {
            ProduceOutcome::Produced(_) => {
                result.taps += 1;
                return Ok(());
            }
            ProduceOutcome::InsufficientEnergy { .. } => {
                result.energy_starved += 1;
                break;
            }
            _ => {}
        }
    }

    if session.board().is_full()
        && let Some(item) = sellable(session)
        && let SaleOutcome::Sold { .. } = session.sell(item)?
    {
        result.items_sold += 1;
        return Ok(());
    }

    session.clock().advance(sim.idle_ms);
    session.regenerate_energy();
    result.idle_steps += 1;
    Ok(())
}

fn ready_gate(session: &SimSession) -> Result<Option<String>, SessionError> {
    for gate in &session.config().gates {
        if session.check_gate(&gate.id)? == GateStatus::Ready {
            return Ok(Some(gate.id.clone()));
        }
    }
    Ok(None)
}

/// First two items of the same mergeable type, in row-major order.
fn mergeable_pair(session: &SimSession) -> Option<(ItemId, ItemId)> {
    let catalog = session.catalog();
    let mut first_of: BTreeMap<&ItemTypeId, ItemId> = BTreeMap::new();
    for item in session.board().iter_row_major() {
        let Some(def) = catalog.get(&item.item_type) else {
            continue;
        };
        if def.is_max_tier() || def.is_fixed_blocker() {
            continue;
        }
        if let Some(&source) = first_of.get(&item.item_type) {
            return Some((source, item.id));
        }
        first_of.insert(&item.item_type, item.id);
    }
    None
}

fn items_in(session: &SimSession, category: Category) -> Vec<ItemId> {
    let catalog = session.catalog();
    session
        .board()
        .iter_row_major()
        .filter(|item| {
            catalog
                .get(&item.item_type)
                .is_some_and(|def| def.category == category)
        })
        .map(|item| item.id)
        .collect()
}

/// Cheapest max-tier item that is not a generator or blocker.
fn sellable(session: &SimSession) -> Option<ItemId> {
    let catalog = session.catalog();
    session
        .board()
        .iter_row_major()
        .filter_map(|item| catalog.get(&item.item_type).map(|def| (item, def)))
        .filter(|(_, def)| {
            def.is_max_tier()
                && !matches!(def.category, Category::Generator | Category::Blocker)
        })
        .min_by_key(|(_, def)| def.coin_value)
        .map(|(item, _)| item.id)
}
