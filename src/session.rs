//! A player session: board, economy and gate progress driven by one clock
//! and one random source.
//!
//! Every method is one atomic gameplay step. Time is read from the
//! session's [`Clock`] at the start of the step; randomness comes from the
//! session's RNG.

use rand::Rng;
use rand::rngs::StdRng;
use thiserror::Error;

use crate::clock::{Clock, SystemClock, Timestamp};
use crate::config::{ConfigError, GameConfig, ResizePolicy};
use crate::error::{EngineError, EngineResult};
use crate::game::{
    self, Board, BoardItem, ChestOutcome, Coord, Economy, GateOutcome, GateProgress, GateStatus,
    GeneratorState, GeneratorStatus, GridError, InvariantViolation, ItemCatalog, ItemId,
    ItemTypeId, LevelUpReport, MergeOutcome, MergeReport, ProduceOutcome, PurchaseOutcome,
    Resource, SaleOutcome,
};
use crate::snapshot::{SNAPSHOT_VERSION, Snapshot, SnapshotError};

/// Failure to start or restore a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The game config is invalid for this catalog.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The snapshot cannot be used.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    /// Board content is inconsistent with the catalog or grid.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Result of dropping an item on a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// The cell was empty (or the item's own); the item moved there.
    Moved {
        /// Previous cell.
        from: Coord,
        /// New cell.
        to: Coord,
    },
    /// The cell held a matching item and the two merged.
    Merged(MergeReport),
    /// The cell held an item that does not merge with this one. Nothing
    /// changed.
    Rejected(MergeOutcome),
}

/// One player's game.
#[derive(Debug)]
pub struct GameSession<C: Clock = SystemClock, R: Rng = StdRng> {
    catalog: ItemCatalog,
    config: GameConfig,
    board: Board,
    economy: Economy,
    progress: GateProgress,
    clock: C,
    rng: R,
}

impl<C: Clock, R: Rng> GameSession<C, R> {
    /// Start a new game: empty wallets plus starting resources, full
    /// energy and the configured initial board.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Config`] if the config does not validate against
    ///   the catalog.
    /// - [`SessionError::Engine`] if an initial placement is rejected.
    pub fn new(
        catalog: ItemCatalog,
        config: GameConfig,
        clock: C,
        rng: R,
    ) -> Result<Self, SessionError> {
        config.validate(&catalog)?;
        let now = clock.now();

        let mut board = Board::new(config.grid).map_err(EngineError::from)?;
        for placement in &config.initial_board {
            let generator = fresh_generator_state(&catalog, &placement.item_type)?;
            board
                .spawn(placement.item_type.clone(), placement.at, generator)
                .map_err(EngineError::from)?;
        }

        let mut economy = Economy::new(config.economy, now);
        economy.grant(Resource::Coins, config.start.coins);
        economy.grant(Resource::Gems, config.start.gems);

        tracing::debug!(
            items = board.len(),
            rows = config.grid.rows,
            cols = config.grid.cols,
            "new session"
        );

        Ok(Self {
            catalog,
            config,
            board,
            economy,
            progress: GateProgress::new(),
            clock,
            rng,
        })
    }

    /// Resume from a snapshot.
    ///
    /// Items are checked against the catalog. Generator state is repaired
    /// where it disagrees with the item's definition: missing state gets
    /// full charges, excess charges are capped, stray state on
    /// non-generators is dropped. If the saved grid differs from the
    /// configured one, the config's [`ResizePolicy`] decides. Offline
    /// energy is credited immediately from the saved timestamp.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Config`] if the config is invalid.
    /// - [`SessionError::Snapshot`] for an unsupported version.
    /// - [`SessionError::Engine`] for unknown item types, overlapping or
    ///   out-of-bounds items, or a grid change the policy cannot absorb.
    pub fn restore(
        snapshot: Snapshot,
        catalog: ItemCatalog,
        config: GameConfig,
        clock: C,
        rng: R,
    ) -> Result<Self, SessionError> {
        config.validate(&catalog)?;
        snapshot.check_version()?;

        let mut board = Board::new(snapshot.grid).map_err(EngineError::from)?;
        for mut item in snapshot.items {
            item.generator = repair_generator_state(&catalog, &item)?;
            board.place(item).map_err(EngineError::from)?;
        }
        board.reserve_ids_from(snapshot.next_item_id);

        if snapshot.grid != config.grid {
            match config.grid_migration {
                ResizePolicy::Reject => board.resize(config.grid).map_err(EngineError::from)?,
                ResizePolicy::Relocate => {
                    let moves = board
                        .resize_relocating(config.grid)
                        .map_err(EngineError::from)?;
                    for (item, from, to) in moves {
                        tracing::warn!(%item, %from, %to, "item relocated by grid change");
                    }
                }
            }
        }

        let mut economy = Economy::from_state(config.economy, snapshot.economy);
        let now = clock.now();
        let credited = economy.regenerate_energy(now);
        tracing::debug!(items = board.len(), credited, "session restored");

        Ok(Self {
            catalog,
            config,
            board,
            economy,
            progress: snapshot.completed_gates,
            clock,
            rng,
        })
    }

    /// Capture the current state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            grid: self.board.config(),
            next_item_id: self.board.next_id(),
            items: self.board.iter().cloned().collect(),
            economy: *self.economy.state(),
            completed_gates: self.progress.clone(),
        }
    }

    /// The item catalog.
    #[must_use]
    pub const fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    /// The game config.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The board.
    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// The economy.
    #[must_use]
    pub const fn economy(&self) -> &Economy {
        &self.economy
    }

    /// Gate completions.
    #[must_use]
    pub const fn progress(&self) -> &GateProgress {
        &self.progress
    }

    /// The session clock.
    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Current time from the session clock.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Item occupying a cell.
    #[must_use]
    pub fn item_at(&self, coord: Coord) -> Option<&BoardItem> {
        self.board.item_at(coord)
    }

    /// First empty cell in row-major order.
    #[must_use]
    pub fn find_first_empty_cell(&self) -> Option<Coord> {
        self.board.find_first_empty_cell()
    }

    /// Place a new item of `item_type` at `at`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::UnknownItemType`] if the type is not in the catalog.
    /// - [`EngineError::Grid`] if the cell is taken or out of bounds.
    pub fn place(&mut self, item_type: &ItemTypeId, at: Coord) -> EngineResult<ItemId> {
        let generator = fresh_generator_state(&self.catalog, item_type)?;
        Ok(self.board.spawn(item_type.clone(), at, generator)?)
    }

    /// Move an item to an empty cell.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Grid`] if the move is rejected.
    pub fn move_item(&mut self, id: ItemId, to: Coord) -> EngineResult<()> {
        Ok(self.board.move_item(id, to)?)
    }

    /// Remove an item. Absent ids are a reported no-op.
    pub fn remove(&mut self, id: ItemId) -> Option<BoardItem> {
        self.board.remove(id)
    }

    /// Merge `source` into `target`.
    ///
    /// # Errors
    ///
    /// See [`game::try_merge`].
    pub fn try_merge(&mut self, source: ItemId, target: ItemId) -> EngineResult<MergeOutcome> {
        game::try_merge(
            &mut self.board,
            &self.catalog,
            &mut self.economy,
            source,
            target,
        )
    }

    /// Merge the item at `from` into the item at `to`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyCell`] if either cell is empty, otherwise
    /// see [`game::try_merge`].
    pub fn try_merge_at(&mut self, from: Coord, to: Coord) -> EngineResult<MergeOutcome> {
        let source = self.occupant(from)?;
        let target = self.occupant(to)?;
        self.try_merge(source, target)
    }

    /// Drop an item on a cell: move onto an empty cell, merge onto a
    /// matching item, otherwise leave everything in place.
    ///
    /// # Errors
    ///
    /// - [`EngineError::UnknownItem`] if the id is not on the board.
    /// - [`EngineError::Grid`] if `to` is out of bounds.
    pub fn drop_item(&mut self, id: ItemId, to: Coord) -> EngineResult<DropOutcome> {
        let from = self
            .board
            .item(id)
            .ok_or(EngineError::UnknownItem(id))?
            .position;
        if !self.board.in_bounds(to) {
            return Err(GridError::OutOfBounds { coord: to }.into());
        }

        match self.board.item_at(to).map(|item| item.id) {
            Some(target) if target != id => match self.try_merge(id, target)? {
                MergeOutcome::Merged(report) => Ok(DropOutcome::Merged(report)),
                rejected => Ok(DropOutcome::Rejected(rejected)),
            },
            _ => {
                self.board.move_item(id, to)?;
                Ok(DropOutcome::Moved { from, to })
            }
        }
    }

    /// Tap a generator.
    ///
    /// # Errors
    ///
    /// See [`game::tap`].
    pub fn tap(&mut self, id: ItemId) -> EngineResult<ProduceOutcome> {
        let now = self.clock.now();
        game::tap(
            &mut self.board,
            &self.catalog,
            &mut self.economy,
            &mut self.rng,
            id,
            now,
        )
    }

    /// Lifecycle state of a generator, or None for other items.
    ///
    /// # Errors
    ///
    /// See [`game::generator_status`].
    pub fn generator_status(&self, id: ItemId) -> EngineResult<Option<GeneratorStatus>> {
        game::generator_status(&self.board, &self.catalog, id, self.clock.now())
    }

    /// Open a chest.
    ///
    /// # Errors
    ///
    /// See [`game::open_chest`].
    pub fn open_chest(&mut self, id: ItemId) -> EngineResult<ChestOutcome> {
        game::open_chest(
            &mut self.board,
            &self.catalog,
            &mut self.economy,
            &mut self.rng,
            id,
        )
    }

    /// Sell an item.
    ///
    /// # Errors
    ///
    /// See [`game::sell`].
    pub fn sell(&mut self, id: ItemId) -> EngineResult<SaleOutcome> {
        game::sell(&mut self.board, &self.catalog, &mut self.economy, id)
    }

    /// Buy the shop offer at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownOffer`] for an index past the shop,
    /// otherwise see [`game::purchase`].
    pub fn purchase(&mut self, index: usize) -> EngineResult<PurchaseOutcome> {
        let offer = self
            .config
            .shop
            .get(index)
            .ok_or(EngineError::UnknownOffer(index))?;
        game::purchase(&mut self.board, &self.catalog, &mut self.economy, offer)
    }

    /// Spend a resource if affordable.
    pub fn spend(&mut self, resource: Resource, amount: u64) -> bool {
        self.economy.spend(resource, amount)
    }

    /// Credit a resource. Returns the amount credited.
    pub fn grant(&mut self, resource: Resource, amount: u64) -> u64 {
        self.economy.grant(resource, amount)
    }

    /// Add XP, applying level-ups.
    pub fn add_xp(&mut self, amount: u64) -> LevelUpReport {
        self.economy.add_xp(amount)
    }

    /// Credit energy for time elapsed on the session clock.
    pub fn regenerate_energy(&mut self) -> u64 {
        let now = self.clock.now();
        self.economy.regenerate_energy(now)
    }

    /// Time until the next energy tick, or None when energy is full.
    #[must_use]
    pub fn time_to_next_energy(&self) -> Option<u64> {
        self.economy.time_to_next_energy(self.clock.now())
    }

    /// Check a configured gate.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownGate`] for an unconfigured id,
    /// otherwise see [`game::check_gate`].
    pub fn check_gate(&self, gate_id: &str) -> EngineResult<GateStatus> {
        let gate = self
            .config
            .gate(gate_id)
            .ok_or_else(|| EngineError::UnknownGate(gate_id.to_owned()))?;
        game::check_gate(&self.board, &self.catalog, &self.economy, &self.progress, gate)
    }

    /// Complete a configured gate.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownGate`] for an unconfigured id,
    /// otherwise see [`game::complete_gate`].
    pub fn complete_gate(&mut self, gate_id: &str) -> EngineResult<GateOutcome> {
        let gate = self
            .config
            .gate(gate_id)
            .ok_or_else(|| EngineError::UnknownGate(gate_id.to_owned()))?;
        game::complete_gate(
            &mut self.board,
            &self.catalog,
            &mut self.economy,
            &mut self.progress,
            gate,
        )
    }

    /// Run the engine invariant checks on the current state.
    #[must_use]
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        game::check_invariants(&self.board, &self.catalog, &self.economy)
    }

    fn occupant(&self, at: Coord) -> EngineResult<ItemId> {
        self.board
            .item_at(at)
            .map(|item| item.id)
            .ok_or(EngineError::EmptyCell(at))
    }
}

/// Fresh production state for generator types, None otherwise.
fn fresh_generator_state(
    catalog: &ItemCatalog,
    item_type: &ItemTypeId,
) -> EngineResult<Option<GeneratorState>> {
    Ok(catalog
        .lookup(item_type)?
        .generator
        .as_ref()
        .map(|spec| GeneratorState::fresh(spec.max_charges)))
}

/// Generator state of a restored item, brought in line with its definition.
fn repair_generator_state(
    catalog: &ItemCatalog,
    item: &BoardItem,
) -> EngineResult<Option<GeneratorState>> {
    let def = catalog.lookup(&item.item_type)?;
    let repaired = match (&def.generator, item.generator) {
        (Some(spec), None) => {
            tracing::warn!(item = %item.id, "generator restored without state, refilling");
            Some(GeneratorState::fresh(spec.max_charges))
        }
        (Some(spec), Some(mut state)) => {
            if state.charges > spec.max_charges {
                tracing::warn!(
                    item = %item.id,
                    charges = state.charges,
                    max = spec.max_charges,
                    "restored charges above max, capping"
                );
                state.charges = spec.max_charges;
            }
            Some(state)
        }
        (None, Some(_)) => {
            tracing::warn!(item = %item.id, "dropping generator state from non-generator");
            None
        }
        (None, None) => None,
    };
    Ok(repaired)
}
