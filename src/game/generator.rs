//! Generator subsystem.
//!
//! Each generator instance moves through
//! `Ready -> (tap) -> CoolingDown -> Ready ... -> Depleted`.
//! Charges only go down; the only way back to a full generator is merging
//! two of them into the next tier, which creates a fresh instance.
//! Cooldowns are evaluated lazily on the next tap; nothing is scheduled.

use rand::Rng;

use crate::clock::Timestamp;
use crate::error::{EngineError, EngineResult};
use crate::game::{
    Board, Coord, Economy, GeneratorState, ItemCatalog, ItemId, ItemTypeId, Resource,
};

/// Where a generator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorStatus {
    /// Can produce now (energy and board space permitting).
    Ready,
    /// Tapped too recently.
    CoolingDown {
        /// Time until the next tap is allowed.
        remaining_ms: u64,
    },
    /// No charges left.
    Depleted,
}

/// Details of a successful tap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    /// The new item.
    pub item: ItemId,
    /// Its type.
    pub item_type: ItemTypeId,
    /// Where it was placed.
    pub at: Coord,
    /// Charges left on the generator.
    pub charges_left: u32,
    /// Energy paid.
    pub energy_spent: u64,
}

/// Result of tapping a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProduceOutcome {
    /// An item was produced.
    Produced(Production),
    /// The generator is depleted.
    NoCharges,
    /// The generator was tapped too recently.
    OnCooldown {
        /// Time until the next tap is allowed.
        remaining_ms: u64,
    },
    /// Not enough energy for one use.
    InsufficientEnergy {
        /// Energy one use costs.
        needed: u64,
        /// Energy available.
        available: u64,
    },
    /// No empty cell for the product.
    BoardFull,
    /// The tapped item does not produce anything.
    NotAGenerator,
}

impl ProduceOutcome {
    /// Check if an item was produced.
    #[must_use]
    pub const fn is_produced(&self) -> bool {
        matches!(self, Self::Produced(_))
    }
}

/// Current lifecycle state of a generator, or None for other items.
///
/// # Errors
///
/// - [`EngineError::UnknownItem`] if the id is not on the board.
/// - [`EngineError::UnknownItemType`] if its type is missing from the catalog.
pub fn generator_status(
    board: &Board,
    catalog: &ItemCatalog,
    id: ItemId,
    now: Timestamp,
) -> EngineResult<Option<GeneratorStatus>> {
    let item = board.item(id).ok_or(EngineError::UnknownItem(id))?;
    let def = catalog.lookup(&item.item_type)?;
    let Some(spec) = &def.generator else {
        return Ok(None);
    };

    let state = item
        .generator
        .unwrap_or_else(|| GeneratorState::fresh(spec.max_charges));
    Ok(Some(status_of(state, spec.cooldown_ms, now)))
}

fn status_of(state: GeneratorState, cooldown_ms: u64, now: Timestamp) -> GeneratorStatus {
    if state.charges == 0 {
        return GeneratorStatus::Depleted;
    }
    // First use is never on cooldown.
    match state.last_produced_at {
        Some(last) => {
            let elapsed = now.saturating_sub(last);
            if elapsed < cooldown_ms {
                GeneratorStatus::CoolingDown {
                    remaining_ms: cooldown_ms - elapsed,
                }
            } else {
                GeneratorStatus::Ready
            }
        }
        None => GeneratorStatus::Ready,
    }
}

/// Tap a generator.
///
/// Checks run in order: charges, cooldown, energy, board space. Only when
/// all pass is energy deducted, one item drawn uniformly from the produce
/// pool placed at the first empty cell, a charge consumed and the
/// production time recorded. Every rejection leaves board and economy
/// untouched.
///
/// # Errors
///
/// - [`EngineError::UnknownItem`] if the id is not on the board.
/// - [`EngineError::UnknownItemType`] if the generator or product type is
///   missing from the catalog.
/// - [`EngineError::Grid`] if the board has no item ids left. Energy and
///   charges are untouched.
pub fn tap<R: Rng>(
    board: &mut Board,
    catalog: &ItemCatalog,
    economy: &mut Economy,
    rng: &mut R,
    id: ItemId,
    now: Timestamp,
) -> EngineResult<ProduceOutcome> {
    let item = board.item(id).ok_or(EngineError::UnknownItem(id))?;
    let def = catalog.lookup(&item.item_type)?;
    let Some(spec) = &def.generator else {
        return Ok(ProduceOutcome::NotAGenerator);
    };
    if spec.produces_pool.is_empty() {
        tracing::error!(item_type = %def.id, "generator with empty produce pool");
        return Ok(ProduceOutcome::NotAGenerator);
    }

    let state = item
        .generator
        .unwrap_or_else(|| GeneratorState::fresh(spec.max_charges));

    match status_of(state, spec.cooldown_ms, now) {
        GeneratorStatus::Depleted => return Ok(ProduceOutcome::NoCharges),
        GeneratorStatus::CoolingDown { remaining_ms } => {
            return Ok(ProduceOutcome::OnCooldown { remaining_ms });
        }
        GeneratorStatus::Ready => {}
    }

    let cost = u64::from(spec.energy_cost_per_use);
    if economy.energy() < cost {
        return Ok(ProduceOutcome::InsufficientEnergy {
            needed: cost,
            available: economy.energy(),
        });
    }

    let Some(at) = board.find_first_empty_cell() else {
        return Ok(ProduceOutcome::BoardFull);
    };

    let produced_type = spec.produces_pool[rng.random_range(0..spec.produces_pool.len())].clone();
    let produced_def = catalog.lookup(&produced_type)?;
    let produced_state = produced_def
        .generator
        .as_ref()
        .map(|s| GeneratorState::fresh(s.max_charges));

    // All checks passed. The spawn is the only fallible part, so it goes
    // first.
    let produced = board.spawn(produced_type.clone(), at, produced_state)?;
    if !economy.spend(Resource::Energy, cost) {
        board.remove(produced);
        return Ok(ProduceOutcome::InsufficientEnergy {
            needed: cost,
            available: economy.energy(),
        });
    }
    let charges_left = state.charges - 1;
    board.set_generator_state(
        id,
        GeneratorState {
            charges: charges_left,
            last_produced_at: Some(now),
        },
    );

    tracing::debug!(
        generator = %id,
        produced = %produced,
        item_type = %produced_type,
        at = %at,
        charges_left,
        "generator produced"
    );

    Ok(ProduceOutcome::Produced(Production {
        item: produced,
        item_type: produced_type,
        at,
        charges_left,
        energy_spent: cost,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        BoardItem, Category, EconomyConfig, GeneratorSpec, GridConfig, GridError, ItemDefinition,
    };
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const COOLDOWN: u64 = 60_000;

    fn plain(id: &str) -> ItemDefinition {
        ItemDefinition {
            id: ItemTypeId::new(id),
            tier: 1,
            category: Category::ConsumablePlant,
            merge_target: None,
            generator: None,
            chest: None,
            coin_value: 1,
            xp_value: 1,
            clears_on_merge: false,
        }
    }

    fn catalog() -> ItemCatalog {
        let mut basket = plain("basket_1");
        basket.category = Category::Generator;
        basket.generator = Some(GeneratorSpec {
            produces_pool: vec![ItemTypeId::new("flower_1"), ItemTypeId::new("berry_1")],
            cooldown_ms: COOLDOWN,
            max_charges: 3,
            energy_cost_per_use: 5,
        });
        ItemCatalog::from_definitions(vec![basket, plain("flower_1"), plain("berry_1")]).unwrap()
    }

    struct Fixture {
        board: Board,
        catalog: ItemCatalog,
        economy: Economy,
        rng: StdRng,
        generator: ItemId,
    }

    fn fixture(rows: u16, cols: u16) -> Fixture {
        let mut board = Board::new(GridConfig::new(rows, cols)).unwrap();
        let generator = board
            .spawn(
                ItemTypeId::new("basket_1"),
                Coord::new(0, 0),
                Some(GeneratorState::fresh(3)),
            )
            .unwrap();
        Fixture {
            board,
            catalog: catalog(),
            economy: Economy::new(EconomyConfig::default(), 0),
            rng: StdRng::seed_from_u64(7),
            generator,
        }
    }

    impl Fixture {
        fn tap(&mut self, now: Timestamp) -> ProduceOutcome {
            tap(
                &mut self.board,
                &self.catalog,
                &mut self.economy,
                &mut self.rng,
                self.generator,
                now,
            )
            .unwrap()
        }

        fn charges(&self) -> u32 {
            self.board.item(self.generator).unwrap().generator.unwrap().charges
        }
    }

    #[test]
    fn test_first_tap_produces() {
        let mut f = fixture(3, 3);
        let ProduceOutcome::Produced(p) = f.tap(1_000) else {
            panic!("expected production");
        };

        assert_eq!(p.at, Coord::new(1, 0));
        assert_eq!(p.charges_left, 2);
        assert_eq!(p.energy_spent, 5);
        assert!(["flower_1", "berry_1"].contains(&p.item_type.as_str()));
        assert_eq!(f.board.len(), 2);
        assert_eq!(f.economy.energy(), 95);
        assert_eq!(f.charges(), 2);
    }

    #[test]
    fn test_cooldown_blocks_second_tap() {
        let mut f = fixture(3, 3);
        assert!(f.tap(1_000).is_produced());

        let outcome = f.tap(1_000 + COOLDOWN - 1);
        assert_eq!(outcome, ProduceOutcome::OnCooldown { remaining_ms: 1 });
        assert_eq!(f.board.len(), 2);
        assert_eq!(f.charges(), 2);
        assert_eq!(f.economy.energy(), 95);

        assert!(f.tap(1_000 + COOLDOWN).is_produced());
    }

    #[test]
    fn test_depletion_after_max_charges() {
        let mut f = fixture(4, 4);
        for i in 0..3 {
            assert!(f.tap(i * COOLDOWN).is_produced());
        }
        assert_eq!(f.tap(100 * COOLDOWN), ProduceOutcome::NoCharges);
        assert_eq!(f.tap(u64::MAX), ProduceOutcome::NoCharges);
        assert_eq!(f.board.len(), 4);
    }

    #[test]
    fn test_insufficient_energy_is_atomic() {
        let mut f = fixture(3, 3);
        f.economy.spend(Resource::Energy, 97);

        let outcome = f.tap(0);
        assert_eq!(
            outcome,
            ProduceOutcome::InsufficientEnergy {
                needed: 5,
                available: 3
            }
        );
        assert_eq!(f.charges(), 3);
        assert_eq!(f.board.len(), 1);
        assert_eq!(f.economy.energy(), 3);
        assert_eq!(
            generator_status(&f.board, &f.catalog, f.generator, 0).unwrap(),
            Some(GeneratorStatus::Ready)
        );
    }

    #[test]
    fn test_board_full() {
        let mut f = fixture(1, 1);
        assert_eq!(f.tap(0), ProduceOutcome::BoardFull);
        assert_eq!(f.charges(), 3);
        assert_eq!(f.economy.energy(), 100);
    }

    #[test]
    fn test_not_a_generator() {
        let mut f = fixture(3, 3);
        let flower = f
            .board
            .spawn(ItemTypeId::new("flower_1"), Coord::new(2, 2), None)
            .unwrap();
        let outcome = tap(
            &mut f.board,
            &f.catalog,
            &mut f.economy,
            &mut f.rng,
            flower,
            0,
        )
        .unwrap();
        assert_eq!(outcome, ProduceOutcome::NotAGenerator);
        assert_eq!(
            generator_status(&f.board, &f.catalog, flower, 0).unwrap(),
            None
        );
    }

    #[test]
    fn test_missing_state_treated_as_fresh() {
        let mut f = fixture(3, 3);
        let bare = f
            .board
            .spawn(ItemTypeId::new("basket_1"), Coord::new(2, 2), None)
            .unwrap();
        let outcome = tap(&mut f.board, &f.catalog, &mut f.economy, &mut f.rng, bare, 0).unwrap();
        assert!(outcome.is_produced());
        assert_eq!(f.board.item(bare).unwrap().generator.unwrap().charges, 2);
    }

    #[test]
    fn test_status_lifecycle() {
        let mut f = fixture(4, 4);
        let status = |f: &Fixture, now| generator_status(&f.board, &f.catalog, f.generator, now).unwrap();

        assert_eq!(status(&f, 0), Some(GeneratorStatus::Ready));
        f.tap(0);
        assert_eq!(
            status(&f, 10_000),
            Some(GeneratorStatus::CoolingDown {
                remaining_ms: COOLDOWN - 10_000
            })
        );
        f.tap(COOLDOWN);
        f.tap(2 * COOLDOWN);
        assert_eq!(status(&f, 10 * COOLDOWN), Some(GeneratorStatus::Depleted));
    }

    #[test]
    fn test_same_seed_same_output() {
        let mut a = fixture(5, 5);
        let mut b = fixture(5, 5);
        for i in 0..3 {
            assert_eq!(a.tap(i * COOLDOWN), b.tap(i * COOLDOWN));
        }
    }

    #[test]
    fn test_tap_without_ids_left_keeps_energy_and_charges() {
        let mut f = fixture(3, 3);
        f.board
            .place(BoardItem {
                id: ItemId(u64::MAX - 1),
                item_type: ItemTypeId::new("flower_1"),
                position: Coord::new(2, 2),
                generator: None,
            })
            .unwrap();

        let err = tap(
            &mut f.board,
            &f.catalog,
            &mut f.economy,
            &mut f.rng,
            f.generator,
            1_000,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Grid(GridError::IdsExhausted(ItemId(u64::MAX)))
        ));
        assert_eq!(f.economy.energy(), 100);
        assert_eq!(f.charges(), 3);
        assert_eq!(f.board.len(), 2);
    }
}
