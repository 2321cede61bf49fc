//! Engine invariants - sanity checks that detect bugs.
//!
//! No sequence of public operations should ever trigger these. If one does,
//! a board or economy operation left inconsistent state behind.

use crate::game::{Board, Economy, ItemCatalog};

/// Invariant violation error.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

fn violation(message: String) -> InvariantViolation {
    InvariantViolation { message }
}

/// Check all engine invariants.
///
/// Returns a list of violations found, or empty if all invariants hold.
#[must_use]
pub fn check_invariants(
    board: &Board,
    catalog: &ItemCatalog,
    economy: &Economy,
) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    // Cell index and item positions must agree in both directions.
    let mut indexed = 0usize;
    for (coord, occupant) in board.cells() {
        let Some(id) = occupant else { continue };
        indexed += 1;
        match board.item(id) {
            None => violations.push(violation(format!(
                "Cell {coord} points at missing item {id}"
            ))),
            Some(item) if item.position != coord => violations.push(violation(format!(
                "Cell {coord} holds {id} but the item says {}",
                item.position
            ))),
            Some(_) => {}
        }
    }
    if indexed != board.len() {
        violations.push(violation(format!(
            "{} items on the board but {indexed} occupied cells",
            board.len()
        )));
    }

    for item in board.iter() {
        let in_bounds = board.in_bounds(item.position);
        if !in_bounds {
            violations.push(violation(format!(
                "Item {} at {} is outside the {}x{} grid",
                item.id,
                item.position,
                board.width(),
                board.height()
            )));
        }
        if in_bounds && board.item_at(item.position).map(|other| other.id) != Some(item.id) {
            violations.push(violation(format!(
                "Item {} at {} does not own its cell",
                item.id, item.position
            )));
        }

        let Some(def) = catalog.get(&item.item_type) else {
            violations.push(violation(format!(
                "Item {} has unknown type `{}`",
                item.id, item.item_type
            )));
            continue;
        };
        match (&def.generator, &item.generator) {
            (Some(spec), Some(state)) if state.charges > spec.max_charges => {
                violations.push(violation(format!(
                    "Generator {} has {} charges > max {}",
                    item.id, state.charges, spec.max_charges
                )));
            }
            (Some(_), None) => violations.push(violation(format!(
                "Generator {} has no generator state",
                item.id
            ))),
            (None, Some(_)) => violations.push(violation(format!(
                "Non-generator {} carries generator state",
                item.id
            ))),
            _ => {}
        }
        if item.id.0 >= board.next_id() {
            violations.push(violation(format!(
                "Item {} not below next id {}",
                item.id,
                board.next_id()
            )));
        }
    }

    if economy.energy() > economy.max_energy() {
        violations.push(violation(format!(
            "Energy {} exceeds max {}",
            economy.energy(),
            economy.max_energy()
        )));
    }
    if economy.level() == 0 {
        violations.push(violation("Level is 0".to_owned()));
    }

    violations
}

/// Assert all engine invariants hold, panicking if any are violated.
///
/// Only active in debug builds. No-op in release builds.
///
/// # Panics
///
/// Panics with detailed message if any invariant is violated.
#[cfg(debug_assertions)]
pub fn assert_invariants(board: &Board, catalog: &ItemCatalog, economy: &Economy) {
    let violations = check_invariants(board, catalog, economy);
    if !violations.is_empty() {
        let messages: Vec<_> = violations.iter().map(|v| v.message.as_str()).collect();
        panic!("Engine invariant violations:\n  - {}", messages.join("\n  - "));
    }
}

/// No-op in release builds.
#[cfg(not(debug_assertions))]
pub fn assert_invariants(_board: &Board, _catalog: &ItemCatalog, _economy: &Economy) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        Category, Coord, EconomyConfig, EconomyState, GeneratorSpec, GeneratorState, GridConfig,
        ItemDefinition, ItemTypeId,
    };

    fn catalog() -> ItemCatalog {
        let plain = ItemDefinition {
            id: ItemTypeId::new("flower_1"),
            tier: 1,
            category: Category::ConsumablePlant,
            merge_target: None,
            generator: None,
            chest: None,
            coin_value: 1,
            xp_value: 1,
            clears_on_merge: false,
        };
        let seeds = ItemDefinition {
            id: ItemTypeId::new("seed_bag_1"),
            category: Category::Generator,
            generator: Some(GeneratorSpec {
                produces_pool: vec![ItemTypeId::new("flower_1")],
                cooldown_ms: 0,
                max_charges: 3,
                energy_cost_per_use: 1,
            }),
            ..plain.clone()
        };
        ItemCatalog::from_definitions(vec![plain, seeds]).unwrap()
    }

    fn valid() -> (Board, Economy) {
        let mut board = Board::new(GridConfig::new(3, 3)).unwrap();
        board
            .spawn(ItemTypeId::new("flower_1"), Coord::new(0, 0), None)
            .unwrap();
        board
            .spawn(
                ItemTypeId::new("seed_bag_1"),
                Coord::new(1, 1),
                Some(GeneratorState::fresh(3)),
            )
            .unwrap();
        (board, Economy::new(EconomyConfig::default(), 0))
    }

    #[test]
    fn test_valid_board_passes() {
        let (board, economy) = valid();
        assert!(check_invariants(&board, &catalog(), &economy).is_empty());
        assert_invariants(&board, &catalog(), &economy);
    }

    #[test]
    fn test_unknown_type_detected() {
        let (mut board, economy) = valid();
        board
            .spawn(ItemTypeId::new("ghost"), Coord::new(2, 2), None)
            .unwrap();

        let violations = check_invariants(&board, &catalog(), &economy);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("unknown type"));
    }

    #[test]
    fn test_excess_charges_detected() {
        let (mut board, economy) = valid();
        let id = board.item_at(Coord::new(1, 1)).unwrap().id;
        board.set_generator_state(id, GeneratorState::fresh(9));

        let violations = check_invariants(&board, &catalog(), &economy);
        assert!(violations.iter().any(|v| v.message.contains("charges")));
    }

    #[test]
    fn test_missing_generator_state_detected() {
        let (mut board, economy) = valid();
        board
            .spawn(ItemTypeId::new("seed_bag_1"), Coord::new(2, 2), None)
            .unwrap();

        let violations = check_invariants(&board, &catalog(), &economy);
        assert!(violations[0].message.contains("no generator state"));
    }

    #[test]
    fn test_level_up_keeps_energy_within_cap() {
        let (board, _) = valid();
        let config = EconomyConfig::default();
        let mut state = EconomyState::new(&config, 0);
        state.max_energy = 10;
        state.energy = 10;
        let mut economy = Economy::from_state(config, state);
        // Level-up raises the cap; energy stays within it.
        economy.add_xp(50);

        assert!(check_invariants(&board, &catalog(), &economy).is_empty());
    }
}
