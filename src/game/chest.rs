//! Chest opening.

use rand::Rng;

use crate::error::{EngineError, EngineResult};
use crate::game::{
    Board, Coord, Economy, GeneratorState, GridError, ItemCatalog, ItemId, ItemTypeId, Resource,
};

/// Details of an opened chest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChestOpening {
    /// Items dropped onto the board, in placement order.
    pub drops: Vec<(ItemId, ItemTypeId, Coord)>,
    /// Coins granted.
    pub coins: u64,
    /// Gems granted.
    pub gems: u64,
    /// Energy actually credited (after clamping).
    pub energy: u64,
}

/// Result of opening a chest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChestOutcome {
    /// The chest was opened and removed.
    Opened(ChestOpening),
    /// Not enough empty cells for the drops. Nothing changed.
    BoardFull,
    /// The item is not a chest.
    NotAChest,
}

/// Open a chest: remove it, grant its currencies and drop its items.
///
/// The first drop lands on the chest's own cell, the rest on the first
/// empty cells. If the drops cannot all fit, nothing happens.
///
/// # Errors
///
/// - [`EngineError::UnknownItem`] if the id is not on the board.
/// - [`EngineError::UnknownItemType`] if the chest or a drop type is
///   missing from the catalog.
/// - [`EngineError::Grid`] if the board has too few item ids left for the
///   drops. The chest stays closed.
pub fn open_chest<R: Rng>(
    board: &mut Board,
    catalog: &ItemCatalog,
    economy: &mut Economy,
    rng: &mut R,
    id: ItemId,
) -> EngineResult<ChestOutcome> {
    let item = board.item(id).ok_or(EngineError::UnknownItem(id))?;
    let position = item.position;
    let def = catalog.lookup(&item.item_type)?;
    let Some(spec) = &def.chest else {
        return Ok(ChestOutcome::NotAChest);
    };

    let drop_count = if spec.drop_pool.is_empty() {
        0
    } else {
        usize::try_from(spec.drop_count).unwrap_or(usize::MAX)
    };
    // The chest's own cell frees up when it opens.
    if drop_count > board.empty_count() + 1 {
        return Ok(ChestOutcome::BoardFull);
    }

    let mut planned = Vec::with_capacity(drop_count);
    for _ in 0..drop_count {
        let drop_type = spec.drop_pool[rng.random_range(0..spec.drop_pool.len())].clone();
        let generator = catalog
            .lookup(&drop_type)?
            .generator
            .as_ref()
            .map(|g| GeneratorState::fresh(g.max_charges));
        planned.push((drop_type, generator));
    }

    board.ensure_ids(u64::try_from(planned.len()).unwrap_or(u64::MAX))?;
    let (coins, gems, energy) = (spec.coins, spec.gems, u64::from(spec.energy));
    board.remove(id);

    let mut drops = Vec::with_capacity(planned.len());
    for (i, (drop_type, generator)) in planned.into_iter().enumerate() {
        let at = if i == 0 {
            position
        } else {
            board
                .find_first_empty_cell()
                .ok_or(GridError::BoardFull)?
        };
        let dropped = board.spawn(drop_type.clone(), at, generator)?;
        drops.push((dropped, drop_type, at));
    }

    economy.grant(Resource::Coins, coins);
    economy.grant(Resource::Gems, gems);
    let energy = economy.grant(Resource::Energy, energy);

    tracing::debug!(chest = %id, drops = drops.len(), coins, gems, energy, "chest opened");

    Ok(ChestOutcome::Opened(ChestOpening {
        drops,
        coins,
        gems,
        energy,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        BoardItem, Category, ChestSpec, EconomyConfig, GridConfig, GridError, ItemDefinition,
    };
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn plain(id: &str, category: Category) -> ItemDefinition {
        ItemDefinition {
            id: ItemTypeId::new(id),
            tier: 1,
            category,
            merge_target: None,
            generator: None,
            chest: None,
            coin_value: 1,
            xp_value: 1,
            clears_on_merge: false,
        }
    }

    fn catalog() -> ItemCatalog {
        let mut chest = plain("chest_1", Category::Chest);
        chest.chest = Some(ChestSpec {
            coins: 25,
            gems: 2,
            energy: 10,
            drop_pool: vec![ItemTypeId::new("flower_1")],
            drop_count: 3,
        });
        ItemCatalog::from_definitions(vec![chest, plain("flower_1", Category::ConsumablePlant)])
            .unwrap()
    }

    fn open(board: &mut Board, economy: &mut Economy, id: ItemId) -> ChestOutcome {
        let mut rng = StdRng::seed_from_u64(1);
        open_chest(board, &catalog(), economy, &mut rng, id).unwrap()
    }

    #[test]
    fn test_open_chest_drops_and_rewards() {
        let mut board = Board::new(GridConfig::new(3, 3)).unwrap();
        let mut economy = Economy::new(EconomyConfig::default(), 0);
        economy.spend(Resource::Energy, 50);
        let chest = board
            .spawn(ItemTypeId::new("chest_1"), Coord::new(2, 1), None)
            .unwrap();

        let ChestOutcome::Opened(opening) = open(&mut board, &mut economy, chest) else {
            panic!("expected chest to open");
        };

        assert!(!board.contains(chest));
        assert_eq!(opening.drops.len(), 3);
        assert_eq!(opening.drops[0].2, Coord::new(2, 1));
        assert_eq!(opening.drops[1].2, Coord::new(0, 0));
        assert_eq!(opening.drops[2].2, Coord::new(1, 0));
        assert_eq!(board.count_of(&ItemTypeId::new("flower_1")), 3);
        assert_eq!(economy.coins(), 25);
        assert_eq!(economy.gems(), 2);
        assert_eq!(economy.energy(), 60);
    }

    #[test]
    fn test_open_chest_needs_room() {
        let mut board = Board::new(GridConfig::new(1, 2)).unwrap();
        let mut economy = Economy::new(EconomyConfig::default(), 0);
        let chest = board
            .spawn(ItemTypeId::new("chest_1"), Coord::new(0, 0), None)
            .unwrap();

        assert_eq!(open(&mut board, &mut economy, chest), ChestOutcome::BoardFull);
        assert!(board.contains(chest));
        assert_eq!(economy.coins(), 0);
    }

    #[test]
    fn test_open_non_chest() {
        let mut board = Board::new(GridConfig::new(2, 2)).unwrap();
        let mut economy = Economy::new(EconomyConfig::default(), 0);
        let flower = board
            .spawn(ItemTypeId::new("flower_1"), Coord::new(0, 0), None)
            .unwrap();
        assert_eq!(open(&mut board, &mut economy, flower), ChestOutcome::NotAChest);
        assert!(board.contains(flower));
    }

    #[test]
    fn test_open_chest_without_ids_stays_closed() {
        let mut board = Board::new(GridConfig::new(3, 3)).unwrap();
        let mut economy = Economy::new(EconomyConfig::default(), 0);
        let chest = ItemId(u64::MAX - 2);
        board
            .place(BoardItem {
                id: chest,
                item_type: ItemTypeId::new("chest_1"),
                position: Coord::new(0, 0),
                generator: None,
            })
            .unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let err = open_chest(&mut board, &catalog(), &mut economy, &mut rng, chest).unwrap_err();

        assert!(matches!(err, EngineError::Grid(GridError::IdsExhausted(_))));
        assert!(board.contains(chest));
        assert_eq!(board.len(), 1);
        assert_eq!(economy.coins(), 0);
    }
}
