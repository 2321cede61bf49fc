//! Selling items for coins and buying items with currency.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::game::{
    Board, Coord, Cost, Economy, EconomyError, GeneratorState, ItemCatalog, ItemId, ItemTypeId,
    Resource,
};

/// One purchasable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopOffer {
    /// Type placed on the board when bought.
    pub item_type: ItemTypeId,
    /// Price, paid all-or-nothing.
    pub price: Cost,
}

/// Result of selling an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaleOutcome {
    /// The item was removed and paid for.
    Sold {
        /// Type of the sold item.
        item_type: ItemTypeId,
        /// Coins received.
        coins: u64,
    },
    /// Fixed blockers cannot be sold.
    Blocked,
}

/// Result of a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// The item was paid for and placed.
    Purchased {
        /// The new item.
        item: ItemId,
        /// Where it was placed.
        at: Coord,
    },
    /// No empty cell. Nothing was charged.
    BoardFull,
    /// The price is not affordable. Nothing was charged.
    InsufficientFunds(EconomyError),
}

/// Sell an item for its sell price.
///
/// # Errors
///
/// - [`EngineError::UnknownItem`] if the id is not on the board.
/// - [`EngineError::UnknownItemType`] if its type is missing from the catalog.
pub fn sell(
    board: &mut Board,
    catalog: &ItemCatalog,
    economy: &mut Economy,
    id: ItemId,
) -> EngineResult<SaleOutcome> {
    let item = board.item(id).ok_or(EngineError::UnknownItem(id))?;
    let def = catalog.lookup(&item.item_type)?;
    if def.is_fixed_blocker() {
        return Ok(SaleOutcome::Blocked);
    }

    let coins = def.sell_price();
    let item_type = def.id.clone();
    board.remove(id);
    economy.grant(Resource::Coins, coins);

    tracing::debug!(item = %id, item_type = %item_type, coins, "item sold");
    Ok(SaleOutcome::Sold { item_type, coins })
}

/// Buy an offer and place it on the first empty cell.
///
/// # Errors
///
/// - [`EngineError::UnknownItemType`] if the offered type is missing from
///   the catalog.
/// - [`EngineError::Grid`] if the board has no item ids left. Nothing is
///   charged.
pub fn purchase(
    board: &mut Board,
    catalog: &ItemCatalog,
    economy: &mut Economy,
    offer: &ShopOffer,
) -> EngineResult<PurchaseOutcome> {
    let def = catalog.lookup(&offer.item_type)?;
    let Some(at) = board.find_first_empty_cell() else {
        return Ok(PurchaseOutcome::BoardFull);
    };
    if let Err(err) = economy.check_cost(offer.price) {
        return Ok(PurchaseOutcome::InsufficientFunds(err));
    }

    let generator = def
        .generator
        .as_ref()
        .map(|spec| GeneratorState::fresh(spec.max_charges));
    let item = board.spawn(offer.item_type.clone(), at, generator)?;
    if let Err(err) = economy.spend_cost(offer.price) {
        board.remove(item);
        return Ok(PurchaseOutcome::InsufficientFunds(err));
    }

    tracing::debug!(item = %item, item_type = %offer.item_type, at = %at, "item purchased");
    Ok(PurchaseOutcome::Purchased { item, at })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Category, EconomyConfig, GridConfig, ItemDefinition};

    fn def(id: &str, category: Category, coin_value: u64) -> ItemDefinition {
        ItemDefinition {
            id: ItemTypeId::new(id),
            tier: 1,
            category,
            merge_target: None,
            generator: None,
            chest: None,
            coin_value,
            xp_value: 0,
            clears_on_merge: false,
        }
    }

    fn catalog() -> ItemCatalog {
        ItemCatalog::from_definitions(vec![
            def("flower_3", Category::ConsumablePlant, 15),
            def("rock", Category::Blocker, 0),
        ])
        .unwrap()
    }

    #[test]
    fn test_sell_grants_half_value_rounded_up() {
        let mut board = Board::new(GridConfig::new(2, 2)).unwrap();
        let mut economy = Economy::new(EconomyConfig::default(), 0);
        let id = board
            .spawn(ItemTypeId::new("flower_3"), Coord::new(0, 0), None)
            .unwrap();

        let outcome = sell(&mut board, &catalog(), &mut economy, id).unwrap();
        assert_eq!(
            outcome,
            SaleOutcome::Sold {
                item_type: ItemTypeId::new("flower_3"),
                coins: 8
            }
        );
        assert!(board.is_empty());
        assert_eq!(economy.coins(), 8);
    }

    #[test]
    fn test_sell_fixed_blocker() {
        let mut board = Board::new(GridConfig::new(2, 2)).unwrap();
        let mut economy = Economy::new(EconomyConfig::default(), 0);
        let id = board
            .spawn(ItemTypeId::new("rock"), Coord::new(0, 0), None)
            .unwrap();

        assert_eq!(
            sell(&mut board, &catalog(), &mut economy, id).unwrap(),
            SaleOutcome::Blocked
        );
        assert!(board.contains(id));
    }

    #[test]
    fn test_purchase() {
        let mut board = Board::new(GridConfig::new(2, 2)).unwrap();
        let mut economy = Economy::new(EconomyConfig::default(), 0);
        economy.grant(Resource::Coins, 30);
        let offer = ShopOffer {
            item_type: ItemTypeId::new("flower_3"),
            price: Cost::coins(20),
        };

        let outcome = purchase(&mut board, &catalog(), &mut economy, &offer).unwrap();
        assert!(matches!(
            outcome,
            PurchaseOutcome::Purchased { at, .. } if at == Coord::new(0, 0)
        ));
        assert_eq!(economy.coins(), 10);

        let outcome = purchase(&mut board, &catalog(), &mut economy, &offer).unwrap();
        assert!(matches!(outcome, PurchaseOutcome::InsufficientFunds(_)));
        assert_eq!(economy.coins(), 10);
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_purchase_board_full_charges_nothing() {
        let mut board = Board::new(GridConfig::new(1, 1)).unwrap();
        let mut economy = Economy::new(EconomyConfig::default(), 0);
        economy.grant(Resource::Gems, 5);
        board
            .spawn(ItemTypeId::new("rock"), Coord::new(0, 0), None)
            .unwrap();
        let offer = ShopOffer {
            item_type: ItemTypeId::new("flower_3"),
            price: Cost::gems(5),
        };

        assert_eq!(
            purchase(&mut board, &catalog(), &mut economy, &offer).unwrap(),
            PurchaseOutcome::BoardFull
        );
        assert_eq!(economy.gems(), 5);
    }
}
