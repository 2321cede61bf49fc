//! Merge board engine.
//!
//! Implements the board rules:
//! - Grid of cells with one item per cell
//! - Item catalog with merge chains
//! - Pairwise merges with neighbor absorption
//! - Charge-limited generators with cooldowns
//! - Economy (energy regeneration, currencies, XP and levels)
//! - Chests, selling and the shop
//! - Task and area gates

mod board;
mod catalog;
mod chest;
mod economy;
mod gates;
mod generator;
mod invariants;
mod merge;
mod shop;

pub use board::{Board, BoardItem, Coord, GeneratorState, GridConfig, GridError, ItemId};
pub use catalog::{
    CatalogError, Category, ChestSpec, GeneratorSpec, ItemCatalog, ItemDefinition, ItemTypeId,
};
pub use chest::{ChestOpening, ChestOutcome, open_chest};
pub use economy::{
    Cost, Economy, EconomyConfig, EconomyError, EconomyState, LevelUpReport, Resource, Reward,
};
pub use gates::{
    Gate, GateKind, GateOutcome, GateProgress, GateStatus, Requirement, Shortfall, check_gate,
    complete_gate,
};
pub use generator::{GeneratorStatus, ProduceOutcome, Production, generator_status, tap};
pub use invariants::{InvariantViolation, assert_invariants, check_invariants};
pub use merge::{MergeOutcome, MergeReport, can_merge, try_merge};
pub use shop::{PurchaseOutcome, SaleOutcome, ShopOffer, purchase, sell};
