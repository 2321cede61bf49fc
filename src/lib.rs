// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Mergeboard: a deterministic merge-board game engine.
//!
//! Players place items on a grid, merge pairs of identical items into the
//! next tier, tap generators for new items, and spend the energy, coins
//! and gems they earn on shop items and unlocks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Session (clock, RNG, snapshots)   │
//! ├─────────────────────────────────────┤
//! │ Merge · Generators · Chests · Gates │
//! ├─────────────────────────────────────┤
//! │     Board · Catalog · Economy       │
//! └─────────────────────────────────────┘
//! ```
//!
//! Gameplay rejections (occupied cell, cooldown, not enough coins) are
//! ordinary outcome values. Only data faults such as an item type missing
//! from the catalog are returned as errors.

pub mod clock;
pub mod config;
pub mod content;
pub mod error;
pub mod game;
pub mod render;
pub mod session;
pub mod sim;
pub mod snapshot;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use config::{ConfigError, GameConfig};
pub use error::{EngineError, EngineResult};

// Re-export key game types at crate root for convenience
pub use game::{
    Board, BoardItem, Coord, Economy, GridConfig, ItemCatalog, ItemDefinition, ItemId, ItemTypeId,
    MergeOutcome, ProduceOutcome, Resource,
};
pub use session::{DropOutcome, GameSession, SessionError};
pub use snapshot::{Snapshot, SnapshotError};
