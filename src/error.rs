//! Error types for the merge engine.
//!
//! Player-facing rejections (occupied cell, no charges, not enough coins)
//! are ordinary outcome values returned by each operation. The types here
//! cover the remaining faults: content bugs, stale ids and malformed input.

use thiserror::Error;

use crate::game::{Coord, GridError, ItemId, ItemTypeId};

/// Fault raised by a board operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A board item references a type the catalog does not know.
    ///
    /// This is a content/catalog bug, not a player action.
    #[error("unknown item type `{0}`")]
    UnknownItemType(ItemTypeId),
    /// No item with this id is on the board.
    #[error("no item {0} on the board")]
    UnknownItem(ItemId),
    /// A coordinate-based action targeted an empty cell.
    #[error("no item at {0}")]
    EmptyCell(Coord),
    /// No gate with this id is configured.
    #[error("unknown gate `{0}`")]
    UnknownGate(String),
    /// No shop offer at this index.
    #[error("no shop offer #{0}")]
    UnknownOffer(usize),
    /// A grid placement or move was rejected.
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::UnknownItemType(ItemTypeId::new("ghost_1"));
        assert_eq!(err.to_string(), "unknown item type `ghost_1`");

        let err = EngineError::UnknownItem(ItemId(42));
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_grid_error_is_transparent() {
        let grid = GridError::OutOfBounds {
            coord: Coord::new(9, 9),
        };
        let err = EngineError::from(grid.clone());
        assert_eq!(err.to_string(), grid.to_string());
    }
}
