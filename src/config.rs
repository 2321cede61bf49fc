//! Game configuration: grid, economy tuning, starting state and content.
//!
//! Every section has a default and is optional in JSON, so a config file
//! only needs to name what it changes.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::{
    Coord, EconomyConfig, Gate, GridConfig, ItemCatalog, ItemTypeId, Requirement, ShopOffer,
};

/// Configuration failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The JSON is malformed or has the wrong shape.
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// The values are inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Balances a new player starts with on top of full energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StartingResources {
    /// Starting coins.
    pub coins: u64,
    /// Starting gems.
    pub gems: u64,
}

/// An item placed on a fresh board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialPlacement {
    /// Item type.
    pub item_type: ItemTypeId,
    /// Cell.
    pub at: Coord,
}

/// What to do when a restored board does not fit the configured grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizePolicy {
    /// Refuse to restore if any item would fall outside.
    #[default]
    Reject,
    /// Move outside items into the first empty cells.
    Relocate,
}

/// Complete game configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Board dimensions.
    pub grid: GridConfig,
    /// Economy tuning.
    pub economy: EconomyConfig,
    /// Starting balances.
    pub start: StartingResources,
    /// Items on a fresh board.
    pub initial_board: Vec<InitialPlacement>,
    /// Shop offers, addressed by index.
    pub shop: Vec<ShopOffer>,
    /// Tasks and area unlocks.
    pub gates: Vec<Gate>,
    /// Handling of saves made with different grid dimensions.
    pub grid_migration: ResizePolicy,
}

impl GameConfig {
    /// Parse a config from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Look up a gate by id.
    #[must_use]
    pub fn gate(&self, id: &str) -> Option<&Gate> {
        self.gates.iter().find(|gate| gate.id == id)
    }

    /// Check the config against itself and the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self, catalog: &ItemCatalog) -> Result<(), ConfigError> {
        if self.grid.rows == 0 || self.grid.cols == 0 {
            return Err(ConfigError::Invalid(format!(
                "grid must be non-empty, got {}x{}",
                self.grid.cols, self.grid.rows
            )));
        }
        self.economy.validate()?;

        let known = |item_type: &ItemTypeId, context: &str| {
            if catalog.get(item_type).is_some() {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!(
                    "{context} references unknown item type `{item_type}`"
                )))
            }
        };

        let mut occupied = BTreeSet::new();
        for placement in &self.initial_board {
            known(&placement.item_type, "initial_board")?;
            if !self.grid.contains(placement.at) {
                return Err(ConfigError::Invalid(format!(
                    "initial_board places `{}` outside the grid at {}",
                    placement.item_type, placement.at
                )));
            }
            if !occupied.insert(placement.at) {
                return Err(ConfigError::Invalid(format!(
                    "initial_board places two items at {}",
                    placement.at
                )));
            }
        }

        for offer in &self.shop {
            known(&offer.item_type, "shop")?;
        }

        let mut gate_ids = BTreeSet::new();
        for gate in &self.gates {
            if !gate_ids.insert(gate.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate gate id `{}`", gate.id)));
            }
            for requirement in &gate.requirements {
                if let Requirement::Items { item_type, .. } = requirement {
                    known(item_type, &format!("gate `{}`", gate.id))?;
                }
            }
        }

        Ok(())
    }
}
