//! Serializable save state.
//!
//! A snapshot holds everything needed to resume a session: grid size, every
//! placed item with its generator state, the economy (including the last
//! regeneration timestamp) and gate progress. Storage is up to the caller;
//! [`Snapshot::save`] and [`Snapshot::load`] are plain JSON file helpers.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::{BoardItem, EconomyState, GateProgress, GridConfig};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Snapshot loading or saving failure.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// File could not be read or written.
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON is malformed or has the wrong shape.
    #[error("invalid snapshot JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// Written by an incompatible version.
    #[error("unsupported snapshot version {found} (expected {SNAPSHOT_VERSION})")]
    UnsupportedVersion {
        /// Version found in the snapshot.
        found: u32,
    },
}

/// Saved session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version, see [`SNAPSHOT_VERSION`].
    pub version: u32,
    /// Grid dimensions at save time.
    pub grid: GridConfig,
    /// Next item id to hand out.
    pub next_item_id: u64,
    /// Placed items, in id order.
    pub items: Vec<BoardItem>,
    /// Economy balances and timestamps.
    pub economy: EconomyState,
    /// Completed gates.
    #[serde(default)]
    pub completed_gates: GateProgress,
}

impl Snapshot {
    /// Reject snapshots from other format versions.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::UnsupportedVersion`].
    pub fn check_version(&self) -> Result<(), SnapshotError> {
        if self.version == SNAPSHOT_VERSION {
            Ok(())
        } else {
            Err(SnapshotError::UnsupportedVersion {
                found: self.version,
            })
        }
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Parse`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and version-check a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Parse`] or [`SnapshotError::UnsupportedVersion`].
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    /// Write the snapshot to a file.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Io`] if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a snapshot from a file.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Io`], [`SnapshotError::Parse`] or
    /// [`SnapshotError::UnsupportedVersion`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
