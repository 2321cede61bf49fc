//! Merge resolution.
//!
//! A merge is pairwise: the dragged `source` is dropped onto `target`, both
//! of the same type. The result lands on the target's cell. After a
//! successful pair merge, one more item of the original type sitting in the
//! 8 cells around the target is absorbed into the same result, so a cluster
//! of three collapses into one item. Absorption never happens without a
//! successful pair merge.
//!
//! The resolver does not look at categories except for fixed blockers.
//! Whether generators may be dragged is decided by the caller.

use crate::error::{EngineError, EngineResult};
use crate::game::{
    Board, Coord, Economy, GeneratorState, ItemCatalog, ItemId, ItemTypeId, LevelUpReport,
    Resource,
};

/// Details of a completed merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// The newly created item.
    pub result: ItemId,
    /// Its type.
    pub result_type: ItemTypeId,
    /// Where it was placed (the target's former cell).
    pub position: Coord,
    /// Every item destroyed by the merge, source and target first.
    pub consumed: Vec<ItemId>,
    /// The neighbor absorbed as a third input, if any.
    pub absorbed: Option<ItemId>,
    /// Coins rewarded.
    pub coins: u64,
    /// XP rewarded.
    pub xp: u64,
    /// Level-ups triggered by the XP.
    pub level_up: LevelUpReport,
}

/// Result of a merge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The items merged.
    Merged(MergeReport),
    /// Both items are already at the top of their chain. Board unchanged.
    NoMergeTarget,
    /// The items have different types. Board unchanged.
    TypeMismatch,
    /// One of the items is a blocker that never merges. Board unchanged.
    Blocked,
    /// Source and target are the same item. Board unchanged.
    SameItem,
}

impl MergeOutcome {
    /// Check if the merge happened.
    #[must_use]
    pub const fn is_merged(&self) -> bool {
        matches!(self, Self::Merged(_))
    }
}

/// Decide whether `source` dropped on `target` would merge, without
/// touching the board.
///
/// # Errors
///
/// - [`EngineError::UnknownItem`] if either id is not on the board.
/// - [`EngineError::UnknownItemType`] if either type is missing from the catalog.
pub fn can_merge(
    board: &Board,
    catalog: &ItemCatalog,
    source: ItemId,
    target: ItemId,
) -> EngineResult<bool> {
    Ok(rejection(board, catalog, source, target)?.is_none())
}

/// The rejection a merge attempt would produce, or None if it would merge.
fn rejection(
    board: &Board,
    catalog: &ItemCatalog,
    source: ItemId,
    target: ItemId,
) -> EngineResult<Option<MergeOutcome>> {
    let source_item = board.item(source).ok_or(EngineError::UnknownItem(source))?;
    let target_item = board.item(target).ok_or(EngineError::UnknownItem(target))?;

    let source_def = catalog.lookup(&source_item.item_type)?;
    let target_def = catalog.lookup(&target_item.item_type)?;

    if source == target {
        return Ok(Some(MergeOutcome::SameItem));
    }
    if source_def.is_fixed_blocker() || target_def.is_fixed_blocker() {
        return Ok(Some(MergeOutcome::Blocked));
    }
    if source_def.id != target_def.id {
        return Ok(Some(MergeOutcome::TypeMismatch));
    }
    match &target_def.merge_target {
        Some(result_type) => {
            catalog.lookup(result_type)?;
            Ok(None)
        }
        None => Ok(Some(MergeOutcome::NoMergeTarget)),
    }
}

/// Merge `source` into `target`.
///
/// On success both inputs (plus an absorbed neighbor, if any) are removed,
/// one item of the merge target type is created on the target's cell, and
/// the result's coin and XP values are granted through `economy`. Any
/// other outcome leaves board and economy untouched.
///
/// # Errors
///
/// - [`EngineError::UnknownItem`] if either id is not on the board.
/// - [`EngineError::UnknownItemType`] if a referenced type is missing from
///   the catalog.
/// - [`EngineError::Grid`] if the board has no item id left for the result.
///   Both inputs stay on the board.
pub fn try_merge(
    board: &mut Board,
    catalog: &ItemCatalog,
    economy: &mut Economy,
    source: ItemId,
    target: ItemId,
) -> EngineResult<MergeOutcome> {
    if let Some(outcome) = rejection(board, catalog, source, target)? {
        tracing::debug!(%source, %target, ?outcome, "merge rejected");
        return Ok(outcome);
    }

    let target_item = board.item(target).ok_or(EngineError::UnknownItem(target))?;
    let original_type = target_item.item_type.clone();
    let position = target_item.position;
    let input_def = catalog.lookup(&original_type)?;
    let result_type = input_def
        .merge_target
        .clone()
        .ok_or_else(|| EngineError::UnknownItemType(original_type.clone()))?;
    let result_def = catalog.lookup(&result_type)?;
    board.ensure_ids(1)?;

    board.remove(source);
    board.remove(target);
    let absorbed = find_absorbable(board, position, &original_type);
    if let Some(third) = absorbed {
        board.remove(third);
    }

    let generator = result_def
        .generator
        .as_ref()
        .map(|spec| GeneratorState::fresh(spec.max_charges));
    let result = board.spawn(result_type.clone(), position, generator)?;

    let coins = result_def.coin_value;
    let xp = result_def.xp_value;
    economy.grant(Resource::Coins, coins);
    let level_up = economy.add_xp(xp);

    let mut consumed = vec![source, target];
    consumed.extend(absorbed);

    tracing::debug!(
        %result,
        result_type = %result_type,
        at = %position,
        absorbed = absorbed.is_some(),
        "merge"
    );

    Ok(MergeOutcome::Merged(MergeReport {
        result,
        result_type,
        position,
        consumed,
        absorbed,
        coins,
        xp,
        level_up,
    }))
}

/// First neighbor of `center` (row-major scan) holding `item_type`.
fn find_absorbable(board: &Board, center: Coord, item_type: &ItemTypeId) -> Option<ItemId> {
    let (neighbors, count) = board.neighbors8(center);
    neighbors[..usize::from(count)]
        .iter()
        .filter_map(|&coord| board.item_at(coord))
        .find(|item| &item.item_type == item_type)
        .map(|item| item.id)
}
