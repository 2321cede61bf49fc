//! Grid model: placed items and the cells they occupy.
//!
//! The board keeps two views of the same data: a row-major cell index
//! (`cells`) for O(1) `item_at` lookups and an id-keyed item table. Every
//! mutation updates both, so no two items can ever share a cell.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Timestamp;
use crate::game::ItemTypeId;

/// A cell coordinate on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// X coordinate (column).
    pub x: u16,
    /// Y coordinate (row).
    pub y: u16,
}

impl Coord {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Get the up to 8 surrounding coordinates that lie inside the board.
    ///
    /// Scan order is row-major starting at the top-left neighbor. The array
    /// contains valid coordinates in indices `0..count`.
    #[must_use]
    #[inline]
    pub fn neighbors8(&self, width: u16, height: u16) -> ([Coord; 8], u8) {
        let mut result = [Coord::new(0, 0); 8];
        let mut count = 0u8;

        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = i32::from(self.x) + dx;
                let ny = i32::from(self.y) + dy;
                if nx < 0 || ny < 0 || nx >= i32::from(width) || ny >= i32::from(height) {
                    continue;
                }
                // Both values are within [0, u16::MAX) after the bounds check.
                if let (Ok(x), Ok(y)) = (u16::try_from(nx), u16::try_from(ny)) {
                    result[usize::from(count)] = Coord::new(x, y);
                    count += 1;
                }
            }
        }

        (result, count)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Board dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Number of rows (height).
    pub rows: u16,
    /// Number of columns (width).
    pub cols: u16,
}

impl GridConfig {
    /// Create a config with the given dimensions.
    #[must_use]
    pub const fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    /// Total number of cells.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Check if a coordinate is inside `[0, cols) x [0, rows)`.
    #[must_use]
    pub const fn contains(&self, coord: Coord) -> bool {
        coord.x < self.cols && coord.y < self.rows
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { rows: 9, cols: 7 }
    }
}

/// Stable identifier of a placed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-instance production state of a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorState {
    /// Remaining production uses.
    pub charges: u32,
    /// When the generator last produced (None = never tapped).
    pub last_produced_at: Option<Timestamp>,
}

impl GeneratorState {
    /// A freshly created generator with all charges available.
    #[must_use]
    pub const fn fresh(max_charges: u32) -> Self {
        Self {
            charges: max_charges,
            last_produced_at: None,
        }
    }
}

/// An item placed on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardItem {
    /// Unique id, stable for the instance's lifetime.
    pub id: ItemId,
    /// Catalog type of this item.
    pub item_type: ItemTypeId,
    /// Cell the item occupies.
    pub position: Coord,
    /// Production state, present only for generators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<GeneratorState>,
}

/// Grid placement/move rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    /// Coordinate outside the board.
    #[error("cell {coord} is outside the board")]
    OutOfBounds {
        /// The rejected coordinate.
        coord: Coord,
    },
    /// Cell already holds a different item.
    #[error("cell {coord} is occupied by item {occupant}")]
    CellOccupied {
        /// The rejected coordinate.
        coord: Coord,
        /// Item currently in the cell.
        occupant: ItemId,
    },
    /// No item with this id on the board.
    #[error("no item {0} on the board")]
    UnknownItem(ItemId),
    /// An item with this id is already on the board.
    #[error("item {0} is already on the board")]
    DuplicateItem(ItemId),
    /// Rows or columns is zero.
    #[error("invalid board dimensions {rows}x{cols}")]
    InvalidDimensions {
        /// Requested rows.
        rows: u16,
        /// Requested columns.
        cols: u16,
    },
    /// A resize would leave an item outside the new bounds.
    #[error("resize would orphan item {item} at {coord}")]
    WouldOrphan {
        /// The item that would fall outside.
        item: ItemId,
        /// Its current position.
        coord: Coord,
    },
    /// No empty cell is left.
    #[error("board is full")]
    BoardFull,
    /// The id space is used up; no further item can be identified.
    #[error("item id {0} leaves no room for further ids")]
    IdsExhausted(ItemId),
}

/// The merge board.
#[derive(Debug, Clone)]
pub struct Board {
    /// Board dimensions.
    config: GridConfig,
    /// Occupant of each cell in row-major order.
    cells: Vec<Option<ItemId>>,
    /// All placed items by id.
    items: BTreeMap<ItemId, BoardItem>,
    /// Next id handed out by `spawn`.
    next_id: u64,
}

impl Board {
    /// Create an empty board.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidDimensions`] if rows or cols is zero.
    pub fn new(config: GridConfig) -> Result<Self, GridError> {
        if config.rows == 0 || config.cols == 0 {
            return Err(GridError::InvalidDimensions {
                rows: config.rows,
                cols: config.cols,
            });
        }

        Ok(Self {
            config,
            cells: vec![None; config.cell_count()],
            items: BTreeMap::new(),
            next_id: 1,
        })
    }

    /// Board dimensions.
    #[must_use]
    pub const fn config(&self) -> GridConfig {
        self.config
    }

    /// Width of the board in cells.
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.config.cols
    }

    /// Height of the board in cells.
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.config.rows
    }

    /// Check if a coordinate is within the board bounds.
    #[must_use]
    pub const fn in_bounds(&self, coord: Coord) -> bool {
        self.config.contains(coord)
    }

    /// Convert a coordinate to an index into the cells array.
    fn coord_to_index(&self, coord: Coord) -> Option<usize> {
        if self.in_bounds(coord) {
            Some(usize::from(coord.y) * usize::from(self.config.cols) + usize::from(coord.x))
        } else {
            None
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn index_to_coord(&self, idx: usize) -> Coord {
        let cols = usize::from(self.config.cols);
        // Indices come from `cells`, whose length is rows * cols.
        Coord::new((idx % cols) as u16, (idx / cols) as u16)
    }

    /// Number of items on the board.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the board has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check if every cell is occupied.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.cells.len()
    }

    /// The id the next spawned item will receive.
    #[must_use]
    pub const fn next_id(&self) -> u64 {
        self.next_id
    }

    /// How many more items can still be spawned.
    #[must_use]
    pub const fn ids_remaining(&self) -> u64 {
        u64::MAX - self.next_id
    }

    /// Fail unless `count` more items can be spawned.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::IdsExhausted`] when fewer ids are left.
    pub fn ensure_ids(&self, count: u64) -> Result<(), GridError> {
        if self.ids_remaining() < count {
            return Err(GridError::IdsExhausted(ItemId(self.next_id)));
        }
        Ok(())
    }

    /// Make sure future ids start at `next` or later.
    pub(crate) fn reserve_ids_from(&mut self, next: u64) {
        self.next_id = self.next_id.max(next);
    }

    /// Get the item occupying a cell.
    #[must_use]
    pub fn item_at(&self, coord: Coord) -> Option<&BoardItem> {
        let idx = self.coord_to_index(coord)?;
        self.cells[idx].and_then(|id| self.items.get(&id))
    }

    /// Get an item by id.
    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&BoardItem> {
        self.items.get(&id)
    }

    /// Check if an item is on the board.
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    /// Overwrite an item's production state. Returns false if the item is
    /// not on the board.
    pub(crate) fn set_generator_state(&mut self, id: ItemId, state: GeneratorState) -> bool {
        match self.items.get_mut(&id) {
            Some(item) => {
                item.generator = Some(state);
                true
            }
            None => false,
        }
    }

    /// Place an already identified item at its `position`.
    ///
    /// # Errors
    ///
    /// - [`GridError::OutOfBounds`] if the position is outside the board.
    /// - [`GridError::DuplicateItem`] if the id is already placed.
    /// - [`GridError::IdsExhausted`] if the id is `u64::MAX`, which would
    ///   leave no successor id.
    /// - [`GridError::CellOccupied`] if another item holds the cell.
    pub fn place(&mut self, item: BoardItem) -> Result<ItemId, GridError> {
        let coord = item.position;
        let idx = self
            .coord_to_index(coord)
            .ok_or(GridError::OutOfBounds { coord })?;

        if self.items.contains_key(&item.id) {
            return Err(GridError::DuplicateItem(item.id));
        }
        let Some(successor) = item.id.0.checked_add(1) else {
            return Err(GridError::IdsExhausted(item.id));
        };
        if let Some(occupant) = self.cells[idx] {
            return Err(GridError::CellOccupied { coord, occupant });
        }

        let id = item.id;
        self.cells[idx] = Some(id);
        self.items.insert(id, item);
        self.next_id = self.next_id.max(successor);
        Ok(id)
    }

    /// Create a new item of `item_type` at `at` with a fresh id.
    ///
    /// # Errors
    ///
    /// Same as [`Board::place`].
    pub fn spawn(
        &mut self,
        item_type: ItemTypeId,
        at: Coord,
        generator: Option<GeneratorState>,
    ) -> Result<ItemId, GridError> {
        let item = BoardItem {
            id: ItemId(self.next_id),
            item_type,
            position: at,
            generator,
        };
        self.place(item)
    }

    /// Remove an item from the board.
    ///
    /// Removing an absent item is a reported no-op.
    pub fn remove(&mut self, id: ItemId) -> Option<BoardItem> {
        let Some(item) = self.items.remove(&id) else {
            tracing::warn!(item = %id, "remove of absent item ignored");
            return None;
        };

        if let Some(idx) = self.coord_to_index(item.position)
            && self.cells[idx] == Some(id)
        {
            self.cells[idx] = None;
        }
        Some(item)
    }

    /// Move an item to another cell.
    ///
    /// Moving an item onto its own cell succeeds without change. On error
    /// the board is untouched.
    ///
    /// # Errors
    ///
    /// - [`GridError::UnknownItem`] if the id is not on the board.
    /// - [`GridError::OutOfBounds`] if `to` is outside the board.
    /// - [`GridError::CellOccupied`] if a different item holds `to`.
    pub fn move_item(&mut self, id: ItemId, to: Coord) -> Result<(), GridError> {
        let from = self.items.get(&id).ok_or(GridError::UnknownItem(id))?.position;
        let to_idx = self
            .coord_to_index(to)
            .ok_or(GridError::OutOfBounds { coord: to })?;

        match self.cells[to_idx] {
            Some(occupant) if occupant == id => return Ok(()),
            Some(occupant) => return Err(GridError::CellOccupied { coord: to, occupant }),
            None => {}
        }

        if let Some(from_idx) = self.coord_to_index(from) {
            self.cells[from_idx] = None;
        }
        self.cells[to_idx] = Some(id);
        if let Some(item) = self.items.get_mut(&id) {
            item.position = to;
        }
        Ok(())
    }

    /// First empty cell in row-major order, top-left first.
    #[must_use]
    pub fn find_first_empty_cell(&self) -> Option<Coord> {
        self.cells
            .iter()
            .position(Option::is_none)
            .map(|idx| self.index_to_coord(idx))
    }

    /// All empty cells in row-major order.
    pub fn empty_cells(&self) -> impl Iterator<Item = Coord> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(idx, _)| self.index_to_coord(idx))
    }

    /// Number of empty cells.
    #[must_use]
    pub fn empty_count(&self) -> usize {
        self.cells.len().saturating_sub(self.items.len())
    }

    /// Iterate over items in id order.
    pub fn iter(&self) -> impl Iterator<Item = &BoardItem> {
        self.items.values()
    }

    /// Iterate over items in row-major cell order.
    pub fn iter_row_major(&self) -> impl Iterator<Item = &BoardItem> {
        self.cells
            .iter()
            .filter_map(|cell| cell.and_then(|id| self.items.get(&id)))
    }

    /// Items of one type in row-major cell order.
    pub fn items_of<'a>(
        &'a self,
        item_type: &'a ItemTypeId,
    ) -> impl Iterator<Item = &'a BoardItem> {
        self.iter_row_major()
            .filter(move |item| &item.item_type == item_type)
    }

    /// Count items of one type.
    #[must_use]
    pub fn count_of(&self, item_type: &ItemTypeId) -> usize {
        self.items
            .values()
            .filter(|item| &item.item_type == item_type)
            .count()
    }

    /// Neighbors of a cell that lie on this board.
    #[must_use]
    pub fn neighbors8(&self, coord: Coord) -> ([Coord; 8], u8) {
        coord.neighbors8(self.width(), self.height())
    }

    /// Change the board dimensions.
    ///
    /// # Errors
    ///
    /// - [`GridError::InvalidDimensions`] if rows or cols is zero.
    /// - [`GridError::WouldOrphan`] if any item lies outside the new bounds.
    pub fn resize(&mut self, config: GridConfig) -> Result<(), GridError> {
        let mut resized = Board::new(config)?;
        if let Some(item) = self.items.values().find(|i| !config.contains(i.position)) {
            return Err(GridError::WouldOrphan {
                item: item.id,
                coord: item.position,
            });
        }

        for item in self.items.values() {
            resized.place(item.clone())?;
        }
        resized.next_id = self.next_id;
        *self = resized;
        Ok(())
    }

    /// Change the board dimensions, relocating items that fall outside.
    ///
    /// Orphaned items move, in id order, to the first empty in-bounds cells.
    /// Returns `(item, from, to)` for each relocated item.
    ///
    /// # Errors
    ///
    /// - [`GridError::InvalidDimensions`] if rows or cols is zero.
    /// - [`GridError::BoardFull`] if the new board cannot hold every item.
    pub fn resize_relocating(
        &mut self,
        config: GridConfig,
    ) -> Result<Vec<(ItemId, Coord, Coord)>, GridError> {
        let mut resized = Board::new(config)?;
        if self.items.len() > config.cell_count() {
            return Err(GridError::BoardFull);
        }

        let (inside, outside): (Vec<_>, Vec<_>) = self
            .items
            .values()
            .partition(|item| config.contains(item.position));

        for item in inside {
            resized.place(item.clone())?;
        }

        let mut moves = Vec::with_capacity(outside.len());
        for item in outside {
            let to = resized.find_first_empty_cell().ok_or(GridError::BoardFull)?;
            let mut moved = item.clone();
            moved.position = to;
            resized.place(moved)?;
            moves.push((item.id, item.position, to));
        }

        resized.next_id = self.next_id;
        *self = resized;
        Ok(moves)
    }

    /// Raw cell index, for invariant checks.
    pub(crate) fn cells(&self) -> impl Iterator<Item = (Coord, Option<ItemId>)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| (self.index_to_coord(idx), *cell))
    }
}
