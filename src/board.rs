//! The placement board: occupancy grid, constraints and block registry.
//!
//! The grid is a flat row-major vector where each cell holds the slot of the
//! owning block, or `None` when empty. Slots are assigned in registration
//! order and never change, so the grid stays valid when the board is cloned.
//!
//! Every registered block is either placed (it has a position and owns its
//! translated footprint cells) or unplaced (no position, owns nothing). The
//! two partitions are exposed through `placed_blocks` and `unplaced_blocks`.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockType};
use crate::error::{Error, Result};
use crate::geometry::{Cell, Rect, Rotation};

fn default_resolution() -> f64 {
    1.0
}

/// Board extents and placement constraints, all in grid cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub width: i32,
    pub height: i32,
    /// Forbidden margin along the far edge (`x = width`).
    #[serde(default)]
    pub bow_clearance: i32,
    /// Forbidden margin along the loading edge (`x = 0`).
    #[serde(default)]
    pub stern_clearance: i32,
    /// Minimum clearance between the bounding boxes of two placed blocks.
    #[serde(default)]
    pub block_spacing: i32,
    /// Metres per grid cell. Used for reporting only.
    #[serde(default = "default_resolution")]
    pub grid_resolution: f64,
}

impl BoardConfig {
    /// An unconstrained `width × height` board.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            bow_clearance: 0,
            stern_clearance: 0,
            block_spacing: 0,
            grid_resolution: default_resolution(),
        }
    }

    pub fn with_clearances(mut self, bow: i32, stern: i32) -> Self {
        self.bow_clearance = bow;
        self.stern_clearance = stern;
        self
    }

    pub fn with_spacing(mut self, spacing: i32) -> Self {
        self.block_spacing = spacing;
        self
    }

    pub fn with_resolution(mut self, metres_per_cell: f64) -> Self {
        self.grid_resolution = metres_per_cell;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(Error::InvalidBoard(format!(
                "extent must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width.checked_mul(self.height).is_none() {
            return Err(Error::InvalidBoard(format!(
                "extent {}x{} has too many cells",
                self.width, self.height
            )));
        }
        if self.bow_clearance < 0 || self.stern_clearance < 0 || self.block_spacing < 0 {
            return Err(Error::InvalidBoard(
                "clearances and spacing must not be negative".to_string(),
            ));
        }
        let cleared = self.bow_clearance.checked_add(self.stern_clearance);
        if cleared.map_or(true, |cleared| cleared >= self.width) {
            return Err(Error::InvalidBoard(format!(
                "bow ({}) and stern ({}) clearances leave no usable column on a width of {}",
                self.bow_clearance, self.stern_clearance, self.width
            )));
        }
        if !(self.grid_resolution > 0.0) {
            return Err(Error::InvalidBoard(format!(
                "grid resolution must be positive, got {}",
                self.grid_resolution
            )));
        }
        Ok(())
    }
}

/// Where and how a block ended up on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub id: String,
    pub block_type: BlockType,
    pub x: i32,
    pub y: i32,
    pub rotation: Rotation,
    pub width: i32,
    pub height: i32,
    pub area: usize,
}

/// Grid board owning the registered blocks and their placement state.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    config: BoardConfig,
    /// Row-major cells, each holding the owning block's slot.
    grid: Vec<Option<u32>>,
    /// Registered blocks indexed by slot.
    blocks: Vec<Block>,
    slots: FxHashMap<String, usize>,
    placed_count: usize,
    placed_area: usize,
}

impl Board {
    /// Creates an empty board. Fails if the configuration leaves no usable
    /// space.
    pub fn new(config: BoardConfig) -> Result<Self> {
        config.validate()?;
        let cell_count = (config.width * config.height) as usize;
        Ok(Self {
            config,
            grid: vec![None; cell_count],
            blocks: Vec::new(),
            slots: FxHashMap::default(),
            placed_count: 0,
            placed_area: 0,
        })
    }

    /// Registers blocks as unplaced.
    ///
    /// The batch is rejected as a whole if any id is already registered or
    /// repeated within the batch.
    pub fn add_blocks(&mut self, blocks: impl IntoIterator<Item = Block>) -> Result<()> {
        let blocks: Vec<Block> = blocks.into_iter().collect();
        let mut incoming: FxHashMap<&str, ()> = FxHashMap::default();
        for block in &blocks {
            if self.slots.contains_key(block.id()) || incoming.insert(block.id(), ()).is_some() {
                return Err(Error::DuplicateBlock {
                    id: block.id().to_string(),
                });
            }
        }

        for mut block in blocks {
            block.set_position(None);
            self.slots.insert(block.id().to_string(), self.blocks.len());
            self.blocks.push(block);
        }
        Ok(())
    }

    #[inline]
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.config.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.config.height
    }

    /// Total number of grid cells.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.grid.len()
    }

    /// Columns a block's bounding box may occupy: `[stern, width - bow)`.
    #[inline]
    pub fn usable_columns(&self) -> (i32, i32) {
        (
            self.config.stern_clearance,
            self.config.width - self.config.bow_clearance,
        )
    }

    /// All registered blocks in registration order.
    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.slots.get(id).map(|&slot| &self.blocks[slot])
    }

    pub fn placed_blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.blocks.iter().filter(|block| block.is_placed())
    }

    pub fn unplaced_blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.blocks.iter().filter(|block| !block.is_placed())
    }

    #[inline]
    pub fn placed_count(&self) -> usize {
        self.placed_count
    }

    #[inline]
    pub fn unplaced_count(&self) -> usize {
        self.blocks.len() - self.placed_count
    }

    #[inline]
    pub fn total_count(&self) -> usize {
        self.blocks.len()
    }

    /// Cells covered by placed blocks.
    #[inline]
    pub fn placed_area(&self) -> usize {
        self.placed_area
    }

    /// Fraction of registered blocks that are placed.
    pub fn placement_ratio(&self) -> f64 {
        if self.blocks.is_empty() {
            0.0
        } else {
            self.placed_count as f64 / self.blocks.len() as f64
        }
    }

    /// Fraction of board cells covered by placed blocks.
    pub fn utilization(&self) -> f64 {
        self.placed_area as f64 / self.grid.len() as f64
    }

    /// Equal-weight blend of placement ratio and utilization.
    pub fn score(&self) -> f64 {
        0.5 * self.placement_ratio() + 0.5 * self.utilization()
    }

    #[inline]
    pub fn in_bounds(&self, (x, y): Cell) -> bool {
        x >= 0 && y >= 0 && x < self.config.width && y < self.config.height
    }

    /// Whether `cell` lies on the board and is not owned by any block.
    #[inline]
    pub fn is_free(&self, cell: Cell) -> bool {
        self.in_bounds(cell) && self.grid[self.cell_index(cell)].is_none()
    }

    /// Whether `cell` lies on the board and is owned by a block.
    #[inline]
    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.in_bounds(cell) && self.grid[self.cell_index(cell)].is_some()
    }

    /// Id of the block owning `cell`.
    pub fn owner_at(&self, cell: Cell) -> Option<&str> {
        if !self.in_bounds(cell) {
            return None;
        }
        self.grid[self.cell_index(cell)].map(|slot| self.blocks[slot as usize].id())
    }

    /// Whether column `x` lies inside the bow or stern margin.
    #[inline]
    pub fn in_margin(&self, x: i32) -> bool {
        let (first, end) = self.usable_columns();
        x < first || x >= end
    }

    /// Checks whether `block`, in its current orientation, may be anchored
    /// at `(x, y)`.
    ///
    /// Checks run in order: bounds, overlap, bow/stern margins, spacing to
    /// every other placed block, and the delivery corridor for blocks that
    /// are not lowered by crane.
    pub fn can_place(&self, block: &Block, x: i32, y: i32) -> bool {
        let bounds = block.bounds_at(x, y);

        if x < 0 || y < 0 || bounds.right() > self.config.width || bounds.top() > self.config.height {
            return false;
        }

        if block
            .cells_at(x, y)
            .any(|cell| self.grid[self.cell_index(cell)].is_some())
        {
            return false;
        }

        let (first_column, end_column) = self.usable_columns();
        if x < first_column || bounds.right() > end_column {
            return false;
        }

        if !self.respects_spacing(block.id(), &bounds) {
            return false;
        }

        if block.kind().needs_corridor() && !self.corridor_is_clear(x, y, block.height()) {
            return false;
        }

        true
    }

    /// Places a registered, unplaced block at `(x, y)` in its current
    /// orientation. Returns `false` without changes when the placement is
    /// illegal or the id is not an unplaced block of this board.
    pub fn place(&mut self, id: &str, x: i32, y: i32) -> bool {
        match self.slots.get(id) {
            Some(&slot) => self.place_slot(slot, x, y),
            None => false,
        }
    }

    /// Takes a placed block off the board. Returns `false` if `id` is not
    /// currently placed.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.slots.get(id) {
            Some(&slot) => self.remove_slot(slot),
            None => false,
        }
    }

    /// Changes the orientation of an unplaced block.
    pub fn set_rotation(&mut self, id: &str, rotation: Rotation) -> bool {
        match self.slots.get(id) {
            Some(&slot) => self.blocks[slot].set_rotation(rotation),
            None => false,
        }
    }

    /// Snapshot of all placed blocks in registration order.
    pub fn placements(&self) -> Vec<Placement> {
        self.placed_blocks()
            .filter_map(|block| {
                let (x, y) = block.position()?;
                Some(Placement {
                    id: block.id().to_string(),
                    block_type: block.kind(),
                    x,
                    y,
                    rotation: block.rotation(),
                    width: block.width(),
                    height: block.height(),
                    area: block.area(),
                })
            })
            .collect()
    }

    /// Verifies that the grid, the counters and the block positions agree:
    /// every placed block owns exactly its translated footprint and no other
    /// cell is owned.
    pub fn is_consistent(&self) -> bool {
        let mut expected: Vec<Option<u32>> = vec![None; self.grid.len()];
        let mut placed = 0;
        let mut area = 0;
        for (slot, block) in self.blocks.iter().enumerate() {
            let Some(cells) = block.placed_cells() else {
                continue;
            };
            placed += 1;
            for cell in cells {
                if !self.in_bounds(cell) {
                    return false;
                }
                let index = self.cell_index(cell);
                if expected[index].is_some() {
                    return false;
                }
                expected[index] = Some(slot as u32);
                area += 1;
            }
        }
        expected == self.grid && placed == self.placed_count && area == self.placed_area
    }

    /// Renders the grid as text, top row first.
    ///
    /// Placed blocks show a glyph derived from their registration order,
    /// empty margin cells show `~` and other empty cells `.`.
    pub fn render(&self) -> String {
        let width = self.config.width as usize;
        let mut output = String::with_capacity((width + 1) * self.config.height as usize);
        for y in (0..self.config.height).rev() {
            for x in 0..self.config.width {
                let display_char = match self.grid[self.cell_index((x, y))] {
                    Some(slot) => slot_glyph(slot as usize),
                    None if self.in_margin(x) => '~',
                    None => '.',
                };
                output.push(display_char);
            }
            output.push('\n');
        }
        output
    }

    #[inline]
    pub(crate) fn block_at_slot(&self, slot: usize) -> &Block {
        &self.blocks[slot]
    }

    #[inline]
    pub(crate) fn set_rotation_slot(&mut self, slot: usize, rotation: Rotation) -> bool {
        self.blocks[slot].set_rotation(rotation)
    }

    pub(crate) fn place_slot(&mut self, slot: usize, x: i32, y: i32) -> bool {
        let block = &self.blocks[slot];
        if block.is_placed() || !self.can_place(block, x, y) {
            return false;
        }

        let owner = Some(slot as u32);
        for (dx, dy) in block.cells() {
            let index = self.cell_index((x + dx, y + dy));
            self.grid[index] = owner;
        }
        self.placed_area += block.area();
        self.placed_count += 1;
        self.blocks[slot].set_position(Some((x, y)));
        true
    }

    pub(crate) fn remove_slot(&mut self, slot: usize) -> bool {
        let block = &self.blocks[slot];
        let Some((x, y)) = block.position() else {
            return false;
        };

        for (dx, dy) in block.cells() {
            let index = self.cell_index((x + dx, y + dy));
            self.grid[index] = None;
        }
        self.placed_area -= block.area();
        self.placed_count -= 1;
        self.blocks[slot].set_position(None);
        true
    }

    #[inline]
    fn cell_index(&self, (x, y): Cell) -> usize {
        y as usize * self.config.width as usize + x as usize
    }

    fn respects_spacing(&self, id: &str, bounds: &Rect) -> bool {
        let spacing = self.config.block_spacing;
        if spacing == 0 {
            // cell overlap is already excluded, so touching and interlocking
            // footprints are fine
            return true;
        }
        self.placed_blocks()
            .filter(|other| other.id() != id)
            .filter_map(Block::placed_bounds)
            .all(|other| matches!(bounds.separation(&other), Some(gap) if gap >= spacing))
    }

    /// Whether every cell in columns `[0, x)` across rows `[y, y + rows)` is
    /// empty.
    fn corridor_is_clear(&self, x: i32, y: i32, rows: i32) -> bool {
        (y..y + rows).all(|row| (0..x).all(|column| self.grid[self.cell_index((column, row))].is_none()))
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Board {}x{}: {} placed, {} unplaced, score {:.4}",
            self.config.width,
            self.config.height,
            self.placed_count,
            self.unplaced_count(),
            self.score()
        )
    }
}

/// Display glyph for a block slot: `0-9`, then `A-Z`, then `a-z`, cycling.
fn slot_glyph(slot: usize) -> char {
    const GLYPHS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
    char::from(GLYPHS[slot % GLYPHS.len()])
}
