//! Hull block definitions.
//!
//! A block is a rotatable 2D footprint with per-cell height metadata (the
//! 2.5D representation produced by voxelizing the block mesh), a type tag
//! that selects how the block is brought onto the board, and a placement
//! state owned by the `Board` it is registered on.

use std::convert::Infallible;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{self, Cell, Rect, Rotation};

/// How a block is delivered onto the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    /// Lowered vertically; needs no access corridor.
    Crane,
    /// Rolled in on a transporter from the loading edge.
    Trestle,
    /// Treated like a trestle block.
    #[default]
    #[serde(other)]
    Unknown,
}

impl BlockType {
    /// Whether the block must roll in from the loading edge (x = 0) through
    /// empty cells.
    #[inline]
    pub const fn needs_corridor(self) -> bool {
        match self {
            BlockType::Crane => false,
            BlockType::Trestle | BlockType::Unknown => true,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            BlockType::Crane => "crane",
            BlockType::Trestle => "trestle",
            BlockType::Unknown => "unknown",
        }
    }
}

impl FromStr for BlockType {
    type Err = Infallible;

    /// Unrecognized names map to `Unknown`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "crane" => BlockType::Crane,
            "trestle" => BlockType::Trestle,
            _ => BlockType::Unknown,
        })
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vertical profile of one footprint column: empty space below the block,
/// filled height, and empty space above it, in grid units.
///
/// Reporting metadata only; placement legality never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct HeightInterval {
    pub empty_below: u32,
    pub filled: u32,
    pub empty_above: u32,
}

impl HeightInterval {
    #[inline]
    pub const fn new(empty_below: u32, filled: u32, empty_above: u32) -> Self {
        Self {
            empty_below,
            filled,
            empty_above,
        }
    }

    /// A column filled from the deck up with no gaps.
    #[inline]
    pub const fn solid(filled: u32) -> Self {
        Self::new(0, filled, 0)
    }
}

/// A hull block to be placed on a board.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    id: String,
    kind: BlockType,
    /// Unrotated footprint with heights, normalized and sorted by cell.
    base: Vec<(Cell, HeightInterval)>,
    rotation: Rotation,
    /// Footprint in the current orientation, normalized and sorted.
    cells: Vec<Cell>,
    width: i32,
    height: i32,
    position: Option<Cell>,
}

impl Block {
    /// Creates a block whose footprint columns are all one unit high.
    pub fn new(
        id: impl Into<String>,
        kind: BlockType,
        cells: impl IntoIterator<Item = Cell>,
    ) -> Result<Self> {
        Self::with_heights(
            id,
            kind,
            cells
                .into_iter()
                .map(|cell| (cell, HeightInterval::solid(1))),
        )
    }

    /// Creates a solid rectangular block.
    pub fn rectangle(id: impl Into<String>, kind: BlockType, width: i32, height: i32) -> Result<Self> {
        let cells = (0..width.max(0)).flat_map(|x| (0..height.max(0)).map(move |y| (x, y)));
        Self::new(id, kind, cells)
    }

    /// Creates a block from footprint cells carrying height metadata.
    ///
    /// Cells are translated so the footprint starts at the origin; repeated
    /// cells keep their first height entry. An empty footprint is rejected.
    pub fn with_heights(
        id: impl Into<String>,
        kind: BlockType,
        voxels: impl IntoIterator<Item = (Cell, HeightInterval)>,
    ) -> Result<Self> {
        let id = id.into();
        let voxels: Vec<(Cell, HeightInterval)> = voxels.into_iter().collect();
        if voxels.is_empty() {
            return Err(Error::EmptyFootprint { id });
        }

        let mut voxels = geometry::normalize_to_origin(voxels);
        // stable sort keeps the first occurrence of a repeated cell in front
        voxels.sort_by_key(|&(cell, _)| cell);
        voxels.dedup_by_key(|&mut (cell, _)| cell);

        let cells: Vec<Cell> = voxels.iter().map(|&(cell, _)| cell).collect();
        let (width, height) = geometry::extents(&cells);

        Ok(Self {
            id,
            kind,
            base: voxels,
            rotation: Rotation::Deg0,
            cells,
            width,
            height,
            position: None,
        })
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn kind(&self) -> BlockType {
        self.kind
    }

    #[inline]
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Board anchor of the bounding box, `None` while unplaced.
    #[inline]
    pub fn position(&self) -> Option<Cell> {
        self.position
    }

    #[inline]
    pub fn is_placed(&self) -> bool {
        self.position.is_some()
    }

    /// Bounding-box width in the current orientation.
    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Bounding-box height in the current orientation.
    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Footprint cells in the current orientation, relative to the anchor.
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Number of footprint cells.
    #[inline]
    pub fn area(&self) -> usize {
        self.cells.len()
    }

    /// Footprint area divided by bounding-box area.
    pub fn density(&self) -> f64 {
        self.area() as f64 / (self.width * self.height) as f64
    }

    /// Sum of filled heights over all footprint columns.
    pub fn total_volume(&self) -> u64 {
        self.base.iter().map(|(_, h)| u64::from(h.filled)).sum()
    }

    /// Footprint cells with their height metadata in the current orientation.
    pub fn voxels(&self) -> impl Iterator<Item = (Cell, HeightInterval)> + '_ {
        let (base_width, base_height) = self.base_extents();
        let rotation = self.rotation;
        self.base.iter().map(move |&(cell, heights)| {
            (
                geometry::rotate_cell(cell, rotation, base_width, base_height),
                heights,
            )
        })
    }

    /// Height metadata of the footprint column at `cell` (anchor-relative,
    /// current orientation).
    pub fn height_at(&self, cell: Cell) -> Option<HeightInterval> {
        self.voxels()
            .find(|&(voxel, _)| voxel == cell)
            .map(|(_, heights)| heights)
    }

    /// Bounding box if the block were anchored at `(x, y)`.
    #[inline]
    pub fn bounds_at(&self, x: i32, y: i32) -> Rect {
        Rect::new(x, y, self.width, self.height)
    }

    /// Footprint cells translated to the anchor `(x, y)`.
    #[inline]
    pub fn cells_at(&self, x: i32, y: i32) -> impl Iterator<Item = Cell> + '_ {
        self.cells.iter().map(move |&(dx, dy)| (x + dx, y + dy))
    }

    /// Board cells covered by the block, `None` while unplaced.
    pub fn placed_cells(&self) -> Option<impl Iterator<Item = Cell> + '_> {
        self.position.map(|(x, y)| self.cells_at(x, y))
    }

    /// Bounding box on the board, `None` while unplaced.
    pub fn placed_bounds(&self) -> Option<Rect> {
        self.position.map(|(x, y)| self.bounds_at(x, y))
    }

    /// Sets the orientation. Placed blocks cannot be rotated; returns
    /// `false` without changes in that case.
    pub fn set_rotation(&mut self, rotation: Rotation) -> bool {
        if self.position.is_some() {
            return false;
        }
        if rotation == self.rotation {
            return true;
        }
        let base_cells: Vec<Cell> = self.base.iter().map(|&(cell, _)| cell).collect();
        self.cells = geometry::rotate_cells(&base_cells, rotation);
        let (width, height) = self.base_extents();
        (self.width, self.height) = if rotation.swaps_axes() {
            (height, width)
        } else {
            (width, height)
        };
        self.rotation = rotation;
        true
    }

    /// Turns the block further by `by`.
    pub fn rotate(&mut self, by: Rotation) -> bool {
        self.set_rotation(self.rotation.then(by))
    }

    /// An unplaced copy in the given orientation.
    pub fn oriented(&self, rotation: Rotation) -> Block {
        let mut copy = self.clone();
        copy.position = None;
        copy.set_rotation(rotation);
        copy
    }

    #[inline]
    pub(crate) fn set_position(&mut self, position: Option<Cell>) {
        self.position = position;
    }

    fn base_extents(&self) -> (i32, i32) {
        if self.rotation.swaps_axes() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Block {}: {} cells, {}x{}, {}, rotation {}",
            self.id,
            self.area(),
            self.width,
            self.height,
            self.kind,
            self.rotation
        )
    }
}
