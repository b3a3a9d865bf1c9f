//! 2D grid geometry: quarter-turn rotations and bounding-box arithmetic.
//!
//! Footprints are sets of integer cells normalized so that the minimum x and
//! y are zero. A footprint has four orientations, one per quarter turn; each
//! turn is expressed relative to the current bounding box so that rotated
//! footprints stay normalized without a separate translation step.

use serde::{Deserialize, Serialize};

/// A grid cell `(x, y)`.
pub type Cell = (i32, i32);

/// Quarter-turn orientation of a block footprint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Rotation {
    #[default]
    #[serde(rename = "0")]
    Deg0,
    #[serde(rename = "90")]
    Deg90,
    #[serde(rename = "180")]
    Deg180,
    #[serde(rename = "270")]
    Deg270,
}

impl Rotation {
    /// All four orientations in increasing angle order.
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    /// Number of clockwise quarter turns (0-3).
    #[inline]
    pub const fn quarter_turns(self) -> u8 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 1,
            Rotation::Deg180 => 2,
            Rotation::Deg270 => 3,
        }
    }

    #[inline]
    pub const fn from_quarter_turns(turns: u8) -> Self {
        match turns % 4 {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    /// Angle in degrees.
    #[inline]
    pub const fn degrees(self) -> u16 {
        self.quarter_turns() as u16 * 90
    }

    /// Parses a multiple of 90 degrees (negative angles allowed).
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        Some(Self::from_quarter_turns(degrees.rem_euclid(360) as u8 / 90))
    }

    /// Applies `other` after `self`.
    #[inline]
    pub const fn then(self, other: Rotation) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + other.quarter_turns())
    }

    /// Whether this rotation exchanges width and height.
    #[inline]
    pub const fn swaps_axes(self) -> bool {
        self.quarter_turns() % 2 == 1
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Rotates one cell of a `width × height` normalized footprint.
///
/// The result lies inside the rotated bounding box (`height × width` for odd
/// turns), so no renormalization is needed afterwards.
#[inline]
pub const fn rotate_cell((x, y): Cell, rotation: Rotation, width: i32, height: i32) -> Cell {
    match rotation {
        Rotation::Deg0 => (x, y),
        Rotation::Deg90 => (height - 1 - y, x),
        Rotation::Deg180 => (width - 1 - x, height - 1 - y),
        Rotation::Deg270 => (y, width - 1 - x),
    }
}

/// Returns the bounding-box extents `(width, height)` of a set of cells.
///
/// An empty set has zero extents.
pub fn extents(cells: &[Cell]) -> (i32, i32) {
    let Some(&(first_x, first_y)) = cells.first() else {
        return (0, 0);
    };
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first_x, first_x, first_y, first_y);
    for &(x, y) in &cells[1..] {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    (max_x - min_x + 1, max_y - min_y + 1)
}

/// Translates cells so the minimum x and y values are zero, carrying each
/// cell's payload along.
///
/// Two footprints that differ only by translation normalize to the same set.
pub fn normalize_to_origin<T>(mut items: Vec<(Cell, T)>) -> Vec<(Cell, T)> {
    let min_x = items.iter().map(|&((x, _), _)| x).min().unwrap_or(0);
    let min_y = items.iter().map(|&((_, y), _)| y).min().unwrap_or(0);

    for ((x, y), _) in &mut items {
        *x -= min_x;
        *y -= min_y;
    }

    items
}

/// Rotates a normalized footprint, returning the sorted rotated cells.
pub fn rotate_cells(cells: &[Cell], rotation: Rotation) -> Vec<Cell> {
    let (width, height) = extents(cells);
    let mut rotated: Vec<Cell> = cells
        .iter()
        .map(|&cell| rotate_cell(cell, rotation, width, height))
        .collect();
    rotated.sort_unstable();
    rotated
}

/// Returns the distinct orientations of a normalized footprint.
///
/// Symmetric footprints produce fewer than four entries; the first rotation
/// reaching a given shape is kept.
pub fn distinct_orientations(cells: &[Cell]) -> Vec<(Rotation, Vec<Cell>)> {
    let mut orientations: Vec<(Rotation, Vec<Cell>)> = Vec::with_capacity(4);
    for rotation in Rotation::ALL {
        let rotated = rotate_cells(cells, rotation);
        if orientations.iter().all(|(_, seen)| *seen != rotated) {
            orientations.push((rotation, rotated));
        }
    }
    orientations
}

/// Axis-aligned rectangle in grid cells, `[x, x + width) × [y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    #[inline]
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive top edge.
    #[inline]
    pub const fn top(&self) -> i32 {
        self.y + self.height
    }

    /// Empty columns between the two rectangles; negative when their x
    /// ranges overlap, zero when they touch.
    #[inline]
    pub fn gap_x(&self, other: &Rect) -> i32 {
        (other.x - self.right()).max(self.x - other.right())
    }

    /// Empty rows between the two rectangles; negative when their y ranges
    /// overlap, zero when they touch.
    #[inline]
    pub fn gap_y(&self, other: &Rect) -> i32 {
        (other.y - self.top()).max(self.y - other.top())
    }

    /// Axis-separated clearance between two rectangles.
    ///
    /// When the rectangles overlap along one axis this is the gap along the
    /// other axis; when they are disjoint along both axes it is the smaller
    /// of the two gaps. Returns `None` if the rectangles overlap along both
    /// axes.
    pub fn separation(&self, other: &Rect) -> Option<i32> {
        let gap_x = self.gap_x(other);
        let gap_y = self.gap_y(other);
        match (gap_x < 0, gap_y < 0) {
            (true, true) => None,
            (true, false) => Some(gap_y),
            (false, true) => Some(gap_x),
            (false, false) => Some(gap_x.min(gap_y)),
        }
    }
}
