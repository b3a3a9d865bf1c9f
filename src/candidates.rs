//! Candidate position generation and heuristic scoring.
//!
//! Candidates come from three sources, unioned and de-duplicated by
//! `(x, y, rotation)`:
//! - a scan of every anchor where the block fits in its orientation,
//! - anchors next to the cells of already placed blocks (tight packing),
//! - origins of empty rectangles left between placed blocks (gap filling).
//!
//! Anchors reached through the adjacency or gap sources get a score bonus,
//! so at equal geometry the search tries tight and gap-filling moves first.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::board::Board;
use crate::geometry::{self, Rect, Rotation};

/// Score multiplier for anchors touching an already placed block.
const ADJACENCY_BONUS: f64 = 1.2;
/// Score multiplier for anchors at the origin of an empty rectangle.
const GAP_BONUS: f64 = 1.5;

const NEIGHBORS_4: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
const NEIGHBORS_8: [(i32, i32); 8] = [
    (0, 1),
    (1, 0),
    (0, -1),
    (-1, 0),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Axis along which the board is filled first.
///
/// With `Y`, blocks stack up a column (along y) before the fill front
/// advances in x away from the loading edge; `X` is the transpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillAxis {
    X,
    #[default]
    Y,
}

impl FillAxis {
    /// Extent of a `width × height` box along the fill axis.
    #[inline]
    pub const fn extent(self, width: i32, height: i32) -> i32 {
        match self {
            FillAxis::X => width,
            FillAxis::Y => height,
        }
    }

    /// Extent of a `width × height` box across the fill axis.
    #[inline]
    pub const fn cross_extent(self, width: i32, height: i32) -> i32 {
        match self {
            FillAxis::X => height,
            FillAxis::Y => width,
        }
    }

    /// Fraction of the board's fill-axis extent covered by the block.
    pub fn utilization(self, board: &Board, block: &Block) -> f64 {
        f64::from(self.extent(block.width(), block.height()))
            / f64::from(self.extent(board.width(), board.height()))
    }

    /// `(advance, along)` coordinates of an anchor, with the board extents
    /// in the same order.
    #[inline]
    fn split(self, x: i32, y: i32, width: i32, height: i32) -> ((i32, i32), (i32, i32)) {
        match self {
            FillAxis::X => ((y, height), (x, width)),
            FillAxis::Y => ((x, width), (y, height)),
        }
    }
}

/// Weights of the individual heuristic terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Reward for staying close to where the fill front starts.
    pub axis_priority: f64,
    /// Reward for hugging the low edge along the fill axis.
    pub alignment: f64,
    /// Reward for covering much of the fill-axis extent.
    pub axis_utilization: f64,
    /// Reward for flush contact with the fill-axis board edges.
    pub edge_bonus: f64,
    /// Fraction of perimeter touching occupied cells.
    pub adjacency: f64,
    /// Fraction of perimeter touching the outer wall.
    pub boundary: f64,
    /// Mild bias toward large blocks.
    pub area: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            axis_priority: 0.30,
            alignment: 0.20,
            axis_utilization: 0.25,
            edge_bonus: 0.10,
            adjacency: 0.10,
            boundary: 0.03,
            area: 0.02,
        }
    }
}

/// Cap on the number of candidates returned per call, growing with the
/// number of blocks already on the board.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateLimit {
    pub base: usize,
    /// Extra candidates allowed per placed block.
    pub per_placed: f64,
}

impl CandidateLimit {
    pub const fn new(base: usize, per_placed: f64) -> Self {
        Self { base, per_placed }
    }

    /// Effective cap with `placed` blocks on the board.
    #[inline]
    pub fn cap(&self, placed: usize) -> usize {
        self.base + (self.per_placed * placed as f64) as usize
    }
}

/// A scored placement option for one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub x: i32,
    pub y: i32,
    pub rotation: Rotation,
    pub score: f64,
}

/// Proposes ranked placement options for a block on a board.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateGenerator {
    pub fill_axis: FillAxis,
    pub weights: ScoreWeights,
    pub limit: Option<CandidateLimit>,
}

impl CandidateGenerator {
    pub fn new(fill_axis: FillAxis) -> Self {
        Self {
            fill_axis,
            ..Self::default()
        }
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_limit(mut self, limit: Option<CandidateLimit>) -> Self {
        self.limit = limit;
        self
    }

    /// Candidates over every distinct orientation of `block` that fits the
    /// board, best first.
    ///
    /// Orientations covering more of the fill axis are generated first, so
    /// they win ties in the final ranking.
    pub fn generate(&self, board: &Board, block: &Block) -> Vec<Candidate> {
        let mut variants: Vec<Block> = geometry::distinct_orientations(block.cells())
            .into_iter()
            .map(|(relative, _)| block.oriented(block.rotation().then(relative)))
            .filter(|variant| variant.width() <= board.width() && variant.height() <= board.height())
            .collect();
        variants.sort_by(|a, b| {
            let extent_a = self.fill_axis.extent(a.width(), a.height());
            let extent_b = self.fill_axis.extent(b.width(), b.height());
            extent_b.cmp(&extent_a)
        });
        self.collect(board, &variants)
    }

    /// Candidates for `block` in its current orientation only, best first.
    pub fn generate_oriented(&self, board: &Board, block: &Block) -> Vec<Candidate> {
        self.collect(board, std::slice::from_ref(block))
    }

    /// Heuristic score of anchoring `block` (current orientation) at
    /// `(x, y)`. Does not check legality.
    pub fn score(&self, board: &Board, block: &Block, x: i32, y: i32) -> f64 {
        let weights = &self.weights;
        let ((advance, advance_extent), (along, along_extent)) =
            self.fill_axis.split(x, y, board.width(), board.height());
        let block_along = self.fill_axis.extent(block.width(), block.height());

        let axis_priority = 1.0 - f64::from(advance) / f64::from(advance_extent);
        let alignment = 1.0 - f64::from(along) / f64::from(along_extent);
        let axis_utilization = self.fill_axis.utilization(board, block);

        let mut edge_bonus = 0.0;
        if along == 0 {
            edge_bonus += 0.1;
        }
        if along + block_along == along_extent {
            edge_bonus += 0.2;
        }

        let (adjacency, boundary) = perimeter_contact(board, block, x, y);
        let area = block.area() as f64 / board.cell_count() as f64;

        weights.axis_priority * axis_priority
            + weights.alignment * alignment
            + weights.axis_utilization * axis_utilization
            + weights.edge_bonus * edge_bonus
            + weights.adjacency * adjacency
            + weights.boundary * boundary
            + weights.area * area
    }

    fn collect(&self, board: &Board, variants: &[Block]) -> Vec<Candidate> {
        let mut pool = CandidatePool::default();
        let gaps = empty_rectangles(board);
        let (first_column, end_column) = board.usable_columns();

        for variant in variants {
            // exhaustive scan over anchors whose bounding box fits the usable area
            for x in first_column..=end_column - variant.width() {
                for y in 0..=board.height() - variant.height() {
                    self.offer(&mut pool, board, variant, x, y, 1.0);
                }
            }

            for placed in board.placed_blocks() {
                let Some(cells) = placed.placed_cells() else {
                    continue;
                };
                for (cx, cy) in cells {
                    for (dx, dy) in NEIGHBORS_8 {
                        let anchor = (cx + dx, cy + dy);
                        if board.in_bounds(anchor) {
                            self.offer(&mut pool, board, variant, anchor.0, anchor.1, ADJACENCY_BONUS);
                        }
                    }
                }
            }

            for gap in gaps
                .iter()
                .filter(|gap| gap.width >= variant.width() && gap.height >= variant.height())
            {
                self.offer(&mut pool, board, variant, gap.x, gap.y, GAP_BONUS);
            }
        }

        let mut candidates = pool.candidates;
        // stable sort: ties keep generation order
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        if let Some(limit) = self.limit {
            candidates.truncate(limit.cap(board.placed_count()));
        }
        candidates
    }

    fn offer(&self, pool: &mut CandidatePool, board: &Board, block: &Block, x: i32, y: i32, bonus: f64) {
        let key = (x, y, block.rotation());
        if let Some(&index) = pool.index.get(&key) {
            // already known to be legal; only a better source bonus matters
            let score = self.score(board, block, x, y) * bonus;
            let existing = &mut pool.candidates[index];
            if score > existing.score {
                existing.score = score;
            }
            return;
        }
        if !board.can_place(block, x, y) {
            return;
        }
        let score = self.score(board, block, x, y) * bonus;
        pool.index.insert(key, pool.candidates.len());
        pool.candidates.push(Candidate {
            x,
            y,
            rotation: block.rotation(),
            score,
        });
    }
}

#[derive(Default)]
struct CandidatePool {
    index: FxHashMap<(i32, i32, Rotation), usize>,
    candidates: Vec<Candidate>,
}

/// Fractions of the block's cell perimeter that touch occupied cells and the
/// outer wall, respectively, if anchored at `(x, y)`.
///
/// Occupancy is measured against in-board neighbor sides only; the wall
/// fraction against all sides.
fn perimeter_contact(board: &Board, block: &Block, x: i32, y: i32) -> (f64, f64) {
    let mut inside_sides = 0u32;
    let mut touching_sides = 0u32;
    let mut wall_sides = 0u32;
    for (cx, cy) in block.cells_at(x, y) {
        for (dx, dy) in NEIGHBORS_4 {
            let neighbor = (cx + dx, cy + dy);
            if board.in_bounds(neighbor) {
                inside_sides += 1;
                if board.is_occupied(neighbor) {
                    touching_sides += 1;
                }
            } else {
                wall_sides += 1;
            }
        }
    }
    let adjacency = if inside_sides == 0 {
        0.0
    } else {
        f64::from(touching_sides) / f64::from(inside_sides)
    };
    let boundary = f64::from(wall_sides) / f64::from(inside_sides + wall_sides);
    (adjacency, boundary)
}

/// Empty rectangles grown greedily from the lower-left corner cells of free
/// regions (free cells whose left and lower neighbors are occupied or off
/// the board): first along the row, then upward while the whole row span
/// stays free. Single free cells are skipped.
pub fn empty_rectangles(board: &Board) -> Vec<Rect> {
    let mut rectangles = Vec::new();
    for x in 0..board.width() {
        for y in 0..board.height() {
            if !board.is_free((x, y)) {
                continue;
            }
            // only start where the free region has a left and a bottom wall
            if board.is_free((x - 1, y)) || board.is_free((x, y - 1)) {
                continue;
            }

            let mut width = 1;
            while board.is_free((x + width, y)) {
                width += 1;
            }
            let mut height = 1;
            while (x..x + width).all(|column| board.is_free((column, y + height))) {
                height += 1;
            }

            if width > 1 || height > 1 {
                rectangles.push(Rect::new(x, y, width, height));
            }
        }
    }
    rectangles
}
