//! Block sets for demos, tests and benchmarks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::block::{Block, BlockType, HeightInterval};
use crate::error::{Error, Result};
use crate::geometry::Cell;

/// Footprint families, each a predicate over the cells of a `w × h` box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeFamily {
    Rectangle,
    L,
    T,
    Z,
    U,
    Cross,
}

impl ShapeFamily {
    const ALL: [ShapeFamily; 6] = [
        ShapeFamily::Rectangle,
        ShapeFamily::L,
        ShapeFamily::T,
        ShapeFamily::Z,
        ShapeFamily::U,
        ShapeFamily::Cross,
    ];

    fn contains(self, (x, y): Cell, width: i32, height: i32) -> bool {
        let (mid_x, mid_y) = (width / 2, height / 2);
        match self {
            ShapeFamily::Rectangle => true,
            ShapeFamily::L => x < mid_x || y < mid_y,
            ShapeFamily::T => x == mid_x || y < mid_y,
            ShapeFamily::Z => (x < mid_x && y < mid_y) || (x >= mid_x && y >= mid_y),
            ShapeFamily::U => y == 0 || x == 0 || x == width - 1,
            ShapeFamily::Cross => x == mid_x || y == mid_y,
        }
    }
}

fn masked(
    id: &str,
    filled: u32,
    width: i32,
    height: i32,
    mask: impl Fn(i32, i32) -> bool,
) -> Result<Block> {
    let voxels = (0..width)
        .flat_map(|x| (0..height).map(move |y| (x, y)))
        .filter(|&(x, y)| mask(x, y))
        .map(|cell| (cell, HeightInterval::solid(filled)));
    Block::with_heights(id, BlockType::Unknown, voxels)
}

/// The fixed ten-block test set: L, bar, square, T, bar, Z, small L, U,
/// cross and H footprints.
pub fn predefined_blocks() -> Result<Vec<Block>> {
    Ok(vec![
        masked("B1", 2, 4, 3, |x, y| x < 2 || y < 1)?,
        masked("B2", 3, 3, 2, |_, _| true)?,
        masked("B3", 2, 2, 2, |_, _| true)?,
        masked("B4", 2, 3, 3, |x, y| x == 1 || y == 0)?,
        masked("B5", 2, 4, 2, |_, _| true)?,
        masked("B6", 2, 3, 3, |x, y| (x < 2 && y < 2) || (x > 0 && y > 0))?,
        masked("B7", 2, 2, 3, |x, y| x == 0 || y == 0)?,
        masked("B8", 2, 3, 3, |x, y| y == 0 || x == 0 || x == 2)?,
        masked("B9", 2, 3, 3, |x, y| x == 1 || y == 1)?,
        masked("B10", 2, 3, 3, |x, y| x == 0 || x == 2 || y == 1)?,
    ])
}

/// Seeded generator of irregular blocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomBlockGenerator {
    /// Probability of drawing a large block (half to full `max_size` per
    /// side) instead of a small one.
    pub large_block_bias: f64,
    /// Probability of dropping each footprint cell.
    pub hole_rate: f64,
}

impl Default for RandomBlockGenerator {
    fn default() -> Self {
        Self {
            large_block_bias: 0.7,
            hole_rate: 0.1,
        }
    }
}

impl RandomBlockGenerator {
    pub fn new(large_block_bias: f64, hole_rate: f64) -> Self {
        Self {
            large_block_bias: large_block_bias.clamp(0.0, 1.0),
            hole_rate: hole_rate.clamp(0.0, 1.0),
        }
    }

    /// Generates `count` blocks named `B1..`, with bounding boxes up to
    /// `max_size` cells per side. The same seed yields the same blocks.
    ///
    /// Fails when either probability lies outside `[0, 1]` or is NaN.
    pub fn generate(&self, count: usize, max_size: i32, seed: u64) -> Result<Vec<Block>> {
        for (name, probability) in [
            ("large_block_bias", self.large_block_bias),
            ("hole_rate", self.hole_rate),
        ] {
            if !(0.0..=1.0).contains(&probability) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be a probability in [0, 1], got {probability}"
                )));
            }
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let max_size = max_size.max(2);
        (1..=count)
            .map(|index| self.generate_one(&mut rng, &format!("B{index}"), max_size))
            .collect()
    }

    fn generate_one(&self, rng: &mut StdRng, id: &str, max_size: i32) -> Result<Block> {
        let (low, high) = if rng.gen_bool(self.large_block_bias) {
            ((max_size / 2).max(3).min(max_size), max_size)
        } else {
            (2, ((max_size as f64 * 0.4) as i32).clamp(2, max_size))
        };
        let width = rng.gen_range(low..=high);
        let height = rng.gen_range(low..=high);
        let family = ShapeFamily::ALL[rng.gen_range(0..ShapeFamily::ALL.len())];
        let kind = if rng.gen_bool(0.5) {
            BlockType::Crane
        } else {
            BlockType::Trestle
        };

        let mut voxels = Vec::new();
        for x in 0..width {
            for y in 0..height {
                if !family.contains((x, y), width, height) || rng.gen_bool(self.hole_rate) {
                    continue;
                }
                voxels.push(((x, y), HeightInterval::solid(rng.gen_range(1..=3))));
            }
        }
        if voxels.is_empty() {
            let cell = (rng.gen_range(0..width), rng.gen_range(0..height));
            voxels.push((cell, HeightInterval::solid(rng.gen_range(1..=3))));
        }

        Block::with_heights(id, kind, voxels)
    }
}
