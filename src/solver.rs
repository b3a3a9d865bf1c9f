//! Time-bounded backtracking placement search.
//!
//! The search visits blocks in a fixed order. At each depth it tries every
//! candidate for the current block (place, recurse, remove) and then the
//! branch where the block is left unplaced, so partial packings are always
//! reachable. The live board is mutated in place and only cloned when the
//! best-so-far snapshot improves, which is checked on entry to every node.
//! That makes the search anytime: whenever the deadline hits, the best
//! snapshot is a valid answer.
//!
//! Two modes share the recursion:
//! - `Exhaustive` explores rotations as part of candidate generation and
//!   compares boards by `Board::score`.
//! - `Practical` fixes each block's rotation up front, uses a tighter
//!   candidate cap and compares lexicographically: more placed blocks wins,
//!   score breaks ties.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::candidates::{CandidateGenerator, CandidateLimit, FillAxis, ScoreWeights};
use crate::error::{Error, Result};
use crate::geometry::Rotation;

/// Which search flavor to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Exhaustive,
    Practical,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMode::Exhaustive => f.write_str("exhaustive"),
            SearchMode::Practical => f.write_str("practical"),
        }
    }
}

/// Summary of a board state used to rank solutions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quality {
    pub placed: usize,
    pub score: f64,
}

impl Quality {
    pub fn of(board: &Board) -> Self {
        Self {
            placed: board.placed_count(),
            score: board.score(),
        }
    }
}

/// Decides whether a board state beats the best one recorded so far.
pub trait SolutionComparator {
    /// Returns `true` only for a strict improvement.
    fn is_better(&self, candidate: Quality, incumbent: Quality) -> bool;
}

/// Ranks by `Board::score` alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedScore;

impl SolutionComparator for WeightedScore {
    #[inline]
    fn is_better(&self, candidate: Quality, incumbent: Quality) -> bool {
        candidate.score > incumbent.score
    }
}

/// Ranks by placed-block count, then by `Board::score`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MostPlaced;

impl SolutionComparator for MostPlaced {
    #[inline]
    fn is_better(&self, candidate: Quality, incumbent: Quality) -> bool {
        candidate.placed > incumbent.placed
            || (candidate.placed == incumbent.placed && candidate.score > incumbent.score)
    }
}

/// Where block rotations are decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationPolicy {
    /// Every distinct orientation is a search branch.
    Search,
    /// Each block is turned once before the search so that its shorter side
    /// lies along the fill axis, then kept as is.
    Fixed,
}

/// Search parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub mode: SearchMode,
    /// Wall-clock budget for one search call.
    pub time_limit: Duration,
    pub fill_axis: FillAxis,
    pub weights: ScoreWeights,
    /// Candidate cap per node; `None` keeps every candidate.
    pub limit: Option<CandidateLimit>,
}

impl SearchConfig {
    /// Full candidate lists (capped at 24, +1 per two placed blocks),
    /// rotations searched, weighted-score ranking.
    pub fn exhaustive(time_limit: Duration) -> Self {
        Self {
            mode: SearchMode::Exhaustive,
            time_limit,
            fill_axis: FillAxis::default(),
            weights: ScoreWeights::default(),
            limit: Some(CandidateLimit::new(24, 0.5)),
        }
    }

    /// Tight candidate lists (capped at 8, +1 per four placed blocks),
    /// rotations fixed up front, most-placed ranking.
    pub fn practical(time_limit: Duration) -> Self {
        Self {
            mode: SearchMode::Practical,
            limit: Some(CandidateLimit::new(8, 0.25)),
            ..Self::exhaustive(time_limit)
        }
    }

    pub fn for_mode(mode: SearchMode, time_limit: Duration) -> Self {
        match mode {
            SearchMode::Exhaustive => Self::exhaustive(time_limit),
            SearchMode::Practical => Self::practical(time_limit),
        }
    }

    pub fn with_fill_axis(mut self, fill_axis: FillAxis) -> Self {
        self.fill_axis = fill_axis;
        self
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_limit(mut self, limit: Option<CandidateLimit>) -> Self {
        self.limit = limit;
        self
    }

    /// Candidate generator configured from these parameters.
    pub fn generator(&self) -> CandidateGenerator {
        CandidateGenerator::new(self.fill_axis)
            .with_weights(self.weights)
            .with_limit(self.limit)
    }

    pub fn validate(&self) -> Result<()> {
        if self.time_limit.is_zero() {
            return Err(Error::InvalidConfig("time limit must be positive".to_string()));
        }
        if matches!(self.limit, Some(limit) if limit.base == 0) {
            return Err(Error::InvalidConfig(
                "candidate cap must allow at least one candidate".to_string(),
            ));
        }
        Ok(())
    }
}

/// Counters collected during one search call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Recursive calls that got past the deadline check.
    pub nodes_explored: u64,
    /// Placements undone after their subtree was explored.
    pub backtracks: u64,
    pub placements_tried: u64,
    /// Candidates that failed legality at placement time.
    pub placements_rejected: u64,
    /// Times the best snapshot was replaced.
    pub improvements: u64,
    pub max_depth: u64,
    pub elapsed: Duration,
}

impl SearchStats {
    #[inline]
    fn on_node_explored(&mut self, depth: usize) {
        self.nodes_explored = self.nodes_explored.saturating_add(1);
        self.max_depth = self.max_depth.max(depth as u64);
    }

    #[inline]
    fn on_backtrack(&mut self) {
        self.backtracks = self.backtracks.saturating_add(1);
    }

    #[inline]
    fn on_placement_tried(&mut self) {
        self.placements_tried = self.placements_tried.saturating_add(1);
    }

    #[inline]
    fn on_placement_rejected(&mut self) {
        self.placements_rejected = self.placements_rejected.saturating_add(1);
    }

    #[inline]
    fn on_improvement(&mut self) {
        self.improvements = self.improvements.saturating_add(1);
    }
}

impl std::fmt::Display for SearchStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Search statistics:")?;
        writeln!(f, "  Nodes explored:       {}", self.nodes_explored)?;
        writeln!(f, "  Backtracks:           {}", self.backtracks)?;
        writeln!(f, "  Max depth reached:    {}", self.max_depth)?;
        writeln!(f, "  Placements tried:     {}", self.placements_tried)?;
        writeln!(f, "  Placements rejected:  {}", self.placements_rejected)?;
        writeln!(f, "  Improvements:         {}", self.improvements)?;
        writeln!(f, "  Total time:           {:.2?}", self.elapsed)?;
        Ok(())
    }
}

/// One replacement of the best snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Improvement {
    pub placed: usize,
    pub score: f64,
    pub elapsed: Duration,
    /// Nodes explored when the improvement was found.
    pub nodes: u64,
}

/// Result of a placement run.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Best board seen; the initial board if nothing improved on it.
    pub board: Board,
    pub stats: SearchStats,
    /// Every improvement of the best snapshot, oldest first.
    pub improvements: Vec<Improvement>,
    /// Whether the deadline cut the search short.
    pub timed_out: bool,
}

impl SearchOutcome {
    #[inline]
    pub fn placed_count(&self) -> usize {
        self.board.placed_count()
    }

    #[inline]
    pub fn score(&self) -> f64 {
        self.board.score()
    }
}

/// Backtracking search over one board.
#[derive(Debug, Clone)]
pub struct BacktrackingSearch {
    config: SearchConfig,
    generator: CandidateGenerator,
}

impl BacktrackingSearch {
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;
        let generator = config.generator();
        Ok(Self { config, generator })
    }

    #[inline]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Runs the configured mode on `board`. Blocks already placed on the
    /// board stay where they are; the unplaced ones are searched.
    pub fn run(&self, board: Board) -> SearchOutcome {
        match self.config.mode {
            SearchMode::Exhaustive => self.run_with(board, &WeightedScore, RotationPolicy::Search),
            SearchMode::Practical => self.run_with(board, &MostPlaced, RotationPolicy::Fixed),
        }
    }

    /// Runs the search core with an explicit comparator and rotation policy.
    pub fn run_with<C: SolutionComparator>(
        &self,
        mut board: Board,
        comparator: &C,
        rotation: RotationPolicy,
    ) -> SearchOutcome {
        let start = Instant::now();
        let fill_axis = self.config.fill_axis;

        if rotation == RotationPolicy::Fixed {
            orient_shorter_side_along(&mut board, fill_axis);
        }
        let order = visiting_order(&board, fill_axis);
        warn_about_oversized(&board, &order);

        let fixed_count = board.placed_count();
        let mut search = Search {
            generator: &self.generator,
            comparator,
            rotation,
            order,
            start,
            deadline: start.checked_add(self.config.time_limit),
            best_quality: Quality::of(&board),
            best: board.clone(),
            stats: SearchStats::default(),
            improvements: Vec::new(),
            timed_out: false,
        };
        search.backtrack(&mut board, 0);
        debug_assert_eq!(board.placed_count(), fixed_count, "search leaked a placement");
        debug_assert!(board.is_consistent());

        search.stats.elapsed = start.elapsed();
        if search.timed_out {
            log::warn!(
                "{} search hit its {:.2?} deadline after {} nodes",
                self.config.mode,
                self.config.time_limit,
                search.stats.nodes_explored
            );
        }
        log::info!(
            "{} search placed {}/{} blocks, score {:.4}, {} nodes in {:.2?}",
            self.config.mode,
            search.best.placed_count(),
            search.best.total_count(),
            search.best_quality.score,
            search.stats.nodes_explored,
            search.stats.elapsed
        );

        SearchOutcome {
            board: search.best,
            stats: search.stats,
            improvements: search.improvements,
            timed_out: search.timed_out,
        }
    }
}

struct Search<'a, C> {
    generator: &'a CandidateGenerator,
    comparator: &'a C,
    rotation: RotationPolicy,
    /// Slots of the blocks to place, in visiting order.
    order: Vec<usize>,
    start: Instant,
    /// `None` when the time limit is too large to represent.
    deadline: Option<Instant>,
    best: Board,
    best_quality: Quality,
    stats: SearchStats,
    improvements: Vec<Improvement>,
    timed_out: bool,
}

impl<C: SolutionComparator> Search<'_, C> {
    fn backtrack(&mut self, board: &mut Board, depth: usize) {
        if self.should_stop() {
            return;
        }
        self.stats.on_node_explored(depth);
        self.record_if_better(board);

        if depth == self.order.len() {
            return;
        }

        let slot = self.order[depth];
        let block = board.block_at_slot(slot);
        let original_rotation = block.rotation();
        let candidates = match self.rotation {
            RotationPolicy::Search => self.generator.generate(board, block),
            RotationPolicy::Fixed => self.generator.generate_oriented(board, block),
        };

        for candidate in candidates {
            // the previous candidate's placement is already undone here
            if self.should_stop() {
                break;
            }
            self.stats.on_placement_tried();
            board.set_rotation_slot(slot, candidate.rotation);
            if board.place_slot(slot, candidate.x, candidate.y) {
                self.backtrack(board, depth + 1);
                board.remove_slot(slot);
                self.stats.on_backtrack();
            } else {
                self.stats.on_placement_rejected();
            }
        }
        board.set_rotation_slot(slot, original_rotation);

        // leave this block unplaced and continue with the next one
        self.backtrack(board, depth + 1);
    }

    fn record_if_better(&mut self, board: &Board) {
        let quality = Quality::of(board);
        if !self.comparator.is_better(quality, self.best_quality) {
            return;
        }
        self.best = board.clone();
        self.best_quality = quality;
        self.stats.on_improvement();
        let elapsed = self.start.elapsed();
        self.improvements.push(Improvement {
            placed: quality.placed,
            score: quality.score,
            elapsed,
            nodes: self.stats.nodes_explored,
        });
        log::debug!(
            "best improved: {} placed, score {:.4} after {} nodes ({:.2?})",
            quality.placed,
            quality.score,
            self.stats.nodes_explored,
            elapsed
        );
    }

    /// Deadline reached, or every block is placed in the best snapshot so
    /// nothing can beat it.
    fn should_stop(&mut self) -> bool {
        if self.timed_out || self.best_quality.placed == self.best.total_count() {
            return true;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.timed_out = true;
            }
        }
        self.timed_out
    }
}

/// Unplaced block slots sorted by fill-axis extent, footprint area and
/// density, all descending. Ties keep registration order.
pub(crate) fn visiting_order(board: &Board, fill_axis: FillAxis) -> Vec<usize> {
    let mut order: Vec<usize> = board
        .blocks()
        .iter()
        .enumerate()
        .filter(|(_, block)| !block.is_placed())
        .map(|(slot, _)| slot)
        .collect();
    order.sort_by(|&a, &b| {
        let a = board.block_at_slot(a);
        let b = board.block_at_slot(b);
        fill_axis
            .extent(b.width(), b.height())
            .cmp(&fill_axis.extent(a.width(), a.height()))
            .then_with(|| b.area().cmp(&a.area()))
            .then_with(|| b.density().total_cmp(&a.density()))
    });
    order
}

/// Turns unplaced blocks a quarter so the shorter bounding-box side lies
/// along the fill axis, when the turned block still fits between the
/// margins.
fn orient_shorter_side_along(board: &mut Board, fill_axis: FillAxis) {
    let (first_column, end_column) = board.usable_columns();
    let usable_width = end_column - first_column;
    for slot in 0..board.total_count() {
        let block = board.block_at_slot(slot);
        if block.is_placed() {
            continue;
        }
        let (width, height) = (block.width(), block.height());
        let fits_turned = height <= usable_width && width <= board.height();
        if fill_axis.extent(width, height) > fill_axis.cross_extent(width, height) && fits_turned {
            let turned = block.rotation().then(Rotation::Deg90);
            board.set_rotation_slot(slot, turned);
        }
    }
}

fn warn_about_oversized(board: &Board, order: &[usize]) {
    let (first_column, end_column) = board.usable_columns();
    let usable_width = end_column - first_column;
    for &slot in order {
        let block = board.block_at_slot(slot);
        let short = block.width().min(block.height());
        let long = block.width().max(block.height());
        let fits_upright = long <= usable_width && short <= board.height();
        let fits_turned = short <= usable_width && long <= board.height();
        if !fits_upright && !fits_turned {
            log::warn!(
                "block {} ({}x{}) cannot fit the {}x{} usable area in any orientation",
                block.id(),
                block.width(),
                block.height(),
                usable_width,
                board.height()
            );
        }
    }
}
