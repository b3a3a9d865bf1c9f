//! Ship Hull Block Placement Library
//!
//! Places irregular 2D hull blocks onto a rectangular ship deck grid under
//! bow/stern clearances, inter-block spacing and a loading-edge corridor
//! rule, using a time-bounded backtracking search.

pub mod block;
pub mod board;
pub mod candidates;
pub mod config;
pub mod error;
pub mod generator;
pub mod geometry;
pub mod greedy;
pub mod report;
pub mod solver;

pub use block::{Block, BlockType, HeightInterval};
pub use board::{Board, BoardConfig, Placement};
pub use candidates::{Candidate, CandidateGenerator, CandidateLimit, FillAxis, ScoreWeights};
pub use config::JobConfig;
pub use error::{Error, Result};
pub use geometry::{Cell, Rotation};
pub use greedy::GreedyPlacer;
pub use report::PlacementReport;
pub use solver::{BacktrackingSearch, SearchConfig, SearchMode, SearchOutcome, SearchStats};

/// A placement algorithm behind a trait object, so callers can pick one at
/// run time.
pub trait PlacementStrategy {
    fn name(&self) -> &'static str;
    /// Places the unplaced blocks of `board`, returning the best board found.
    fn place(&self, board: Board) -> SearchOutcome;
}

impl PlacementStrategy for BacktrackingSearch {
    fn name(&self) -> &'static str {
        match self.config().mode {
            SearchMode::Exhaustive => "exhaustive backtracking",
            SearchMode::Practical => "practical backtracking",
        }
    }

    fn place(&self, board: Board) -> SearchOutcome {
        self.run(board)
    }
}

impl PlacementStrategy for GreedyPlacer {
    fn name(&self) -> &'static str {
        "greedy first fit"
    }

    fn place(&self, board: Board) -> SearchOutcome {
        self.run(board)
    }
}

/// Builds a board from `config`, registers `blocks` and searches it.
pub fn place_blocks(
    config: BoardConfig,
    blocks: impl IntoIterator<Item = Block>,
    search: SearchConfig,
) -> Result<SearchOutcome> {
    let mut board = Board::new(config)?;
    board.add_blocks(blocks)?;
    Ok(BacktrackingSearch::new(search)?.run(board))
}
