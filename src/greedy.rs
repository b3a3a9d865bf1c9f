//! First-fit placement without backtracking.

use std::time::Instant;

use crate::board::Board;
use crate::candidates::FillAxis;
use crate::solver::{Improvement, SearchOutcome, SearchStats};

/// Places blocks one by one, largest along the fill axis first, each at the
/// first legal anchor found scanning columns from the loading edge and rows
/// bottom up. Rotations are kept as registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GreedyPlacer {
    pub fill_axis: FillAxis,
}

impl GreedyPlacer {
    pub fn new(fill_axis: FillAxis) -> Self {
        Self { fill_axis }
    }

    pub fn run(&self, mut board: Board) -> SearchOutcome {
        let start = Instant::now();
        let mut stats = SearchStats::default();
        let mut improvements = Vec::new();

        let mut order: Vec<usize> = (0..board.total_count())
            .filter(|&slot| !board.block_at_slot(slot).is_placed())
            .collect();
        order.sort_by(|&a, &b| {
            let a = board.block_at_slot(a);
            let b = board.block_at_slot(b);
            self.fill_axis
                .extent(b.width(), b.height())
                .cmp(&self.fill_axis.extent(a.width(), a.height()))
                .then_with(|| b.area().cmp(&a.area()))
        });

        let (first_column, end_column) = board.usable_columns();
        for slot in order {
            stats.nodes_explored += 1;
            let (width, height) = {
                let block = board.block_at_slot(slot);
                (block.width(), block.height())
            };
            let anchor = (first_column..=end_column - width)
                .flat_map(|x| (0..=board.height() - height).map(move |y| (x, y)))
                .find(|&(x, y)| board.can_place(board.block_at_slot(slot), x, y));

            match anchor {
                Some((x, y)) => {
                    stats.placements_tried += 1;
                    if board.place_slot(slot, x, y) {
                        stats.improvements += 1;
                        improvements.push(Improvement {
                            placed: board.placed_count(),
                            score: board.score(),
                            elapsed: start.elapsed(),
                            nodes: stats.nodes_explored,
                        });
                    } else {
                        stats.placements_rejected += 1;
                    }
                }
                None => log::debug!("no legal anchor for block {}", board.block_at_slot(slot).id()),
            }
        }

        stats.elapsed = start.elapsed();
        log::info!(
            "greedy placement put {}/{} blocks on the board in {:.2?}",
            board.placed_count(),
            board.total_count(),
            stats.elapsed
        );

        SearchOutcome {
            board,
            stats,
            improvements,
            timed_out: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockType};
    use crate::board::BoardConfig;

    #[test]
    fn test_first_fit_order_and_anchors() {
        let mut board = Board::new(BoardConfig::new(6, 3)).unwrap();
        board
            .add_blocks([
                Block::rectangle("small", BlockType::Crane, 1, 1).unwrap(),
                Block::rectangle("tall", BlockType::Crane, 2, 3).unwrap(),
                Block::rectangle("flat", BlockType::Crane, 3, 2).unwrap(),
            ])
            .unwrap();

        let outcome = GreedyPlacer::new(FillAxis::Y).run(board);
        let board = &outcome.board;
        assert_eq!(board.block("tall").unwrap().position(), Some((0, 0)));
        assert_eq!(board.block("flat").unwrap().position(), Some((2, 0)));
        assert_eq!(
            board.block("small").unwrap().position(),
            Some((2, 2)),
            "Small block should take the first free cell scanning x then y"
        );
        assert_eq!(outcome.improvements.len(), 3);
        assert!(board.is_consistent());
    }

    #[test]
    fn test_blocks_that_do_not_fit_stay_unplaced() {
        let mut board = Board::new(BoardConfig::new(4, 2)).unwrap();
        board
            .add_blocks([
                Block::rectangle("A", BlockType::Crane, 3, 2).unwrap(),
                Block::rectangle("B", BlockType::Crane, 2, 2).unwrap(),
            ])
            .unwrap();

        let outcome = GreedyPlacer::default().run(board);
        assert_eq!(outcome.placed_count(), 1);
        assert_eq!(outcome.board.block("A").unwrap().position(), Some((0, 0)));
        assert!(!outcome.board.block("B").unwrap().is_placed());
    }
}
