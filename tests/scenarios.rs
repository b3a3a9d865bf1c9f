//! End-to-end placement scenarios and board invariants.

use std::collections::BTreeSet;
use std::time::Duration;

use blockyard::generator::{predefined_blocks, RandomBlockGenerator};
use blockyard::geometry::{rotate_cells, Cell};
use blockyard::{
    place_blocks, BacktrackingSearch, Block, BlockType, Board, BoardConfig, GreedyPlacer,
    PlacementStrategy, Rotation, SearchConfig, SearchMode,
};

fn crane(id: &str, width: i32, height: i32) -> Block {
    Block::rectangle(id, BlockType::Crane, width, height).unwrap()
}

fn trestle(id: &str, width: i32, height: i32) -> Block {
    Block::rectangle(id, BlockType::Trestle, width, height).unwrap()
}

fn as_crane(block: Block) -> Block {
    Block::with_heights(block.id(), BlockType::Crane, block.voxels()).unwrap()
}

fn board_with(config: BoardConfig, blocks: impl IntoIterator<Item = Block>) -> Board {
    let mut board = Board::new(config).unwrap();
    board.add_blocks(blocks).unwrap();
    board
}

/// Random crane blocks: no corridor rule, so every placement stays legal
/// against the final board.
fn random_crane_blocks(count: usize, seed: u64) -> Vec<Block> {
    RandomBlockGenerator::default()
        .generate(count, 5, seed)
        .unwrap()
        .into_iter()
        .map(as_crane)
        .collect()
}

fn strategies(time_limit: Duration) -> Vec<Box<dyn PlacementStrategy>> {
    vec![
        Box::new(BacktrackingSearch::new(SearchConfig::exhaustive(time_limit)).unwrap()),
        Box::new(BacktrackingSearch::new(SearchConfig::practical(time_limit)).unwrap()),
        Box::new(GreedyPlacer::default()),
    ]
}

#[test]
fn test_scenario_a_single_crane_block() {
    let outcome = place_blocks(
        BoardConfig::new(10, 10),
        [crane("A", 3, 3)],
        SearchConfig::exhaustive(Duration::from_secs(5)),
    )
    .unwrap();

    let (x, y) = outcome.board.block("A").unwrap().position().unwrap();
    assert!(x + 3 <= 10 && y + 3 <= 10);
    assert!((outcome.score() - 0.545).abs() < 1e-12, "score was {}", outcome.score());
    assert!(!outcome.timed_out);
}

#[test]
fn test_scenario_b_margins_leave_no_room() {
    for mode in [SearchMode::Exhaustive, SearchMode::Practical] {
        let outcome = place_blocks(
            BoardConfig::new(5, 5).with_clearances(2, 2),
            [trestle("A", 2, 2)],
            SearchConfig::for_mode(mode, Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(outcome.placed_count(), 0, "{mode} search placed a block");
        assert_eq!(outcome.board.total_count(), 1);
        assert_eq!(outcome.score(), 0.0);
    }
}

#[test]
fn test_scenario_c_spacing() {
    let mut board = board_with(
        BoardConfig::new(6, 2).with_spacing(1),
        [crane("A", 2, 2), crane("B", 2, 2)],
    );
    assert!(board.place("A", 0, 0));
    let b = board.block("B").unwrap().clone();
    assert!(!board.can_place(&b, 2, 0), "Touching boxes have gap 0");
    assert!(board.can_place(&b, 3, 0), "One free column is enough");

    let outcome = place_blocks(
        BoardConfig::new(6, 2).with_spacing(1),
        [crane("A", 2, 2), crane("B", 2, 2)],
        SearchConfig::exhaustive(Duration::from_secs(5)),
    )
    .unwrap();
    assert_eq!(outcome.placed_count(), 2);
}

#[test]
fn test_scenario_d_corridor() {
    let mut board = board_with(
        BoardConfig::new(6, 3),
        [trestle("T", 2, 3), crane("obstacle", 1, 1)],
    );
    let t = board.block("T").unwrap().clone();
    assert!(board.can_place(&t, 3, 0));

    assert!(board.place("obstacle", 1, 1));
    assert!(!board.can_place(&t, 3, 0), "Obstacle blocks the corridor");
    assert!(!board.place("T", 3, 0));

    assert!(board.remove("obstacle"));
    assert!(board.place("T", 3, 0));
}

#[test]
fn test_disjoint_and_consistent_after_search() {
    for seed in 0..4 {
        let blocks = random_crane_blocks(8, seed);
        let board = board_with(BoardConfig::new(14, 9).with_spacing(1), blocks);
        for strategy in strategies(Duration::from_millis(300)) {
            let outcome = strategy.place(board.clone());
            let mut seen: BTreeSet<Cell> = BTreeSet::new();
            for block in outcome.board.placed_blocks() {
                for cell in block.placed_cells().unwrap() {
                    assert!(seen.insert(cell), "{}: cell {:?} owned twice", strategy.name(), cell);
                }
            }
            assert_eq!(seen.len(), outcome.board.placed_area());
            assert!(outcome.board.is_consistent(), "{} left an inconsistent board", strategy.name());
        }
    }
}

#[test]
fn test_placed_blocks_satisfy_constraints() {
    let config = BoardConfig::new(16, 10).with_clearances(2, 1).with_spacing(1);
    let board = board_with(config, random_crane_blocks(10, 11));
    for strategy in strategies(Duration::from_millis(300)) {
        let outcome = strategy.place(board.clone());
        for placed in outcome.board.placed_blocks() {
            let (x, y) = placed.position().unwrap();
            let mut without = outcome.board.clone();
            assert!(without.remove(placed.id()));
            let block = without.block(placed.id()).unwrap().clone();
            assert!(
                without.can_place(&block, x, y),
                "{}: block {} violates a placement rule",
                strategy.name(),
                placed.id()
            );
            let bounds = placed.placed_bounds().unwrap();
            assert!(bounds.x >= 1 && bounds.right() <= 14, "Block {} is in a margin", placed.id());
        }
    }
}

/// Rebuilds `outcome` on an empty board, placing each block only after every
/// corridor block whose corridor it occupies. Every placement must be legal
/// at the moment it is made.
fn replay_in_corridor_order(outcome: &Board) -> usize {
    let mut replay = board_with(outcome.config().clone(), outcome.blocks().to_vec());
    let mut remaining: Vec<&Block> = outcome.placed_blocks().collect();

    let in_corridor_of = |cell: Cell, owner: &Block| {
        let (x, y) = owner.position().unwrap();
        owner.kind().needs_corridor() && cell.0 < x && cell.1 >= y && cell.1 < y + owner.height()
    };

    while !remaining.is_empty() {
        let next = remaining
            .iter()
            .position(|block| {
                let cells: Vec<Cell> = block.placed_cells().unwrap().collect();
                remaining.iter().all(|owner| {
                    owner.id() == block.id()
                        || !cells.iter().any(|&cell| in_corridor_of(cell, *owner))
                })
            })
            .expect("corridor precedence has no cycle");
        let block = remaining.remove(next);
        let (x, y) = block.position().unwrap();
        assert!(replay.set_rotation(block.id(), block.rotation()));
        assert!(
            replay.place(block.id(), x, y),
            "Block {} ({}) at ({x}, {y}) breaks a placement rule when placed in order",
            block.id(),
            block.kind().as_str()
        );
    }

    assert_eq!(replay.placements(), outcome.placements());
    outcome.placed_blocks().filter(|block| block.kind().needs_corridor()).count()
}

#[test]
fn test_trestle_blocks_keep_their_corridor() {
    let mut trestles_placed = 0;
    for seed in 0..4 {
        let blocks = RandomBlockGenerator::default().generate(10, 5, seed).unwrap();
        let config = BoardConfig::new(16, 10).with_clearances(2, 1).with_spacing(1);
        let board = board_with(config, blocks);
        for strategy in strategies(Duration::from_millis(300)) {
            let outcome = strategy.place(board.clone());
            trestles_placed += replay_in_corridor_order(&outcome.board);
        }
    }
    assert!(trestles_placed > 0, "No trestle block was placed by any strategy");
}

#[test]
fn test_partition_is_preserved() {
    let blocks = predefined_blocks().unwrap();
    let ids: BTreeSet<String> = blocks.iter().map(|block| block.id().to_string()).collect();
    let board = board_with(BoardConfig::new(12, 8), blocks);

    for strategy in strategies(Duration::from_millis(300)) {
        let outcome = strategy.place(board.clone());
        let placed: BTreeSet<String> = outcome
            .board
            .placed_blocks()
            .map(|block| block.id().to_string())
            .collect();
        let unplaced: BTreeSet<String> = outcome
            .board
            .unplaced_blocks()
            .map(|block| block.id().to_string())
            .collect();
        assert!(placed.is_disjoint(&unplaced));
        assert_eq!(&placed | &unplaced, ids);
        assert_eq!(placed.len(), outcome.placed_count());
    }
}

#[test]
fn test_place_then_remove_restores_board() {
    let mut board = board_with(
        BoardConfig::new(10, 6).with_spacing(1),
        predefined_blocks().unwrap().into_iter().map(as_crane),
    );
    assert!(board.place("B1", 0, 0));
    let before = board.clone();

    assert!(board.set_rotation("B6", Rotation::Deg90));
    let rotated = board.clone();
    assert!(board.place("B6", 6, 2));
    assert_ne!(board, rotated);
    assert!(board.remove("B6"));
    assert_eq!(board, rotated, "Remove should undo place exactly");

    assert!(board.set_rotation("B6", Rotation::Deg0));
    assert_eq!(board, before);
}

#[test]
fn test_rotation_closure() {
    for block in predefined_blocks().unwrap() {
        let original: Vec<Cell> = block.cells().to_vec();

        let mut turned = block.clone();
        for _ in 0..4 {
            assert!(turned.rotate(Rotation::Deg90));
        }
        assert_eq!(turned.cells(), original.as_slice());

        let twice = rotate_cells(&rotate_cells(&original, Rotation::Deg180), Rotation::Deg180);
        assert_eq!(twice, original, "Two half turns of {} differ", block.id());
    }
}

#[test]
fn test_improvement_trace_is_monotonic() {
    let board = board_with(BoardConfig::new(12, 8).with_spacing(1), random_crane_blocks(9, 5));
    let outcome = BacktrackingSearch::new(SearchConfig::exhaustive(Duration::from_millis(500)))
        .unwrap()
        .run(board);
    assert!(!outcome.improvements.is_empty());
    for pair in outcome.improvements.windows(2) {
        assert!(pair[1].score > pair[0].score, "Best score regressed: {:?}", pair);
        assert!(pair[1].elapsed >= pair[0].elapsed);
    }
    assert_eq!(outcome.improvements.last().unwrap().score, outcome.score());
}

#[test]
fn test_search_is_deterministic() {
    let blocks = vec![
        crane("A", 3, 2),
        crane("B", 2, 2),
        Block::new("L", BlockType::Crane, [(0, 0), (1, 0), (0, 1), (0, 2)]).unwrap(),
        crane("C", 1, 3),
    ];
    for mode in [SearchMode::Exhaustive, SearchMode::Practical] {
        let run = || {
            place_blocks(
                BoardConfig::new(8, 6),
                blocks.clone(),
                SearchConfig::for_mode(mode, Duration::from_secs(30)),
            )
            .unwrap()
        };
        let first = run();
        let second = run();
        assert!(!first.timed_out && !second.timed_out);
        assert_eq!(first.placed_count(), 4);
        assert_eq!(first.board.placements(), second.board.placements());
        assert_eq!(first.stats.nodes_explored, second.stats.nodes_explored);
    }
}

#[test]
fn test_deadline_returns_best_so_far() {
    let board = board_with(
        BoardConfig::new(20, 12).with_spacing(1),
        RandomBlockGenerator::default().generate(25, 6, 99).unwrap(),
    );
    let outcome = BacktrackingSearch::new(SearchConfig::exhaustive(Duration::from_millis(200)))
        .unwrap()
        .run(board);
    assert!(outcome.board.is_consistent());
    assert_eq!(outcome.board.total_count(), 25);
    assert_eq!(
        outcome.improvements.last().map_or(0, |last| last.placed),
        outcome.placed_count()
    );
}
