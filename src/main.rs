//! Ship Hull Block Placer
//!
//! Places hull blocks on a ship deck grid. Jobs come from JSON files or from
//! the built-in demo block sets; results are printed and saved as a JSON
//! report plus a text rendering of the deck.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use blockyard::generator::{self, RandomBlockGenerator};
use blockyard::report::{self, PlacementReport};
use blockyard::{
    BacktrackingSearch, Block, Board, BoardConfig, GreedyPlacer, JobConfig, PlacementStrategy,
    Result, SearchConfig, SearchMode,
};

/// Places ship hull blocks on a deck grid.
#[derive(Parser)]
#[command(name = "blockyard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a JSON job file and save the result.
    Solve {
        config: PathBuf,
        /// Overrides the search mode of the job file.
        #[arg(long, value_enum)]
        mode: Option<Strategy>,
        /// Overrides the time limit of the job file, in seconds.
        #[arg(long)]
        time_limit: Option<f64>,
        #[arg(long, default_value = "output")]
        out: PathBuf,
    },
    /// Run the built-in block set, or a random one.
    Demo(DemoArgs),
    /// Print a saved result.
    Show {
        #[arg(default_value = "output")]
        dir: PathBuf,
    },
}

#[derive(clap::Args, Default)]
struct DemoArgs {
    /// Generate this many random blocks instead of the fixed set.
    #[arg(long)]
    random: Option<usize>,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Largest random block side, in cells.
    #[arg(long, default_value_t = 8)]
    max_size: i32,
    #[arg(long, default_value_t = 15)]
    width: i32,
    #[arg(long, default_value_t = 10)]
    height: i32,
    #[arg(long, value_enum, default_value_t = Strategy::Exhaustive)]
    mode: Strategy,
    #[arg(long, default_value_t = 10.0)]
    time_limit: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum Strategy {
    #[default]
    Exhaustive,
    Practical,
    /// First fit, no backtracking.
    Greedy,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Command::Solve {
            config,
            mode,
            time_limit,
            out,
        }) => run_solve(&config, mode, time_limit, &out),
        Some(Command::Demo(args)) => run_demo(&args),
        Some(Command::Show { dir }) => run_show(&dir),
        None => run_demo(&DemoArgs {
            seed: 42,
            max_size: 8,
            width: 15,
            height: 10,
            time_limit: 10.0,
            ..DemoArgs::default()
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Runs a job file, prints the result and saves it to `out`.
fn run_solve(config: &Path, mode: Option<Strategy>, time_limit: Option<f64>, out: &Path) -> Result<()> {
    let mut job = JobConfig::from_file(config)?;
    if let Some(secs) = time_limit {
        job.search.time_limit_secs = secs;
    }
    let strategy = match mode {
        Some(Strategy::Exhaustive) => {
            job.search.mode = SearchMode::Exhaustive;
            Strategy::Exhaustive
        }
        Some(Strategy::Practical) => {
            job.search.mode = SearchMode::Practical;
            Strategy::Practical
        }
        Some(Strategy::Greedy) => Strategy::Greedy,
        None => match job.search.mode {
            SearchMode::Exhaustive => Strategy::Exhaustive,
            SearchMode::Practical => Strategy::Practical,
        },
    };

    let board = job.build_board()?;
    let placer = build_strategy(strategy, job.search_config()?)?;
    let (summary, board) = place_and_print(&job.name, placer.as_ref(), board);
    report::save(&summary, &board, out)?;
    println!("Wrote {}", out.display());
    Ok(())
}

/// Runs the predefined or a random block set on an unconstrained board.
fn run_demo(args: &DemoArgs) -> Result<()> {
    let blocks: Vec<Block> = match args.random {
        Some(count) => RandomBlockGenerator::default().generate(count, args.max_size, args.seed)?,
        None => generator::predefined_blocks()?,
    };
    let mut board = Board::new(BoardConfig::new(args.width, args.height))?;
    board.add_blocks(blocks)?;

    let time_limit = Duration::try_from_secs_f64(args.time_limit)
        .map_err(|e| blockyard::Error::InvalidConfig(e.to_string()))?;
    let search = match args.mode {
        Strategy::Practical => SearchConfig::practical(time_limit),
        Strategy::Exhaustive | Strategy::Greedy => SearchConfig::exhaustive(time_limit),
    };
    let placer = build_strategy(args.mode, search)?;
    place_and_print("demo", placer.as_ref(), board);
    Ok(())
}

/// Prints a saved report and its rendered board.
fn run_show(dir: &Path) -> Result<()> {
    let report = report::load(dir)?;
    println!("{report}");
    if let Ok(text) = std::fs::read_to_string(dir.join("placement.txt")) {
        if let Some((_, grid)) = text.split_once("\n\n") {
            print!("{grid}");
        }
    }
    Ok(())
}

fn build_strategy(strategy: Strategy, search: SearchConfig) -> Result<Box<dyn PlacementStrategy>> {
    Ok(match strategy {
        Strategy::Greedy => Box::new(GreedyPlacer::new(search.fill_axis)),
        Strategy::Exhaustive | Strategy::Practical => Box::new(BacktrackingSearch::new(search)?),
    })
}

fn place_and_print(name: &str, placer: &dyn PlacementStrategy, board: Board) -> (PlacementReport, Board) {
    println!(
        "Placing {} blocks on a {}x{} board ({})",
        board.total_count(),
        board.width(),
        board.height(),
        placer.name()
    );
    let outcome = placer.place(board);
    let report = PlacementReport::new(name, &outcome);
    println!("{report}");
    print!("{}", outcome.board.render());
    println!("{}", outcome.stats);
    (report, outcome.board)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_places_predefined_set() {
        let mut board = Board::new(BoardConfig::new(15, 10)).unwrap();
        board.add_blocks(generator::predefined_blocks().unwrap()).unwrap();
        let placer = build_strategy(
            Strategy::Practical,
            SearchConfig::practical(Duration::from_secs(2)),
        )
        .unwrap();
        let (report, board) = place_and_print("demo", placer.as_ref(), board);
        assert!(report.placed_count > 0);
        assert_eq!(report.placed_count + report.unplaced.len(), 10);
        assert!(board.is_consistent());
    }

    #[test]
    fn test_cli_parses_solve() {
        let cli = Cli::parse_from([
            "blockyard",
            "solve",
            "job.json",
            "--mode",
            "greedy",
            "--time-limit",
            "2.5",
        ]);
        match cli.command {
            Some(Command::Solve {
                config,
                mode,
                time_limit,
                out,
            }) => {
                assert_eq!(config, PathBuf::from("job.json"));
                assert_eq!(mode, Some(Strategy::Greedy));
                assert_eq!(time_limit, Some(2.5));
                assert_eq!(out, PathBuf::from("output"));
            }
            _ => panic!("Expected the solve subcommand"),
        }
    }
}
