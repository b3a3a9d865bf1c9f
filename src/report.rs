//! Placement summaries and their persistence.
//!
//! A run is saved as two files in one directory:
//! - `placement.json`: the `PlacementReport`, pretty-printed
//! - `placement.txt`: the same summary followed by the rendered board

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Placement};
use crate::error::Result;
use crate::solver::SearchOutcome;

const REPORT_JSON: &str = "placement.json";
const REPORT_TXT: &str = "placement.txt";

/// Outcome of one placement run in a serializable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementReport {
    pub name: String,
    pub placed_count: usize,
    pub total_count: usize,
    /// Placed blocks over registered blocks.
    pub success_rate: f64,
    pub score: f64,
    /// Covered cells over board cells.
    pub utilization: f64,
    pub placed: Vec<Placement>,
    pub unplaced: Vec<String>,
    pub elapsed_secs: f64,
    pub timed_out: bool,
}

impl PlacementReport {
    pub fn new(name: impl Into<String>, outcome: &SearchOutcome) -> Self {
        let board = &outcome.board;
        Self {
            name: name.into(),
            placed_count: board.placed_count(),
            total_count: board.total_count(),
            success_rate: board.placement_ratio(),
            score: board.score(),
            utilization: board.utilization(),
            placed: board.placements(),
            unplaced: board
                .unplaced_blocks()
                .map(|block| block.id().to_string())
                .collect(),
            elapsed_secs: outcome.stats.elapsed.as_secs_f64(),
            timed_out: outcome.timed_out,
        }
    }
}

impl std::fmt::Display for PlacementReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Placement: {}", self.name)?;
        writeln!(
            f,
            "  Placed:       {}/{} ({:.1}%)",
            self.placed_count,
            self.total_count,
            self.success_rate * 100.0
        )?;
        writeln!(f, "  Utilization:  {:.1}%", self.utilization * 100.0)?;
        writeln!(f, "  Score:        {:.4}", self.score)?;
        write!(f, "  Time:         {:.2}s", self.elapsed_secs)?;
        if self.timed_out {
            write!(f, " (time limit reached)")?;
        }
        writeln!(f)?;
        for placement in &self.placed {
            writeln!(
                f,
                "  {:<12} {:<8} at ({:>3}, {:>3}) {:>4} {}x{}",
                placement.id,
                placement.block_type,
                placement.x,
                placement.y,
                placement.rotation,
                placement.width,
                placement.height
            )?;
        }
        if !self.unplaced.is_empty() {
            writeln!(f, "  Unplaced: {}", self.unplaced.join(", "))?;
        }
        Ok(())
    }
}

/// Writes the report and the rendered board into `dir`, creating it if
/// needed.
pub fn save(report: &PlacementReport, board: &Board, dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    save_json(report, &dir.join(REPORT_JSON))?;
    save_text(report, board, &dir.join(REPORT_TXT))?;
    log::info!("wrote {} and {} to {}", REPORT_JSON, REPORT_TXT, dir.display());
    Ok(())
}

fn save_json(report: &PlacementReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}

fn save_text(report: &PlacementReport, board: &Board, path: &Path) -> Result<()> {
    let text = format!("{report}\n{}", board.render());
    fs::write(path, text)?;
    Ok(())
}

/// Reads a report saved by `save`.
pub fn load(dir: impl AsRef<Path>) -> Result<PlacementReport> {
    let text = fs::read_to_string(dir.as_ref().join(REPORT_JSON))?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::block::{Block, BlockType};
    use crate::board::BoardConfig;
    use crate::error::Error;
    use crate::solver::SearchStats;

    fn outcome() -> SearchOutcome {
        let mut board = Board::new(BoardConfig::new(5, 2)).unwrap();
        board
            .add_blocks([
                Block::rectangle("A", BlockType::Crane, 2, 2).unwrap(),
                Block::rectangle("B", BlockType::Trestle, 4, 2).unwrap(),
            ])
            .unwrap();
        assert!(board.place("A", 0, 0));
        SearchOutcome {
            board,
            stats: SearchStats {
                elapsed: Duration::from_millis(1500),
                ..SearchStats::default()
            },
            improvements: Vec::new(),
            timed_out: true,
        }
    }

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("blockyard-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_report_from_outcome() {
        let report = PlacementReport::new("Ship_A", &outcome());
        assert_eq!(report.placed_count, 1);
        assert_eq!(report.total_count, 2);
        assert_eq!(report.success_rate, 0.5);
        assert_eq!(report.utilization, 0.4);
        assert_eq!(report.unplaced, vec!["B".to_string()]);
        assert_eq!(report.placed[0].id, "A");
        assert_eq!(report.elapsed_secs, 1.5);
    }

    #[test]
    fn test_save_and_load() {
        let outcome = outcome();
        let report = PlacementReport::new("Ship_A", &outcome);
        let dir = scratch_dir("save");

        save(&report, &outcome.board, &dir).unwrap();
        assert_eq!(load(&dir).unwrap(), report);

        let text = fs::read_to_string(dir.join(REPORT_TXT)).unwrap();
        assert!(text.contains("Placed:       1/2 (50.0%)"));
        assert!(text.contains("time limit reached"));
        assert!(text.ends_with(&outcome.board.render()));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_missing_report() {
        let dir = scratch_dir("missing");
        assert!(matches!(load(&dir), Err(Error::Io(_))));
    }
}
