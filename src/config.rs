//! JSON job files: board parameters, search parameters and the block list.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockType, HeightInterval};
use crate::board::{Board, BoardConfig};
use crate::candidates::{CandidateLimit, FillAxis, ScoreWeights};
use crate::error::{Error, Result};
use crate::geometry::Rotation;
use crate::solver::{SearchConfig, SearchMode};

fn default_name() -> String {
    "unnamed".to_string()
}

/// One placement job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub board: BoardConfig,
    #[serde(default)]
    pub search: SearchSettings,
    pub blocks: Vec<BlockSpec>,
    /// Blocks placed before the search starts; they are never moved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixed: Vec<FixedPlacement>,
}

/// Search parameters as written in a job file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub mode: SearchMode,
    pub time_limit_secs: f64,
    pub fill_axis: FillAxis,
    /// Overrides the base candidate cap of the mode preset.
    pub max_candidates: Option<usize>,
    pub weights: ScoreWeights,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            time_limit_secs: 60.0,
            fill_axis: FillAxis::default(),
            max_candidates: None,
            weights: ScoreWeights::default(),
        }
    }
}

/// A block definition: either a solid rectangle or an explicit cell list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: BlockType,
    #[serde(flatten)]
    pub shape: ShapeSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShapeSpec {
    /// Footprint cells with optional `[empty_below, filled, empty_above]`
    /// per cell; cells default to one unit high.
    Cells {
        cells: Vec<[i32; 2]>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        heights: Option<Vec<[u32; 3]>>,
    },
    Rectangle {
        width: i32,
        height: i32,
    },
}

impl BlockSpec {
    pub fn to_block(&self) -> Result<Block> {
        match &self.shape {
            ShapeSpec::Rectangle { width, height } => {
                Block::rectangle(self.id.as_str(), self.kind, *width, *height)
            }
            ShapeSpec::Cells { cells, heights } => {
                let heights: Vec<HeightInterval> = match heights {
                    Some(heights) if heights.len() != cells.len() => {
                        return Err(Error::InvalidConfig(format!(
                            "block `{}` has {} cells but {} height entries",
                            self.id,
                            cells.len(),
                            heights.len()
                        )));
                    }
                    Some(heights) => heights
                        .iter()
                        .map(|&[below, filled, above]| HeightInterval::new(below, filled, above))
                        .collect(),
                    None => vec![HeightInterval::solid(1); cells.len()],
                };
                let voxels = cells.iter().map(|&[x, y]| (x, y)).zip(heights);
                Block::with_heights(self.id.as_str(), self.kind, voxels)
            }
        }
    }
}

/// A block pinned at a given anchor and rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedPlacement {
    pub id: String,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub rotation: Rotation,
}

impl JobConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses a job and checks the search settings.
    pub fn from_json(text: &str) -> Result<Self> {
        let job: JobConfig = serde_json::from_str(text)?;
        job.search_config()?;
        Ok(job)
    }

    /// Board with every block registered and the fixed blocks placed.
    pub fn build_board(&self) -> Result<Board> {
        let mut board = Board::new(self.board.clone())?;
        let blocks = self
            .blocks
            .iter()
            .map(BlockSpec::to_block)
            .collect::<Result<Vec<_>>>()?;
        board.add_blocks(blocks)?;

        for pin in &self.fixed {
            if board.block(&pin.id).is_none() {
                return Err(Error::UnknownBlock { id: pin.id.clone() });
            }
            board.set_rotation(&pin.id, pin.rotation);
            if !board.place(&pin.id, pin.x, pin.y) {
                return Err(Error::InvalidConfig(format!(
                    "fixed block `{}` cannot be placed at ({}, {}) rotated {}",
                    pin.id, pin.x, pin.y, pin.rotation
                )));
            }
        }
        Ok(board)
    }

    pub fn search_config(&self) -> Result<SearchConfig> {
        let settings = &self.search;
        let time_limit = Duration::try_from_secs_f64(settings.time_limit_secs).map_err(|_| {
            Error::InvalidConfig(format!(
                "time limit must be a finite number of seconds, got {}",
                settings.time_limit_secs
            ))
        })?;

        let mut config = SearchConfig::for_mode(settings.mode, time_limit)
            .with_fill_axis(settings.fill_axis)
            .with_weights(settings.weights);
        if let Some(base) = settings.max_candidates {
            let per_placed = config.limit.map_or(0.0, |limit| limit.per_placed);
            config = config.with_limit(Some(CandidateLimit::new(base, per_placed)));
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIP_A: &str = r#"{
        "name": "Ship_A",
        "board": { "width": 42, "height": 18, "bow_clearance": 2,
                   "stern_clearance": 0, "block_spacing": 1,
                   "grid_resolution": 2.0 },
        "search": { "mode": "practical", "time_limit_secs": 30.0,
                    "fill_axis": "y", "max_candidates": 8 },
        "blocks": [
            { "id": "B1", "type": "crane", "width": 4, "height": 3 },
            { "id": "B2", "type": "trestle",
              "cells": [[0,0],[1,0],[0,1]],
              "heights": [[0,2,0],[0,2,0],[0,1,1]] }
        ]
    }"#;

    #[test]
    fn test_parse_job() {
        let job = JobConfig::from_json(SHIP_A).unwrap();
        assert_eq!(job.name, "Ship_A");
        assert_eq!(job.board.bow_clearance, 2);
        assert_eq!(job.search.mode, SearchMode::Practical);

        let board = job.build_board().unwrap();
        assert_eq!(board.total_count(), 2);
        let b1 = board.block("B1").unwrap();
        assert_eq!((b1.width(), b1.height(), b1.kind()), (4, 3, BlockType::Crane));
        let b2 = board.block("B2").unwrap();
        assert_eq!(b2.area(), 3);
        assert_eq!(b2.height_at((0, 1)), Some(HeightInterval::new(0, 1, 1)));

        let search = job.search_config().unwrap();
        assert_eq!(search.time_limit, Duration::from_secs(30));
        assert_eq!(search.limit, Some(CandidateLimit::new(8, 0.25)));
    }

    #[test]
    fn test_defaults_and_unknown_type() {
        let job = JobConfig::from_json(
            r#"{ "board": { "width": 10, "height": 5 },
                 "blocks": [ { "id": "X", "type": "barge", "width": 2, "height": 2 },
                             { "id": "Y", "cells": [[3,3],[4,3]] } ] }"#,
        )
        .unwrap();
        assert_eq!(job.name, "unnamed");
        assert_eq!(job.board.grid_resolution, 1.0);
        assert_eq!(job.search, SearchSettings::default());

        let board = job.build_board().unwrap();
        assert_eq!(board.block("X").unwrap().kind(), BlockType::Unknown);
        assert_eq!(board.block("Y").unwrap().kind(), BlockType::Unknown);
        assert_eq!(board.block("Y").unwrap().cells(), &[(0, 0), (1, 0)]);
    }

    #[test]
    fn test_invalid_jobs() {
        let zero_time = r#"{ "board": { "width": 10, "height": 5 },
                             "search": { "time_limit_secs": 0.0 }, "blocks": [] }"#;
        assert!(matches!(JobConfig::from_json(zero_time), Err(Error::InvalidConfig(_))));

        let zero_cap = r#"{ "board": { "width": 10, "height": 5 },
                            "search": { "max_candidates": 0 }, "blocks": [] }"#;
        assert!(matches!(JobConfig::from_json(zero_cap), Err(Error::InvalidConfig(_))));

        let mismatched = JobConfig::from_json(
            r#"{ "board": { "width": 10, "height": 5 },
                 "blocks": [ { "id": "Z", "cells": [[0,0],[1,0]], "heights": [[0,1,0]] } ] }"#,
        )
        .unwrap();
        assert!(matches!(mismatched.build_board(), Err(Error::InvalidConfig(_))));

        let empty = JobConfig::from_json(
            r#"{ "board": { "width": 10, "height": 5 },
                 "blocks": [ { "id": "E", "cells": [] } ] }"#,
        )
        .unwrap();
        assert!(matches!(empty.build_board(), Err(Error::EmptyFootprint { .. })));

        let narrow = JobConfig::from_json(
            r#"{ "board": { "width": 4, "height": 5, "bow_clearance": 2, "stern_clearance": 2 },
                 "blocks": [] }"#,
        )
        .unwrap();
        assert!(matches!(narrow.build_board(), Err(Error::InvalidBoard(_))));

        assert!(matches!(JobConfig::from_json("{ not json"), Err(Error::Json(_))));
    }

    #[test]
    fn test_fixed_blocks() {
        let job = JobConfig::from_json(
            r#"{ "board": { "width": 6, "height": 4 },
                 "blocks": [ { "id": "A", "type": "crane", "width": 1, "height": 3 } ],
                 "fixed": [ { "id": "A", "x": 2, "y": 1, "rotation": "90" } ] }"#,
        )
        .unwrap();
        let board = job.build_board().unwrap();
        let a = board.block("A").unwrap();
        assert_eq!(a.position(), Some((2, 1)));
        assert_eq!((a.width(), a.height()), (3, 1));

        let unknown = JobConfig::from_json(
            r#"{ "board": { "width": 6, "height": 4 }, "blocks": [],
                 "fixed": [ { "id": "ghost", "x": 0, "y": 0 } ] }"#,
        )
        .unwrap();
        assert!(matches!(unknown.build_board(), Err(Error::UnknownBlock { .. })));
    }
}
