//! Error types for block placement.

use thiserror::Error;

/// Result type alias for placement operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration and I/O errors surfaced to the caller.
///
/// Placement legality is never reported through this type: `Board::can_place`,
/// `Board::place` and `Board::remove` answer with plain booleans.
#[derive(Debug, Error)]
pub enum Error {
    /// A block was defined without any footprint cell.
    #[error("block `{id}` has an empty footprint")]
    EmptyFootprint { id: String },

    /// Two blocks with the same id were registered on one board.
    #[error("block `{id}` is already registered on this board")]
    DuplicateBlock { id: String },

    /// An operation referenced a block id the board does not know.
    #[error("unknown block `{id}`")]
    UnknownBlock { id: String },

    /// Board dimensions or clearances are unusable.
    #[error("invalid board: {0}")]
    InvalidBoard(String),

    /// Search or job configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
