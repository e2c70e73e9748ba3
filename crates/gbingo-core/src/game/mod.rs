//! Draw engine and history ledger.
//!
//! Everything here is synchronous and transport-agnostic. [`Game`] is the
//! single state object; callers that share it across tasks go through
//! [`crate::service::GameService`], which serializes access.

mod engine;
mod ledger;
mod policy;
mod settings;

pub use engine::{DrawOutcome, Game, HistorySnapshot};
pub use ledger::{chunk_rows, Ledger, Position};
pub use settings::{DrawConfig, GenerationPolicy};

/// A drawn (or operator-supplied) number.
pub type Number = u32;

pub const MAX_ROW_WIDTH: usize = 100;
pub const MIN_LOW: Number = 1;
pub const MAX_HIGH: Number = 1000;
pub const MAX_DRAW_ROWS: usize = 5;
pub const MAX_FORCED: usize = 5;

/// Recoverable game rule violations.
///
/// Every operation that returns one of these leaves the game state untouched.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("game is not configured")]
    NotConfigured,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("row count must be between 1 and {MAX_DRAW_ROWS}, got {0}")]
    InvalidRowCount(usize),

    #[error("forced set must hold between 1 and {MAX_FORCED} values, got {0}")]
    InvalidForcedCount(usize),

    #[error("forced value {0} is outside the configured range")]
    ForcedOutOfRange(Number),

    #[error("forbidden list is empty")]
    EmptyForbiddenList,

    #[error("no numbers have been drawn yet")]
    EmptyLedger,

    #[error("every number in the range is forbidden")]
    RangeExhausted,
}
