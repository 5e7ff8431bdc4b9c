use thiserror::Error;

/// Failures of a placement operation. Every variant aborts the whole batch:
/// the binder is left exactly as it was before the operation started.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlacementError {
    /// Not enough free slots for the requested cards.
    #[error("Binder capacity exceeded: {requested} cards requested, {remaining} slots remaining")]
    LimitExceeded { requested: usize, remaining: usize },

    /// The placement would need more logical pages than the binder allows.
    #[error("Binder would need {required} pages, maximum is {max_pages}")]
    PageLimitExceeded { required: u32, max_pages: u32 },

    /// Two entries resolved to the same slot. Indicates an engine defect.
    #[error("Position conflict at slot {position}")]
    PositionConflict { position: usize },

    /// Shifting a slot would move it past the last addressable position.
    #[error("Position {position} cannot be shifted by {by} slots")]
    PositionOverflow { position: usize, by: usize },

    /// A newer conflicting write committed first; the pending result is void.
    #[error("Stale operation: expected binder version {expected}, found {found}")]
    StaleOperation { expected: u64, found: u64 },

    #[error("No card at position {0}")]
    EmptyPosition(usize),

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Invalid expansion: {0}")]
    InvalidExpansion(String),
}
