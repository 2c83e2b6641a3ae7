//! Error types for the tactics core.
//!
//! The core is closed-world: invalid enum values cannot be constructed, and
//! malformed catalogs or snapshots are rejected at the boundary. Failures that
//! can happen *inside* a battle (not enough MP, healing a healthy target) are
//! domain results, see [`crate::abilities::AbilityError`], and never surface
//! here.

use thiserror::Error;

/// Result type alias using [`TacticsError`].
pub type Result<T> = std::result::Result<T, TacticsError>;

/// Top-level error type for boundary failures of the core.
#[derive(Debug, Error)]
pub enum TacticsError {
    /// Opponent catalog or loot table failed validation.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Orchestrator was driven out of order.
    #[error(transparent)]
    Run(#[from] RunError),

    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParse {
        /// File path or label of the data that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },

    /// Replay file could not be read, written or decoded.
    #[error("Replay error: {0}")]
    Replay(String),
}

/// Catalog validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Fewer entries than a full three-way offer needs.
    #[error("Opponent catalog needs at least {required} entries, found {found}")]
    TooFewOpponents {
        /// Minimum entry count.
        required: usize,
        /// Entries supplied.
        found: usize,
    },

    /// Two entries share an id.
    #[error("Duplicate opponent id: {0}")]
    DuplicateOpponent(String),

    /// An entry has no unit templates.
    #[error("Opponent '{0}' has no unit templates")]
    EmptyOpponent(String),

    /// Loot table has no common items to fall back on.
    #[error("Loot table has no common items")]
    NoCommonLoot,
}

/// Orchestrator misuse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// `fight` was called before an offer was generated.
    #[error("No opponent choices have been offered for battle {0}")]
    NoChoicesOffered(u32),

    /// The selected choice index is outside the three-way offer.
    #[error("Choice index {0} is out of range (expected 0..3)")]
    InvalidChoice(usize),

    /// Offered opponent id is missing from the catalog.
    #[error("Unknown opponent id: {0}")]
    UnknownOpponent(String),

    /// Snapshot fields contradict each other.
    #[error("Inconsistent run snapshot: {0}")]
    InconsistentSnapshot(String),
}
