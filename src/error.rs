//! Engine error taxonomy.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or negative numeric input, rejected before any state change.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Duplicate purchase ID or double-commit of a footprint.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A remote response arrived after the local ledger advanced.
    #[error("stale sync response: ledger advanced from version {started} to {current}")]
    StaleSync { started: u64, current: u64 },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Carried alongside a working store when the durable medium could not be
/// opened and the session is running on an in-memory fallback. Non-fatal.
#[derive(Debug, Clone)]
pub struct DegradedModeWarning {
    pub reason: String,
}

impl fmt::Display for DegradedModeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ledger storage unavailable ({}); changes will not survive this session",
            self.reason
        )
    }
}
