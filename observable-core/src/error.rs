//! Error types for observable-core.
//!
//! Every failure surfaces at the call site of `observe` or `update`. There is
//! no internal error channel and nothing is retried.

use thiserror::Error;

use crate::reactive::CellId;

/// Errors produced while activating, updating, or notifying a cell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObservableError {
    /// The start function refused to activate the cell.
    #[error("start function failed: {reason}")]
    Start { reason: String },

    /// A transition or mapping function failed during `update`.
    #[error("transition failed: {reason}")]
    Transition { reason: String },

    /// A subscriber callback failed during a notification pass.
    #[error("subscriber failed: {reason}")]
    Handler { reason: String },

    /// The cell was asked to activate while its start function was running.
    #[error("cell {cell} re-entered while its start function was running")]
    Reentrant { cell: CellId },

    /// An update handle outlived the cell it was bound to.
    #[error("cell was released before the update arrived")]
    Released,
}

impl ObservableError {
    pub fn start(reason: impl Into<String>) -> Self {
        Self::Start { reason: reason.into() }
    }

    pub fn transition(reason: impl Into<String>) -> Self {
        Self::Transition { reason: reason.into() }
    }

    pub fn handler(reason: impl Into<String>) -> Self {
        Self::Handler { reason: reason.into() }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ObservableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_fill_reason() {
        assert_eq!(
            ObservableError::start("socket closed"),
            ObservableError::Start { reason: "socket closed".to_string() }
        );
        assert_eq!(
            ObservableError::transition("overflow").to_string(),
            "transition failed: overflow"
        );
    }

    #[test]
    fn reentrant_names_the_cell() {
        let cell = CellId::new();
        let message = ObservableError::Reentrant { cell }.to_string();
        assert!(message.contains(&cell.to_string()));
    }
}
