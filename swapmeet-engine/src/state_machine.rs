//! Exchange status transition rules.
//!
//! ```text
//! pending ──accept──▶ in_progress ──both confirm──▶ completed
//!    │                    │
//!    ├──reject──▶ rejected │
//!    │                    │
//!    └──cancel──▶ cancelled ◀──cancel──┘
//! ```
//!
//! `accepted` is read as `in_progress` on both sides of every check.

use swapmeet_domain::ExchangeStatus;
use thiserror::Error;

/// Why a transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The exchange already reached a terminal status
    #[error("Cannot change status from {from}")]
    Terminal {
        /// Current (terminal) status
        from: ExchangeStatus,
    },

    /// The pair is not in the transition table
    #[error("Cannot change status from {from} to {to}")]
    NotAllowed {
        /// Current status (normalized)
        from: ExchangeStatus,
        /// Requested status (normalized)
        to: ExchangeStatus,
    },
}

/// Statuses reachable in one step from `current`.
///
/// Returns normalized statuses only; an empty slice means `current` is terminal.
pub fn allowed_next(current: ExchangeStatus) -> &'static [ExchangeStatus] {
    match current.normalized() {
        ExchangeStatus::Pending => &[
            ExchangeStatus::InProgress,
            ExchangeStatus::Rejected,
            ExchangeStatus::Cancelled,
        ],
        ExchangeStatus::InProgress => &[ExchangeStatus::Completed, ExchangeStatus::Cancelled],
        _ => &[],
    }
}

/// Decide whether `current -> desired` is legal.
///
/// Pure and total: every pair of statuses gets either `Ok(())` or a
/// descriptive error.
pub fn validate_transition(
    current: ExchangeStatus,
    desired: ExchangeStatus,
) -> Result<(), TransitionError> {
    let from = current.normalized();
    let to = desired.normalized();
    let next = allowed_next(from);

    if next.is_empty() {
        return Err(TransitionError::Terminal { from });
    }

    if next.contains(&to) {
        Ok(())
    } else {
        Err(TransitionError::NotAllowed { from, to })
    }
}

// =============================================================================
// Tests
// =============================================================================
