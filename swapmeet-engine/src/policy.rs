//! Lifecycle rules that sit next to the transition table.
//!
//! Everything here is a pure function of documents already read inside the
//! caller's transaction.

use swapmeet_domain::{Exchange, ExchangeStatus, ItemStatus, Role};

// =============================================================================
// Cancellation
// =============================================================================

/// Whether a cancellation by `role` needs a written reason.
///
/// The owner must always explain. The requester may walk away from a bare
/// request silently, but must explain once the owner has accepted.
pub fn cancel_reason_required(role: Role, status: ExchangeStatus) -> bool {
    match role {
        Role::Owner => true,
        Role::Requester => status.normalized() != ExchangeStatus::Pending,
    }
}

/// Trim a free-text reason, treating blank input as absent.
pub fn normalize_reason(reason: Option<&str>) -> Option<String> {
    reason.map(str::trim).filter(|r| !r.is_empty()).map(str::to_string)
}

// =============================================================================
// Item release
// =============================================================================

/// Item status to write when one exchange stops holding the item.
///
/// `other_active` counts active exchanges on the same item excluding the one
/// being closed. `None` means leave the item as it is. A completed item is
/// never reopened.
pub fn item_status_after_release(current: ItemStatus, other_active: usize) -> Option<ItemStatus> {
    match (current, other_active) {
        (ItemStatus::Pending, 0) => Some(ItemStatus::Available),
        _ => None,
    }
}

// =============================================================================
// Confirmation handshake
// =============================================================================

/// Outcome of one party confirming the hand-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The flag was already set; write nothing
    AlreadyConfirmed {
        /// Whether the other side had confirmed too
        both_confirmed: bool,
    },
    /// Set the flag; promote to completed if `both_confirmed`
    Recorded {
        /// Whether this confirmation completes the handshake
        both_confirmed: bool,
    },
}

impl Confirmation {
    /// Both flags are (or will be) set
    pub fn both_confirmed(&self) -> bool {
        match self {
            Confirmation::AlreadyConfirmed { both_confirmed }
            | Confirmation::Recorded { both_confirmed } => *both_confirmed,
        }
    }
}

/// Decide what a confirmation by `role` does to `exchange`.
///
/// Order-independent and idempotent; status legality is checked by the
/// caller against the state machine.
pub fn decide_confirmation(exchange: &Exchange, role: Role) -> Confirmation {
    let other_confirmed = exchange.is_confirmed_by(role.other());

    if exchange.is_confirmed_by(role) {
        Confirmation::AlreadyConfirmed {
            both_confirmed: other_confirmed,
        }
    } else {
        Confirmation::Recorded {
            both_confirmed: other_confirmed,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
