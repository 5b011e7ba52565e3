//! Swapmeet Engine Layer
//!
//! Pure decision logic, deterministic, no I/O.
//! Takes the documents read inside a transaction and returns what to write.

#![warn(clippy::all)]

pub mod policy;
pub mod rating;
pub mod state_machine;

pub use policy::{
    cancel_reason_required, decide_confirmation, item_status_after_release, normalize_reason,
    Confirmation,
};
pub use rating::{next_rating, AVERAGE_SCALE};
pub use state_machine::{allowed_next, validate_transition, TransitionError};
