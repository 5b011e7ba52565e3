//! Swapmeet Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains entities, value objects, notification events and the
//! participant predicate shared by every authorization check.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod access;
#[allow(missing_docs)]
pub mod entities;
#[allow(missing_docs)]
pub mod events;
pub mod value_objects;

// Re-export commonly used types
pub use access::{is_participant, role_of, Role};
pub use entities::{
    Exchange, ExchangeId, Item, ItemId, Review, ReviewKey, UserId, UserProfile,
};
pub use events::{ExchangeEvent, Notice};
pub use value_objects::{
    DomainError, ExchangeStatus, ItemStatus, Rating, RatingAggregate, RespondAction,
};
