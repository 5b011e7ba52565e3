//! Coordinator error types.
//!
//! Every failure maps onto one [`ErrorKind`]. Business-rule violations are
//! expected outcomes; only [`ErrorKind::Internal`] is an incident.

use swapmeet_domain::{DomainError, ExchangeId, ItemId, UserId};
use swapmeet_engine::TransitionError;
use swapmeet_store::{StoreError, TransactionError};
use thiserror::Error;

/// Errors returned by the coordinator and the rating aggregator.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Exchange does not exist
    #[error("Exchange not found: {0}")]
    ExchangeNotFound(ExchangeId),

    /// Item does not exist
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// Review target user does not exist
    #[error("User not found: {0}")]
    TargetNotFound(UserId),

    /// Only the item owner may respond to a request
    #[error("Only the item owner can respond to this request")]
    NotOwner,

    /// Actor is neither the owner nor the requester
    #[error("You are not a participant in this exchange")]
    NotParticipant,

    /// An owner cannot request their own item
    #[error("You cannot request your own item")]
    OwnItem,

    /// The state machine refused the transition
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// Cancel on an exchange that is already cancelled
    #[error("Exchange is already cancelled")]
    AlreadyCancelled,

    /// The reviewer already reviewed this exchange
    #[error("You have already reviewed this exchange")]
    DuplicateReview,

    /// Request on an item that can no longer be requested
    #[error("Item {0} is no longer available")]
    ItemUnavailable(ItemId),

    /// Another exchange on the item was already accepted
    #[error("Item {0} is already promised in another exchange")]
    ItemPromised(ItemId),

    /// Review target is not the reviewer's counterparty
    #[error("You can only review the other participant of this exchange")]
    NotCounterparty,

    /// The requester already holds an active exchange on the item
    #[error("You already have an active request for this item")]
    DuplicateRequest,

    /// Input failed a business rule
    #[error("{0}")]
    Validation(String),

    /// Input failed value-object validation
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Storage failure (including exhausted retries)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Caller-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Referenced document does not exist
    NotFound,
    /// Actor is not allowed to perform the operation
    Forbidden,
    /// Status change not permitted from the current status
    InvalidTransition,
    /// Operation collides with the current state
    Conflict,
    /// Input failed validation
    Validation,
    /// Infrastructure failure
    Internal,
}

impl ErrorKind {
    /// HTTP status code for this category
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Forbidden => 403,
            ErrorKind::InvalidTransition => 400,
            ErrorKind::Conflict => 409,
            ErrorKind::Validation => 400,
            ErrorKind::Internal => 500,
        }
    }

    /// Stable name used in error bodies
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Validation => "validation",
            ErrorKind::Internal => "internal",
        }
    }
}

impl CoordinatorError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordinatorError::ExchangeNotFound(_)
            | CoordinatorError::ItemNotFound(_)
            | CoordinatorError::TargetNotFound(_) => ErrorKind::NotFound,
            CoordinatorError::NotOwner
            | CoordinatorError::NotParticipant
            | CoordinatorError::OwnItem => ErrorKind::Forbidden,
            CoordinatorError::InvalidTransition(_) => ErrorKind::InvalidTransition,
            CoordinatorError::AlreadyCancelled
            | CoordinatorError::DuplicateReview
            | CoordinatorError::ItemUnavailable(_)
            | CoordinatorError::ItemPromised(_)
            | CoordinatorError::DuplicateRequest => ErrorKind::Conflict,
            CoordinatorError::Validation(_)
            | CoordinatorError::NotCounterparty
            | CoordinatorError::Domain(_) => ErrorKind::Validation,
            CoordinatorError::Store(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to show to the actor
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Something went wrong, please try again".to_string(),
            _ => self.to_string(),
        }
    }
}

impl TransactionError for CoordinatorError {
    fn is_conflict(&self) -> bool {
        matches!(self, CoordinatorError::Store(err) if err.is_conflict())
    }
}

/// Result type for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use swapmeet_domain::ExchangeStatus;
    use uuid::Uuid;

    #[test]
    fn test_kinds_map_to_status_codes() {
        let cases = [
            (CoordinatorError::ExchangeNotFound(Uuid::now_v7()), 404),
            (CoordinatorError::NotOwner, 403),
            (
                CoordinatorError::InvalidTransition(TransitionError::Terminal {
                    from: ExchangeStatus::Completed,
                }),
                400,
            ),
            (CoordinatorError::AlreadyCancelled, 409),
            (CoordinatorError::DuplicateReview, 409),
            (CoordinatorError::ItemPromised(Uuid::now_v7()), 409),
            (CoordinatorError::NotCounterparty, 400),
            (CoordinatorError::Validation("reason required".into()), 400),
            (CoordinatorError::Store(StoreError::RetriesExhausted { attempts: 5 }), 500),
        ];

        for (err, code) in cases {
            assert_eq!(err.kind().status_code(), code, "{:?}", err);
        }
    }

    #[test]
    fn test_internal_message_is_generic() {
        let err = CoordinatorError::Store(StoreError::Database("password=hunter2".into()));
        assert!(!err.public_message().contains("hunter2"));

        let err = CoordinatorError::NotParticipant;
        assert_eq!(err.public_message(), err.to_string());
    }

    #[test]
    fn test_only_store_conflicts_are_retryable() {
        assert!(CoordinatorError::Store(StoreError::conflict("x")).is_conflict());
        assert!(!CoordinatorError::DuplicateReview.is_conflict());
        assert!(!CoordinatorError::Store(StoreError::RetriesExhausted { attempts: 1 }).is_conflict());
    }
}
