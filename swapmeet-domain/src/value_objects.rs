//! Value Objects for the Swapmeet Domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Rating must be an integer between 1 and 5
    #[error("Invalid rating: {0}")]
    InvalidRating(String),

    /// Unknown exchange status string
    #[error("Invalid exchange status: {0}")]
    InvalidStatus(String),

    /// Unknown respond action string
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Free-text field failed validation (empty title, oversized comment, ...)
    #[error("Invalid field {field}: {message}")]
    InvalidField {
        /// Field name as exposed to callers
        field: &'static str,
        /// What was wrong with it
        message: String,
    },
}

// =============================================================================
// Item Status
// =============================================================================

/// Availability of a posted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Open for requests, no active exchange holds it
    Available,
    /// At least one active exchange references it
    Pending,
    /// Handed off; terminal
    Completed,
}

impl ItemStatus {
    /// Stable lowercase name (matches the persisted form)
    pub fn name(&self) -> &'static str {
        match self {
            ItemStatus::Available => "available",
            ItemStatus::Pending => "pending",
            ItemStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Exchange Status
// =============================================================================

/// Lifecycle status of an exchange.
///
/// `Accepted` is the pre-rename spelling of `InProgress`. Documents written
/// before the rename still carry it, so it stays deserializable; every
/// decision goes through [`ExchangeStatus::normalized`] first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeStatus {
    /// Requested, waiting for the owner to respond
    Pending,
    /// Legacy alias of `InProgress`
    Accepted,
    /// Accepted by the owner, hand-off being arranged
    InProgress,
    /// Both parties confirmed the hand-off
    Completed,
    /// Owner declined the request
    Rejected,
    /// Withdrawn by either party
    Cancelled,
}

impl ExchangeStatus {
    /// Every status, including the legacy alias.
    pub const ALL: [ExchangeStatus; 6] = [
        ExchangeStatus::Pending,
        ExchangeStatus::Accepted,
        ExchangeStatus::InProgress,
        ExchangeStatus::Completed,
        ExchangeStatus::Rejected,
        ExchangeStatus::Cancelled,
    ];

    /// Statuses that keep an item locked.
    pub const ACTIVE: [ExchangeStatus; 3] =
        [ExchangeStatus::Pending, ExchangeStatus::Accepted, ExchangeStatus::InProgress];

    /// Collapse the legacy alias onto its current name.
    ///
    /// This is the only place that knows `accepted` and `in_progress` are the
    /// same phase; delete the arm once no persisted document carries it.
    pub fn normalized(self) -> Self {
        match self {
            ExchangeStatus::Accepted => ExchangeStatus::InProgress,
            other => other,
        }
    }

    /// Not yet terminal (pending or in the in-progress phase)
    pub fn is_active(self) -> bool {
        matches!(self.normalized(), ExchangeStatus::Pending | ExchangeStatus::InProgress)
    }

    /// No further transition is legal
    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// Stable snake_case name (matches the persisted form)
    pub fn name(&self) -> &'static str {
        match self {
            ExchangeStatus::Pending => "pending",
            ExchangeStatus::Accepted => "accepted",
            ExchangeStatus::InProgress => "in_progress",
            ExchangeStatus::Completed => "completed",
            ExchangeStatus::Rejected => "rejected",
            ExchangeStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExchangeStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExchangeStatus::ALL
            .into_iter()
            .find(|status| status.name() == s)
            .ok_or_else(|| DomainError::InvalidStatus(s.to_string()))
    }
}

// =============================================================================
// Respond Action
// =============================================================================

/// The owner's answer to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RespondAction {
    /// Take the exchange into the in-progress phase
    Accept,
    /// Decline the request
    Reject,
}

impl RespondAction {
    /// Status the exchange moves to when this action succeeds
    pub fn target_status(self) -> ExchangeStatus {
        match self {
            RespondAction::Accept => ExchangeStatus::InProgress,
            RespondAction::Reject => ExchangeStatus::Rejected,
        }
    }
}

impl FromStr for RespondAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "accept" => Ok(RespondAction::Accept),
            "reject" => Ok(RespondAction::Reject),
            other => Err(DomainError::InvalidAction(format!(
                "{}. Expected: accept or reject",
                other
            ))),
        }
    }
}

// =============================================================================
// Rating
// =============================================================================

/// A single review score.
///
/// # Invariants
/// - Integer in `1..=5`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Lowest accepted score
    pub const MIN: u8 = 1;
    /// Highest accepted score
    pub const MAX: u8 = 5;

    /// Create a rating with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidRating` if value is outside `1..=5`
    pub fn new(value: i64) -> Result<Self, DomainError> {
        if value < i64::from(Self::MIN) || value > i64::from(Self::MAX) {
            return Err(DomainError::InvalidRating(format!(
                "{} is outside {}..={}",
                value,
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(value as u8))
    }

    /// Score as a plain integer
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Score as an exact decimal (for averaging)
    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.0)
    }
}

impl TryFrom<i64> for Rating {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Rating Aggregate
// =============================================================================

/// Running summary of all reviews targeting a user.
///
/// Only the rating aggregator writes this; `average` is kept at one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingAggregate {
    /// Mean score, one decimal place
    #[serde(with = "rust_decimal::serde::float")]
    pub average: Decimal,
    /// Number of reviews folded in
    pub count: u32,
}

impl RatingAggregate {
    /// No reviews yet
    pub fn empty() -> Self {
        Self {
            average: Decimal::ZERO,
            count: 0,
        }
    }

    /// Build an aggregate from stored values (seeding, migrations)
    pub fn new(average: Decimal, count: u32) -> Self {
        Self { average, count }
    }
}

impl Default for RatingAggregate {
    fn default() -> Self {
        Self::empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_accepted_normalizes_to_in_progress() {
        assert_eq!(ExchangeStatus::Accepted.normalized(), ExchangeStatus::InProgress);
        assert_eq!(ExchangeStatus::Pending.normalized(), ExchangeStatus::Pending);
        assert_eq!(ExchangeStatus::Cancelled.normalized(), ExchangeStatus::Cancelled);
    }

    #[test]
    fn test_active_statuses() {
        assert!(ExchangeStatus::Pending.is_active());
        assert!(ExchangeStatus::Accepted.is_active());
        assert!(ExchangeStatus::InProgress.is_active());
        assert!(ExchangeStatus::Completed.is_terminal());
        assert!(ExchangeStatus::Rejected.is_terminal());
        assert!(ExchangeStatus::Cancelled.is_terminal());

        for status in ExchangeStatus::ACTIVE {
            assert!(status.is_active());
        }
    }

    #[test]
    fn test_exchange_status_serde_names() {
        let json = serde_json::to_string(&ExchangeStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");

        let legacy: ExchangeStatus = serde_json::from_str("\"accepted\"").unwrap();
        assert_eq!(legacy, ExchangeStatus::Accepted);
    }

    #[test]
    fn test_exchange_status_from_str() {
        for status in ExchangeStatus::ALL {
            assert_eq!(status.name().parse::<ExchangeStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<ExchangeStatus>().is_err());
    }

    #[test]
    fn test_respond_action_parsing() {
        assert_eq!("accept".parse::<RespondAction>().unwrap(), RespondAction::Accept);
        assert_eq!("REJECT".parse::<RespondAction>().unwrap(), RespondAction::Reject);
        assert!("maybe".parse::<RespondAction>().is_err());

        assert_eq!(RespondAction::Accept.target_status(), ExchangeStatus::InProgress);
        assert_eq!(RespondAction::Reject.target_status(), ExchangeStatus::Rejected);
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert!(Rating::new(-3).is_err());
        assert_eq!(Rating::new(1).unwrap().value(), 1);
        assert_eq!(Rating::new(5).unwrap().as_decimal(), dec!(5));
    }

    #[test]
    fn test_rating_rejects_out_of_range_json() {
        assert!(serde_json::from_str::<Rating>("7").is_err());
        assert_eq!(serde_json::from_str::<Rating>("4").unwrap().value(), 4);
    }

    #[test]
    fn test_rating_aggregate_serializes_average_as_number() {
        let aggregate = RatingAggregate::new(dec!(4.3), 3);
        let json = serde_json::to_value(aggregate).unwrap();

        assert_eq!(json["count"], 3);
        assert!(json["average"].is_number());
        assert_eq!(json["average"].as_f64().unwrap(), 4.3);
    }
}
