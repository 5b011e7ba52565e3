//! Domain Entities for Swapmeet
//!
//! Core business entities with lifecycle management.
//! Field names serialize in camelCase, matching the persisted documents.

use crate::access::{self, Role};
use crate::value_objects::{DomainError, ExchangeStatus, ItemStatus, Rating, RatingAggregate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// Identifiers
// =============================================================================

/// Unique identifier for an Item
pub type ItemId = Uuid;

/// Unique identifier for an Exchange
pub type ExchangeId = Uuid;

/// Unique identifier for a User
pub type UserId = Uuid;

// =============================================================================
// Item
// =============================================================================

/// An item posted by its owner for hand-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub category: String,
    pub status: ItemStatus,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Create a new available item
    pub fn new(
        owner_id: UserId,
        title: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::InvalidField {
                field: "title",
                message: "must not be empty".to_string(),
            });
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            title,
            category: category.into(),
            status: ItemStatus::Available,
            owner_id,
            created_at: now,
            updated_at: now,
        })
    }

    /// Change availability and bump `updated_at`
    pub fn set_status(&mut self, status: ItemStatus, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
    }
}

// =============================================================================
// Exchange
// =============================================================================

/// Negotiation record between an item owner and a requester.
///
/// Exchanges are never deleted; terminal ones stay as history and can only
/// be hidden from one party's view via `hidden_for`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub id: ExchangeId,
    pub item_id: ItemId,
    /// Snapshot of the item title at request time
    pub item_title: String,
    pub owner_id: UserId,
    pub requester_id: UserId,
    pub status: ExchangeStatus,
    #[serde(default)]
    pub owner_confirmed: bool,
    #[serde(default)]
    pub requester_confirmed: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub cancel_reason: Option<String>,
    #[serde(default)]
    pub cancelled_by: Option<UserId>,
    #[serde(default)]
    pub hidden_for: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Exchange {
    /// Open a pending request for `item` on behalf of `requester_id`
    pub fn request(item: &Item, requester_id: UserId, message: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            item_id: item.id,
            item_title: item.title.clone(),
            owner_id: item.owner_id,
            requester_id,
            status: ExchangeStatus::Pending,
            owner_confirmed: false,
            requester_confirmed: false,
            message: message.filter(|m| !m.trim().is_empty()),
            cancel_reason: None,
            cancelled_by: None,
            hidden_for: Vec::new(),
            created_at: now,
            updated_at: now,
            cancelled_at: None,
            completed_at: None,
        }
    }

    /// Whether `user_id` is the owner or the requester
    pub fn is_participant(&self, user_id: UserId) -> bool {
        access::is_participant(self, user_id)
    }

    /// Which side of the exchange `user_id` is on, if any
    pub fn role_of(&self, user_id: UserId) -> Option<Role> {
        access::role_of(self, user_id)
    }

    /// The participant on the other side from `role`
    pub fn counterparty(&self, role: Role) -> UserId {
        match role {
            Role::Owner => self.requester_id,
            Role::Requester => self.owner_id,
        }
    }

    /// Status with the legacy alias collapsed
    pub fn current_status(&self) -> ExchangeStatus {
        self.status.normalized()
    }

    /// Still holds a claim on the item
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Confirmation flag for one side
    pub fn is_confirmed_by(&self, role: Role) -> bool {
        match role {
            Role::Owner => self.owner_confirmed,
            Role::Requester => self.requester_confirmed,
        }
    }

    /// Both sides confirmed the hand-off
    pub fn both_confirmed(&self) -> bool {
        self.owner_confirmed && self.requester_confirmed
    }

    /// Whether `user_id` hid this exchange from their own list
    pub fn is_hidden_for(&self, user_id: UserId) -> bool {
        self.hidden_for.contains(&user_id)
    }
}

// =============================================================================
// Review
// =============================================================================

/// Composite identity of a review: one per reviewer per exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewKey {
    pub exchange_id: ExchangeId,
    pub reviewer_id: UserId,
}

impl ReviewKey {
    /// Key for `reviewer_id`'s review of `exchange_id`
    pub fn new(exchange_id: ExchangeId, reviewer_id: UserId) -> Self {
        Self {
            exchange_id,
            reviewer_id,
        }
    }

    /// Document id (`{exchangeId}_{reviewerId}`)
    pub fn document_id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ReviewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.exchange_id, self.reviewer_id)
    }
}

/// A rating left by one participant about the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub exchange_id: ExchangeId,
    pub reviewer_id: UserId,
    pub target_user_id: UserId,
    pub rating: Rating,
    pub comment: String,
    pub item_title: String,
    #[serde(default)]
    pub reviewer_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Composite key this review is stored under
    pub fn key(&self) -> ReviewKey {
        ReviewKey::new(self.exchange_id, self.reviewer_id)
    }
}

// =============================================================================
// User
// =============================================================================

/// The slice of a user document the core reads and writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub rating: RatingAggregate,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Create a profile with no reviews
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            display_name: display_name.into(),
            rating: RatingAggregate::empty(),
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
