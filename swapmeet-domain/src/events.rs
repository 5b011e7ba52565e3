//! Domain Events for exchange lifecycle notifications
//!
//! Events describe a committed state change and who should hear about it.
//! They are produced inside a transaction but only delivered after commit.

use crate::entities::{ExchangeId, ItemId, UserId};
use crate::value_objects::Rating;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Something that happened to an exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExchangeEvent {
    /// A requester asked for an item
    Requested {
        exchange_id: ExchangeId,
        item_id: ItemId,
        item_title: String,
        requester_id: UserId,
        timestamp: DateTime<Utc>,
    },

    /// Owner accepted the request
    Accepted {
        exchange_id: ExchangeId,
        item_title: String,
        timestamp: DateTime<Utc>,
    },

    /// Owner declined the request
    Rejected {
        exchange_id: ExchangeId,
        item_title: String,
        timestamp: DateTime<Utc>,
    },

    /// One party withdrew
    Cancelled {
        exchange_id: ExchangeId,
        item_title: String,
        cancelled_by: UserId,
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// One party confirmed the hand-off, the other has not yet
    Confirmed {
        exchange_id: ExchangeId,
        item_title: String,
        confirmed_by: UserId,
        timestamp: DateTime<Utc>,
    },

    /// Both parties confirmed
    Completed {
        exchange_id: ExchangeId,
        item_title: String,
        timestamp: DateTime<Utc>,
    },

    /// A participant left a review
    ReviewReceived {
        exchange_id: ExchangeId,
        review_id: String,
        reviewer_id: UserId,
        rating: Rating,
        timestamp: DateTime<Utc>,
    },
}

impl ExchangeEvent {
    /// Event kind passed to the push channel
    pub fn kind(&self) -> &'static str {
        match self {
            ExchangeEvent::Requested { .. } => "exchange_requested",
            ExchangeEvent::Accepted { .. } => "exchange_accepted",
            ExchangeEvent::Rejected { .. } => "exchange_rejected",
            ExchangeEvent::Cancelled { .. } => "exchange_cancelled",
            ExchangeEvent::Confirmed { .. } => "exchange_confirmed",
            ExchangeEvent::Completed { .. } => "exchange_completed",
            ExchangeEvent::ReviewReceived { .. } => "review_received",
        }
    }

    /// Exchange the event belongs to
    pub fn exchange_id(&self) -> ExchangeId {
        match self {
            ExchangeEvent::Requested { exchange_id, .. }
            | ExchangeEvent::Accepted { exchange_id, .. }
            | ExchangeEvent::Rejected { exchange_id, .. }
            | ExchangeEvent::Cancelled { exchange_id, .. }
            | ExchangeEvent::Confirmed { exchange_id, .. }
            | ExchangeEvent::Completed { exchange_id, .. }
            | ExchangeEvent::ReviewReceived { exchange_id, .. } => *exchange_id,
        }
    }

    /// Short headline for the in-app notification list
    pub fn title(&self) -> &'static str {
        match self {
            ExchangeEvent::Requested { .. } => "New exchange request",
            ExchangeEvent::Accepted { .. } => "Request accepted",
            ExchangeEvent::Rejected { .. } => "Request declined",
            ExchangeEvent::Cancelled { .. } => "Exchange cancelled",
            ExchangeEvent::Confirmed { .. } => "Hand-off confirmed",
            ExchangeEvent::Completed { .. } => "Exchange completed",
            ExchangeEvent::ReviewReceived { .. } => "New review",
        }
    }

    /// One-line body for the in-app notification list
    pub fn message(&self) -> String {
        match self {
            ExchangeEvent::Requested { item_title, .. } => {
                format!("Someone would like your \"{}\"", item_title)
            },
            ExchangeEvent::Accepted { item_title, .. } => {
                format!("Your request for \"{}\" was accepted", item_title)
            },
            ExchangeEvent::Rejected { item_title, .. } => {
                format!("Your request for \"{}\" was declined", item_title)
            },
            ExchangeEvent::Cancelled {
                item_title, reason, ..
            } => match reason {
                Some(reason) => format!("The exchange for \"{}\" was cancelled: {}", item_title, reason),
                None => format!("The exchange for \"{}\" was cancelled", item_title),
            },
            ExchangeEvent::Confirmed { item_title, .. } => {
                format!("The other party confirmed the hand-off of \"{}\"", item_title)
            },
            ExchangeEvent::Completed { item_title, .. } => {
                format!("The exchange for \"{}\" is complete", item_title)
            },
            ExchangeEvent::ReviewReceived { rating, .. } => {
                format!("You received a {}-star review", rating)
            },
        }
    }
}

/// An event addressed to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    /// Who should be told
    pub recipient: UserId,
    /// What happened
    pub event: ExchangeEvent,
}

impl Notice {
    /// Address `event` to `recipient`
    pub fn new(recipient: UserId, event: ExchangeEvent) -> Self {
        Self { recipient, event }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_event_kind_and_exchange_id() {
        let exchange_id = Uuid::now_v7();
        let event = ExchangeEvent::Cancelled {
            exchange_id,
            item_title: "Tent".to_string(),
            cancelled_by: Uuid::now_v7(),
            reason: Some("Found one elsewhere".to_string()),
            timestamp: Utc::now(),
        };

        assert_eq!(event.kind(), "exchange_cancelled");
        assert_eq!(event.exchange_id(), exchange_id);
        assert!(event.message().contains("Found one elsewhere"));
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = ExchangeEvent::Completed {
            exchange_id: Uuid::now_v7(),
            item_title: "Tent".to_string(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "completed");
        assert_eq!(json["item_title"], "Tent");
    }
}
