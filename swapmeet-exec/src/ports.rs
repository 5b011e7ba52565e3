//! Outbound notification port.
//!
//! Adapters implement this for a concrete channel (event bus, push provider,
//! in-app inbox). The core only ever calls it after a commit and never lets a
//! failure escape.

use async_trait::async_trait;
use swapmeet_domain::UserId;
use thiserror::Error;
use uuid::Uuid;

/// Why a notification could not be delivered.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Nobody is listening on the channel
    #[error("No subscribers for notification channel")]
    NoSubscribers,

    /// The channel refused or failed the delivery
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Port for notifying users about exchange activity.
#[async_trait]
pub trait NotificationPort: Send + Sync {
    /// Push-style notification: `event_kind` names what happened, `payload`
    /// carries the event body.
    async fn notify(
        &self,
        recipient: UserId,
        event_kind: &str,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError>;

    /// Durable entry in the recipient's in-app notification list.
    async fn create_in_app_notification(
        &self,
        recipient: UserId,
        title: &str,
        message: &str,
        related_id: Uuid,
    ) -> Result<(), NotifyError>;
}
