//! Notification port backed by the daemon event bus.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use swapmeet_domain::UserId;
use swapmeet_exec::{NotificationPort, NotifyError};
use uuid::Uuid;

use crate::event_bus::{DaemonEvent, EventBus, InAppNotification, PushNotification};

/// Publishes notifications onto the [`EventBus`].
///
/// A publish nobody receives is reported as [`NotifyError::NoSubscribers`];
/// the dispatcher logs and drops it.
pub struct BusNotifier {
    bus: Arc<EventBus>,
}

impl BusNotifier {
    /// Create a notifier publishing to `bus`.
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    fn publish(&self, event: DaemonEvent) -> Result<(), NotifyError> {
        match self.bus.publish(event) {
            0 => Err(NotifyError::NoSubscribers),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl NotificationPort for BusNotifier {
    async fn notify(
        &self,
        recipient: UserId,
        event_kind: &str,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError> {
        self.publish(DaemonEvent::Push(PushNotification {
            recipient,
            kind: event_kind.to_string(),
            payload,
            published_at: Utc::now(),
        }))
    }

    async fn create_in_app_notification(
        &self,
        recipient: UserId,
        title: &str,
        message: &str,
        related_id: Uuid,
    ) -> Result<(), NotifyError> {
        self.publish(DaemonEvent::InApp(InAppNotification {
            recipient,
            title: title.to_string(),
            message: message.to_string(),
            related_id,
            published_at: Utc::now(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_without_subscribers_fails() {
        let notifier = BusNotifier::new(Arc::new(EventBus::new(10)));

        let result = notifier
            .notify(Uuid::now_v7(), "exchange_requested", serde_json::json!({}))
            .await;

        assert!(matches!(result, Err(NotifyError::NoSubscribers)));
    }

    #[tokio::test]
    async fn test_in_app_reaches_subscriber() {
        let bus = Arc::new(EventBus::new(10));
        let mut receiver = bus.subscribe();
        let notifier = BusNotifier::new(Arc::clone(&bus));
        let exchange_id = Uuid::now_v7();

        notifier
            .create_in_app_notification(Uuid::now_v7(), "New review", "5 stars", exchange_id)
            .await
            .unwrap();

        match receiver.next().await.unwrap().unwrap() {
            DaemonEvent::InApp(entry) => {
                assert_eq!(entry.title, "New review");
                assert_eq!(entry.related_id, exchange_id);
            },
            other => panic!("Expected InApp event, got {:?}", other),
        }
    }
}
