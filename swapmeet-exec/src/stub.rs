//! Stub implementations for testing.
//!
//! Records every delivery instead of sending it, and can be told to fail.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use swapmeet_domain::UserId;
use uuid::Uuid;

use crate::ports::{NotificationPort, NotifyError};

/// A push notification captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentPush {
    /// Recipient
    pub recipient: UserId,
    /// Event kind
    pub event_kind: String,
    /// Event body
    pub payload: serde_json::Value,
}

/// An in-app notification captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentInApp {
    /// Recipient
    pub recipient: UserId,
    /// Headline
    pub title: String,
    /// Body
    pub message: String,
    /// Exchange the entry links to
    pub related_id: Uuid,
}

/// Notifier that records deliveries in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    pushes: Mutex<Vec<SentPush>>,
    in_app: Mutex<Vec<SentInApp>>,
    fail_push: AtomicBool,
    fail_in_app: AtomicBool,
}

impl RecordingNotifier {
    /// Create a notifier that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every push delivery fail.
    pub fn set_fail_push(&self, fail: bool) {
        self.fail_push.store(fail, Ordering::SeqCst);
    }

    /// Make every in-app delivery fail.
    pub fn set_fail_in_app(&self, fail: bool) {
        self.fail_in_app.store(fail, Ordering::SeqCst);
    }

    /// Pushes delivered so far.
    pub fn pushes(&self) -> Vec<SentPush> {
        self.pushes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// In-app entries delivered so far.
    pub fn in_app(&self) -> Vec<SentInApp> {
        self.in_app.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Event kinds pushed to `recipient`, in delivery order.
    pub fn kinds_for(&self, recipient: UserId) -> Vec<String> {
        self.pushes()
            .into_iter()
            .filter(|p| p.recipient == recipient)
            .map(|p| p.event_kind)
            .collect()
    }
}

#[async_trait]
impl NotificationPort for RecordingNotifier {
    async fn notify(
        &self,
        recipient: UserId,
        event_kind: &str,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError> {
        if self.fail_push.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("Simulated push failure".to_string()));
        }

        self.pushes.lock().unwrap_or_else(PoisonError::into_inner).push(SentPush {
            recipient,
            event_kind: event_kind.to_string(),
            payload,
        });
        Ok(())
    }

    async fn create_in_app_notification(
        &self,
        recipient: UserId,
        title: &str,
        message: &str,
        related_id: Uuid,
    ) -> Result<(), NotifyError> {
        if self.fail_in_app.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("Simulated in-app failure".to_string()));
        }

        self.in_app.lock().unwrap_or_else(PoisonError::into_inner).push(SentInApp {
            recipient,
            title: title.to_string(),
            message: message.to_string(),
            related_id,
        });
        Ok(())
    }
}
