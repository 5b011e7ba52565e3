//! In-process fan-out for committed exchange activity.
//!
//! The [`BusNotifier`](crate::notifier::BusNotifier) publishes here after a
//! transaction commits; the daemon's main loop and any delivery bridge
//! (websocket gateway, push provider) subscribe.
//!
//! Backed by a tokio broadcast channel: every subscriber sees every event
//! published after it subscribed, and a subscriber that falls more than the
//! capacity behind skips ahead and is told how much it missed.

use chrono::{DateTime, Utc};
use std::fmt;
use swapmeet_domain::UserId;
use tokio::sync::broadcast;
use uuid::Uuid;

// =============================================================================
// Event Types
// =============================================================================

/// Something published on the bus.
#[derive(Debug, Clone)]
pub enum DaemonEvent {
    /// Push-style notification for one user
    Push(PushNotification),

    /// Entry for a user's in-app notification list
    InApp(InAppNotification),

    /// Stop the main loop
    Shutdown,
}

/// Push notification.
#[derive(Debug, Clone)]
pub struct PushNotification {
    pub recipient: UserId,
    /// Event kind, e.g. `exchange_accepted`
    pub kind: String,
    pub payload: serde_json::Value,
    pub published_at: DateTime<Utc>,
}

/// In-app notification entry.
#[derive(Debug, Clone)]
pub struct InAppNotification {
    pub recipient: UserId,
    pub title: String,
    pub message: String,
    /// Exchange the entry links to
    pub related_id: Uuid,
    pub published_at: DateTime<Utc>,
}

/// A subscriber fell behind and skipped this many events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lagged(pub u64);

impl fmt::Display for Lagged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscriber lagged, skipped {} events", self.0)
    }
}

// =============================================================================
// Event Bus
// =============================================================================

/// Broadcast bus shared by the notifier and the subscribers.
pub struct EventBus {
    sender: broadcast::Sender<DaemonEvent>,
}

impl EventBus {
    /// Bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity).0,
        }
    }

    /// Publish to every current subscriber and return how many there were.
    pub fn publish(&self, event: DaemonEvent) -> usize {
        // Err only means nobody is subscribed
        self.sender.send(event).unwrap_or(0)
    }

    /// New subscriber, starting with the next published event.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            inner: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// One subscription to the [`EventBus`].
pub struct EventReceiver {
    inner: broadcast::Receiver<DaemonEvent>,
}

impl EventReceiver {
    /// Wait for the next event; `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<Result<DaemonEvent, Lagged>> {
        match self.inner.recv().await {
            Ok(event) => Some(Ok(event)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => Some(Err(Lagged(skipped))),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Next buffered event, if any, without waiting.
    pub fn try_next(&mut self) -> Option<Result<DaemonEvent, Lagged>> {
        match self.inner.try_recv() {
            Ok(event) => Some(Ok(event)),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => Some(Err(Lagged(skipped))),
            Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => {
                None
            },
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
