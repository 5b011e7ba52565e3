//! Test helpers for Swapmeet store-backed tests.
//!
//! Provides a wired-up in-memory marketplace, seeding helpers, and the item
//! consistency assertions shared by the exec and daemon test suites.

mod assertions;
mod helpers;

pub use assertions::{assert_all_items_consistent, assert_item_consistent, item_inconsistency};
pub use helpers::{seed_exchange, seed_item, seed_user, seed_user_with_rating};

use std::sync::Arc;
use swapmeet_exec::{
    ExchangeCoordinator, NotificationDispatcher, RatingAggregator, RecordingNotifier,
};
use swapmeet_store::MemoryStore;

/// Coordinator and aggregator over one in-memory store and a recording notifier.
pub struct Marketplace {
    /// Shared store
    pub store: Arc<MemoryStore>,
    /// Captures every delivered notification
    pub notifier: Arc<RecordingNotifier>,
    /// Lifecycle operations
    pub coordinator: ExchangeCoordinator<MemoryStore, RecordingNotifier>,
    /// Review submission
    pub ratings: RatingAggregator<MemoryStore, RecordingNotifier>,
}

impl Marketplace {
    /// Fresh marketplace with in-app notifications enabled.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    /// Marketplace over a preconfigured store (retry budget, fault hooks).
    pub fn with_store(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        let notifier = Arc::new(RecordingNotifier::new());
        let dispatcher = Arc::new(NotificationDispatcher::new(Arc::clone(&notifier), true));

        Self {
            coordinator: ExchangeCoordinator::new(Arc::clone(&store), Arc::clone(&dispatcher)),
            ratings: RatingAggregator::new(Arc::clone(&store), dispatcher),
            store,
            notifier,
        }
    }
}

impl Default for Marketplace {
    fn default() -> Self {
        Self::new()
    }
}
