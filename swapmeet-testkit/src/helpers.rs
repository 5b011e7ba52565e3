//! Seeding helpers for store-backed tests.
//!
//! Seeds go straight into the committed state of a [`MemoryStore`], so a test
//! can start from any lifecycle point without replaying every operation.

use chrono::Utc;
use rust_decimal::Decimal;
use swapmeet_domain::{Exchange, ExchangeStatus, Item, ItemStatus, RatingAggregate, UserProfile};
use swapmeet_store::MemoryStore;

/// Seed a user with no reviews.
pub fn seed_user(store: &MemoryStore, display_name: &str) -> UserProfile {
    let user = UserProfile::new(display_name);
    store.insert_user(user.clone());
    user
}

/// Seed a user carrying an existing rating aggregate.
pub fn seed_user_with_rating(
    store: &MemoryStore,
    display_name: &str,
    average: Decimal,
    count: u32,
) -> UserProfile {
    let mut user = UserProfile::new(display_name);
    user.rating = RatingAggregate::new(average, count);
    store.insert_user(user.clone());
    user
}

/// Seed an available item owned by `owner`.
pub fn seed_item(store: &MemoryStore, owner: &UserProfile, title: &str) -> Item {
    // Item::new only rejects blank titles
    let item = Item::new(owner.id, title, "general").unwrap_or_else(|e| {
        panic!("seed_item called with an invalid title {:?}: {}", title, e)
    });
    store.insert_item(item.clone());
    item
}

/// Seed an exchange on `item` in `status`, keeping the item consistent.
///
/// An active status marks the item pending and `Completed` marks it
/// completed (with both confirmations set).
pub fn seed_exchange(
    store: &MemoryStore,
    item: &Item,
    requester: &UserProfile,
    status: ExchangeStatus,
) -> Exchange {
    let mut exchange = Exchange::request(item, requester.id, None);
    exchange.status = status;

    let item_status = match status.normalized() {
        ExchangeStatus::Pending | ExchangeStatus::InProgress => Some(ItemStatus::Pending),
        ExchangeStatus::Completed => {
            exchange.owner_confirmed = true;
            exchange.requester_confirmed = true;
            exchange.completed_at = Some(Utc::now());
            Some(ItemStatus::Completed)
        },
        _ => None,
    };

    if let Some(item_status) = item_status {
        let mut current = store.item(item.id).unwrap_or_else(|| item.clone());
        current.set_status(item_status, Utc::now());
        store.insert_item(current);
    }

    store.insert_exchange(exchange.clone());
    exchange
}
