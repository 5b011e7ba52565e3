//! Invariant checks over committed store state.

use swapmeet_domain::{ExchangeStatus, ItemId, ItemStatus};
use swapmeet_store::MemoryStore;

/// Describe how an item disagrees with its exchanges, if it does.
///
/// `pending` requires at least one active exchange, `available` and
/// `completed` require none. At most one exchange may be in progress and at
/// most one may be completed.
pub fn item_inconsistency(store: &MemoryStore, item_id: ItemId) -> Option<String> {
    let Some(item) = store.item(item_id) else {
        return Some(format!("item {} does not exist", item_id));
    };

    let exchanges = store.exchanges_for_item(item_id);
    let count = |status: ExchangeStatus| {
        exchanges.iter().filter(|e| e.current_status() == status).count()
    };
    let active = exchanges.iter().filter(|e| e.is_active()).count();
    let in_progress = count(ExchangeStatus::InProgress);
    let completed = count(ExchangeStatus::Completed);

    if in_progress > 1 {
        return Some(format!("item {} has {} exchanges in progress", item_id, in_progress));
    }
    if completed > 1 {
        return Some(format!("item {} was handed off {} times", item_id, completed));
    }

    match item.status {
        ItemStatus::Pending if active == 0 => {
            Some(format!("item {} is pending with no active exchange", item_id))
        },
        ItemStatus::Available | ItemStatus::Completed if active > 0 => Some(format!(
            "item {} is {} with {} active exchange(s)",
            item_id, item.status, active
        )),
        _ => None,
    }
}

/// Panic if the item disagrees with its exchanges.
pub fn assert_item_consistent(store: &MemoryStore, item_id: ItemId) {
    if let Some(problem) = item_inconsistency(store, item_id) {
        panic!("item invariant violated: {}", problem);
    }
}

/// Panic unless every item in the store satisfies the invariant.
pub fn assert_all_items_consistent(store: &MemoryStore) {
    for item in store.items() {
        assert_item_consistent(store, item.id);
    }
}
