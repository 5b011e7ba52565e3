//! In-memory store implementation
//!
//! Used for testing and development without a database.
//! Optimistic concurrency: every document carries a version, transactions
//! remember what they read and buffer what they write, and commit
//! re-validates the read set under the write lock.

use crate::error::StoreError;
use crate::repository::{DocumentStore, Transaction, DEFAULT_MAX_ATTEMPTS};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use swapmeet_domain::{
    Exchange, ExchangeId, Item, ItemId, Review, ReviewKey, UserId, UserProfile,
};
use tracing::debug;

// =============================================================================
// Committed state
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DocKey {
    Item(ItemId),
    Exchange(ExchangeId),
    Review(ReviewKey),
    User(UserId),
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocKey::Item(id) => write!(f, "items/{}", id),
            DocKey::Exchange(id) => write!(f, "exchanges/{}", id),
            DocKey::Review(key) => write!(f, "reviews/{}", key),
            DocKey::User(id) => write!(f, "users/{}", id),
        }
    }
}

#[derive(Debug, Clone)]
enum Doc {
    Item(Item),
    Exchange(Exchange),
    Review(Review),
    User(UserProfile),
}

#[derive(Debug, Clone)]
struct Versioned<T> {
    version: u64,
    value: T,
}

type Fingerprint = Vec<(ExchangeId, u64)>;

#[derive(Debug, Default)]
struct State {
    items: HashMap<ItemId, Versioned<Item>>,
    exchanges: HashMap<ExchangeId, Versioned<Exchange>>,
    reviews: HashMap<ReviewKey, Versioned<Review>>,
    users: HashMap<UserId, Versioned<UserProfile>>,
    last_version: u64,
}

impl State {
    fn version_of(&self, key: &DocKey) -> Option<u64> {
        match key {
            DocKey::Item(id) => self.items.get(id).map(|d| d.version),
            DocKey::Exchange(id) => self.exchanges.get(id).map(|d| d.version),
            DocKey::Review(key) => self.reviews.get(key).map(|d| d.version),
            DocKey::User(id) => self.users.get(id).map(|d| d.version),
        }
    }

    /// Sorted (id, version) of committed active exchanges on an item
    fn active_fingerprint(&self, item_id: ItemId) -> Fingerprint {
        let mut fingerprint: Fingerprint = self
            .exchanges
            .values()
            .filter(|d| d.value.item_id == item_id && d.value.is_active())
            .map(|d| (d.value.id, d.version))
            .collect();
        fingerprint.sort_unstable();
        fingerprint
    }

    fn apply(&mut self, doc: Doc) {
        self.last_version += 1;
        let version = self.last_version;

        match doc {
            Doc::Item(value) => {
                self.items.insert(value.id, Versioned { version, value });
            },
            Doc::Exchange(value) => {
                self.exchanges.insert(value.id, Versioned { version, value });
            },
            Doc::Review(value) => {
                self.reviews.insert(value.key(), Versioned { version, value });
            },
            Doc::User(value) => {
                self.users.insert(value.id, Versioned { version, value });
            },
        }
    }
}

struct Shared {
    state: RwLock<State>,
    injected_conflicts: AtomicU32,
    fail_commits: AtomicBool,
}

impl Shared {
    fn read_state(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }

    /// Lock for seeding and inspection; a poisoned lock still holds valid data
    fn inspect(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn seed(&self, doc: Doc) {
        self.state.write().unwrap_or_else(PoisonError::into_inner).apply(doc);
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory store for testing
///
/// Cloning is cheap and every clone sees the same documents.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
    max_attempts: u32,
}

impl MemoryStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(State::default()),
                injected_conflicts: AtomicU32::new(0),
                fail_commits: AtomicBool::new(false),
            }),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override how many times a conflicting transaction is attempted
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Make the next `count` commits fail with a conflict (for testing retries)
    pub fn inject_conflicts(&self, count: u32) {
        self.shared.injected_conflicts.store(count, Ordering::SeqCst);
    }

    /// Make every commit fail with a non-retryable error (for testing)
    pub fn set_fail_commits(&self, fail: bool) {
        self.shared.fail_commits.store(fail, Ordering::SeqCst);
    }

    // -------------------------------------------------------------------------
    // Seeding (bypasses transactions)
    // -------------------------------------------------------------------------

    /// Store an item outside any transaction
    pub fn insert_item(&self, item: Item) {
        self.shared.seed(Doc::Item(item));
    }

    /// Store an exchange outside any transaction
    pub fn insert_exchange(&self, exchange: Exchange) {
        self.shared.seed(Doc::Exchange(exchange));
    }

    /// Store a review outside any transaction
    pub fn insert_review(&self, review: Review) {
        self.shared.seed(Doc::Review(review));
    }

    /// Store a user profile outside any transaction
    pub fn insert_user(&self, user: UserProfile) {
        self.shared.seed(Doc::User(user));
    }

    // -------------------------------------------------------------------------
    // Inspection (committed state only)
    // -------------------------------------------------------------------------

    /// Committed item
    pub fn item(&self, id: ItemId) -> Option<Item> {
        self.shared.inspect().items.get(&id).map(|d| d.value.clone())
    }

    /// Committed exchange
    pub fn exchange(&self, id: ExchangeId) -> Option<Exchange> {
        self.shared.inspect().exchanges.get(&id).map(|d| d.value.clone())
    }

    /// Committed review
    pub fn review(&self, key: &ReviewKey) -> Option<Review> {
        self.shared.inspect().reviews.get(key).map(|d| d.value.clone())
    }

    /// Committed user profile
    pub fn user(&self, id: UserId) -> Option<UserProfile> {
        self.shared.inspect().users.get(&id).map(|d| d.value.clone())
    }

    /// Every committed exchange on an item, any status
    pub fn exchanges_for_item(&self, item_id: ItemId) -> Vec<Exchange> {
        let state = self.shared.inspect();
        let mut exchanges: Vec<Exchange> = state
            .exchanges
            .values()
            .filter(|d| d.value.item_id == item_id)
            .map(|d| d.value.clone())
            .collect();
        exchanges.sort_by_key(|e| (e.created_at, e.id));
        exchanges
    }

    /// Every committed item
    pub fn items(&self) -> Vec<Item> {
        self.shared.inspect().items.values().map(|d| d.value.clone()).collect()
    }

    /// Get the number of reviews
    pub fn review_count(&self) -> usize {
        self.shared.inspect().reviews.len()
    }

    /// Get the number of exchanges
    pub fn exchange_count(&self) -> usize {
        self.shared.inspect().exchanges.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        Ok(Box::new(MemoryTransaction::new(Arc::clone(&self.shared))))
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

// =============================================================================
// MemoryTransaction
// =============================================================================

struct MemoryTransaction {
    shared: Arc<Shared>,
    /// First observed version per document (`None` = observed absent)
    reads: HashMap<DocKey, Option<u64>>,
    /// First observed active set per item query
    queries: HashMap<ItemId, Fingerprint>,
    writes: HashMap<DocKey, Doc>,
    closed: bool,
}

impl MemoryTransaction {
    fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            reads: HashMap::new(),
            queries: HashMap::new(),
            writes: HashMap::new(),
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed {
            Err(StoreError::TransactionClosed)
        } else {
            Ok(())
        }
    }

    fn read_committed<T: Clone>(
        &mut self,
        key: DocKey,
        pick: impl FnOnce(&State) -> Option<&Versioned<T>>,
    ) -> Result<Option<T>, StoreError> {
        let found = {
            let state = self.shared.read_state()?;
            pick(&state).map(|d| (d.version, d.value.clone()))
        };

        self.reads.entry(key).or_insert(found.as_ref().map(|(version, _)| *version));
        Ok(found.map(|(_, value)| value))
    }

    fn buffer(&mut self, key: DocKey, doc: Doc) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.writes.insert(key, doc);
        Ok(())
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn get_item(&mut self, id: ItemId) -> Result<Option<Item>, StoreError> {
        self.ensure_open()?;
        if let Some(Doc::Item(item)) = self.writes.get(&DocKey::Item(id)) {
            return Ok(Some(item.clone()));
        }
        self.read_committed(DocKey::Item(id), |s| s.items.get(&id))
    }

    async fn get_exchange(&mut self, id: ExchangeId) -> Result<Option<Exchange>, StoreError> {
        self.ensure_open()?;
        if let Some(Doc::Exchange(exchange)) = self.writes.get(&DocKey::Exchange(id)) {
            return Ok(Some(exchange.clone()));
        }
        self.read_committed(DocKey::Exchange(id), |s| s.exchanges.get(&id))
    }

    async fn get_review(&mut self, key: &ReviewKey) -> Result<Option<Review>, StoreError> {
        self.ensure_open()?;
        let key = *key;
        if let Some(Doc::Review(review)) = self.writes.get(&DocKey::Review(key)) {
            return Ok(Some(review.clone()));
        }
        self.read_committed(DocKey::Review(key), |s| s.reviews.get(&key))
    }

    async fn get_user(&mut self, id: UserId) -> Result<Option<UserProfile>, StoreError> {
        self.ensure_open()?;
        if let Some(Doc::User(user)) = self.writes.get(&DocKey::User(id)) {
            return Ok(Some(user.clone()));
        }
        self.read_committed(DocKey::User(id), |s| s.users.get(&id))
    }

    async fn find_active_exchanges_for_item(
        &mut self,
        item_id: ItemId,
    ) -> Result<Vec<Exchange>, StoreError> {
        self.ensure_open()?;

        let (fingerprint, committed) = {
            let state = self.shared.read_state()?;
            let committed: HashMap<ExchangeId, Exchange> = state
                .exchanges
                .values()
                .filter(|d| d.value.item_id == item_id)
                .map(|d| (d.value.id, d.value.clone()))
                .collect();
            (state.active_fingerprint(item_id), committed)
        };
        self.queries.entry(item_id).or_insert(fingerprint);

        // Overlay this transaction's own writes
        let mut merged = committed;
        for (key, doc) in &self.writes {
            if let (DocKey::Exchange(id), Doc::Exchange(exchange)) = (key, doc) {
                if exchange.item_id == item_id {
                    merged.insert(*id, exchange.clone());
                } else {
                    merged.remove(id);
                }
            }
        }

        let mut active: Vec<Exchange> = merged.into_values().filter(|e| e.is_active()).collect();
        active.sort_by_key(|e| (e.created_at, e.id));
        Ok(active)
    }

    async fn put_item(&mut self, item: &Item) -> Result<(), StoreError> {
        self.buffer(DocKey::Item(item.id), Doc::Item(item.clone()))
    }

    async fn put_exchange(&mut self, exchange: &Exchange) -> Result<(), StoreError> {
        self.buffer(DocKey::Exchange(exchange.id), Doc::Exchange(exchange.clone()))
    }

    async fn put_review(&mut self, review: &Review) -> Result<(), StoreError> {
        self.buffer(DocKey::Review(review.key()), Doc::Review(review.clone()))
    }

    async fn put_user(&mut self, user: &UserProfile) -> Result<(), StoreError> {
        self.buffer(DocKey::User(user.id), Doc::User(user.clone()))
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.closed = true;

        if self.shared.take_injected_conflict() {
            return Err(StoreError::conflict("injected conflict"));
        }
        if self.shared.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Database("injected commit failure".to_string()));
        }

        let mut state = self.shared.write_state()?;

        for (key, seen) in &self.reads {
            if state.version_of(key) != *seen {
                debug!(document = %key, "Read set changed before commit");
                return Err(StoreError::conflict(format!("{} changed", key)));
            }
        }

        for (item_id, seen) in &self.queries {
            if state.active_fingerprint(*item_id) != *seen {
                debug!(%item_id, "Active exchange set changed before commit");
                return Err(StoreError::conflict(format!(
                    "active exchanges for item {} changed",
                    item_id
                )));
            }
        }

        for (_, doc) in self.writes.drain() {
            state.apply(doc);
        }

        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.closed = true;
        self.writes.clear();
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
