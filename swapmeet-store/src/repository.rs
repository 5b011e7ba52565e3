//! Transactional document store interface (Ports)
//!
//! Every lifecycle operation runs as a read-then-write body inside one
//! [`Transaction`]. Bodies may run more than once: [`run_transaction`] replays
//! them from scratch whenever the backend reports a conflict, so a body must
//! read everything it decides on through the transaction and must not touch
//! anything outside it.

use crate::error::StoreError;
use async_trait::async_trait;
use swapmeet_domain::{
    Exchange, ExchangeId, Item, ItemId, Review, ReviewKey, UserId, UserProfile,
};
use tracing::{debug, warn};

/// Default number of times a conflicting body is attempted
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// One atomic unit of reads and buffered writes.
///
/// Reads observe the transaction's own writes. Nothing becomes visible to
/// other transactions until [`Transaction::commit`] succeeds.
#[async_trait]
pub trait Transaction: Send {
    /// Read an item
    async fn get_item(&mut self, id: ItemId) -> Result<Option<Item>, StoreError>;

    /// Read an exchange
    async fn get_exchange(&mut self, id: ExchangeId) -> Result<Option<Exchange>, StoreError>;

    /// Read a review by its composite key
    async fn get_review(&mut self, key: &ReviewKey) -> Result<Option<Review>, StoreError>;

    /// Read a user profile
    async fn get_user(&mut self, id: UserId) -> Result<Option<UserProfile>, StoreError>;

    /// Every exchange on `item_id` whose status is pending, accepted or in_progress.
    ///
    /// The result set itself is part of the transaction's read set: an exchange
    /// entering or leaving it before commit aborts the commit.
    async fn find_active_exchanges_for_item(
        &mut self,
        item_id: ItemId,
    ) -> Result<Vec<Exchange>, StoreError>;

    /// Insert or replace an item
    async fn put_item(&mut self, item: &Item) -> Result<(), StoreError>;

    /// Insert or replace an exchange
    async fn put_exchange(&mut self, exchange: &Exchange) -> Result<(), StoreError>;

    /// Insert or replace a review
    async fn put_review(&mut self, review: &Review) -> Result<(), StoreError>;

    /// Insert or replace a user profile
    async fn put_user(&mut self, user: &UserProfile) -> Result<(), StoreError>;

    /// Apply every buffered write atomically.
    ///
    /// Returns `StoreError::Conflict` when something read by this
    /// transaction changed since it was read.
    async fn commit(&mut self) -> Result<(), StoreError>;

    /// Discard every buffered write
    async fn rollback(&mut self) -> Result<(), StoreError>;
}

/// A backend that can open transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open a new transaction
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError>;

    /// How many times [`run_transaction`] attempts a body before giving up
    fn max_attempts(&self) -> u32 {
        DEFAULT_MAX_ATTEMPTS
    }
}

/// Errors a transaction body may return.
pub trait TransactionError: From<StoreError> + Send {
    /// Whether this error means "rerun the body", not "give up"
    fn is_conflict(&self) -> bool;
}

impl TransactionError for StoreError {
    fn is_conflict(&self) -> bool {
        StoreError::is_conflict(self)
    }
}

/// The work done inside one transaction.
///
/// Implementors own their inputs, so the same body can be replayed on retry.
#[async_trait]
pub trait TransactionBody: Send + Sync {
    /// Value handed back after a successful commit
    type Output: Send;
    /// Error type, convertible from storage failures
    type Error: TransactionError;

    /// Read, decide, and buffer writes
    async fn run(&self, tx: &mut dyn Transaction) -> Result<Self::Output, Self::Error>;
}

/// Run `body` in a transaction, retrying on conflict.
///
/// - Body errors roll back and are returned unchanged, unless they are
///   conflicts surfaced by a read.
/// - Commit conflicts rerun the body against fresh reads.
/// - After `store.max_attempts()` conflicting attempts the call fails with
///   `StoreError::RetriesExhausted`.
pub async fn run_transaction<S, B>(store: &S, body: &B) -> Result<B::Output, B::Error>
where
    S: DocumentStore + ?Sized,
    B: TransactionBody,
{
    let max_attempts = store.max_attempts().max(1);

    for attempt in 1..=max_attempts {
        let mut tx = store.begin().await?;

        let output = match body.run(tx.as_mut()).await {
            Ok(output) => output,
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                if err.is_conflict() {
                    debug!(attempt, "Read conflict, retrying transaction");
                    continue;
                }
                return Err(err);
            },
        };

        match tx.commit().await {
            Ok(()) => return Ok(output),
            Err(err) if err.is_conflict() => {
                debug!(attempt, error = %err, "Commit conflict, retrying transaction");
            },
            Err(err) => return Err(err.into()),
        }
    }

    warn!(attempts = max_attempts, "Transaction retries exhausted");
    Err(StoreError::RetriesExhausted {
        attempts: max_attempts,
    }
    .into())
}
