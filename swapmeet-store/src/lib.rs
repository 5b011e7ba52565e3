//! Swapmeet Storage Layer
//!
//! Transactional persistence for items, exchanges, reviews and user profiles.
//!
//! # Architecture
//!
//! - **Transaction traits**: Define the storage interface (ports)
//! - **In-memory store**: Optimistic-concurrency implementation for testing
//! - **PostgreSQL store**: Production implementation (feature `postgres`)
//!
//! # Usage
//!
//! ```rust
//! use swapmeet_store::{DocumentStore, MemoryStore};
//! use swapmeet_domain::Item;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::new();
//!     let item = Item::new(Uuid::now_v7(), "Tent", "outdoor").unwrap();
//!
//!     let mut tx = store.begin().await.unwrap();
//!     tx.put_item(&item).await.unwrap();
//!     tx.commit().await.unwrap();
//!
//!     assert!(store.item(item.id).is_some());
//! }
//! ```

#![warn(clippy::all)]

// Modules
mod error;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;
mod repository;

// Re-exports
pub use error::StoreError;
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgDocumentStore;
pub use repository::{
    run_transaction, DocumentStore, Transaction, TransactionBody, TransactionError,
    DEFAULT_MAX_ATTEMPTS,
};
