//! Swapmeet Execution Layer
//!
//! Transactional lifecycle operations with post-commit notifications.
//!
//! # Architecture
//!
//! ```text
//! Actor → Coordinator → run_transaction(body) → Engine decision → commit → Dispatcher
//! ```
//!
//! # Components
//!
//! - **Ports**: Trait for the outbound notification channel
//! - **Coordinator**: Request, respond, cancel, confirm, hide and view
//! - **Rating Aggregator**: Exactly-once review submission
//! - **Dispatcher**: Best-effort delivery that never fails a mutation
//! - **Stub**: Recording notifier for tests
//!
//! # Example
//!
//! ```rust,ignore
//! use swapmeet_exec::{ExchangeCoordinator, NotificationDispatcher, RecordingNotifier};
//! use swapmeet_store::MemoryStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let notifier = Arc::new(RecordingNotifier::new());
//! let dispatcher = Arc::new(NotificationDispatcher::new(notifier, true));
//!
//! let coordinator = ExchangeCoordinator::new(store, dispatcher);
//! let outcome = coordinator.respond_to_exchange(exchange_id, owner_id, RespondAction::Accept).await?;
//! ```

#![warn(clippy::all)]

pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod ports;
pub mod rating;
pub mod stub;
pub mod transitions;

// Re-exports for convenience
pub use coordinator::ExchangeCoordinator;
pub use dispatch::{DispatchReport, NotificationDispatcher};
pub use error::{CoordinatorError, CoordinatorResult, ErrorKind};
pub use ports::{NotificationPort, NotifyError};
pub use rating::{RatingAggregator, ReviewReceipt, ReviewSubmission, MAX_COMMENT_CHARS};
pub use stub::{RecordingNotifier, SentInApp, SentPush};
pub use transitions::{CancelOutcome, ConfirmOutcome, RequestOutcome, RespondOutcome};
