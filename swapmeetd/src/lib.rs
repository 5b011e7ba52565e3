//! Swapmeet Daemon Library
//!
//! Runtime host for the exchange lifecycle core.
//!
//! # Architecture
//!
//! ```text
//! HTTP client → API Server → Exchange Coordinator / Rating Aggregator → Document Store
//!                                   ↓ (after commit)
//!                              Bus Notifier → Event Bus → delivery loop
//! ```
//!
//! # Components
//!
//! - **Daemon**: Main runtime orchestrator
//! - **API**: HTTP endpoints, actor taken from `x-user-id`
//! - **Event Bus**: Post-commit notification fan-out
//! - **Bus Notifier**: `NotificationPort` adapter over the event bus
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use swapmeetd::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!     let daemon = Daemon::new_stub(config);
//!     daemon.run().await.expect("Daemon error");
//! }
//! ```

#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod daemon;
pub mod error;
pub mod event_bus;
pub mod notifier;

// Re-exports for convenience
pub use api::{create_router, Actor, ApiState, ErrorResponse, USER_ID_HEADER};
pub use config::{ApiConfig, Config, Environment, NotificationConfig, TransactionConfig};
pub use daemon::Daemon;
pub use error::{DaemonError, DaemonResult};
pub use event_bus::{
    DaemonEvent, EventBus, EventReceiver, InAppNotification, Lagged, PushNotification,
};
pub use notifier::BusNotifier;
