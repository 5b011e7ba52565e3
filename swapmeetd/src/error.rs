//! Daemon error types.

use swapmeet_domain::DomainError;
use swapmeet_exec::CoordinatorError;
use swapmeet_store::StoreError;
use thiserror::Error;

/// Daemon-level errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Lifecycle or review operation failed
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Request body could not be read as the expected JSON
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Request carried no usable actor identity
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Event bus error
    #[error("Event bus error: {0}")]
    EventBus(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Shutdown requested
    #[error("Shutdown requested")]
    Shutdown,
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
