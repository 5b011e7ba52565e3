//! Exchange coordinator: every lifecycle mutation as one transaction, then
//! best-effort notifications.
//!
//! # Flow
//!
//! ```text
//! actor request → run_transaction(body) → commit → NotificationDispatcher
//! ```
//!
//! The transaction decides the caller's result. Notifications run only after
//! commit and can neither fail nor undo the mutation.

use std::sync::Arc;
use tracing::{debug, error, info};

use swapmeet_domain::{Exchange, ExchangeId, ItemId, RespondAction, UserId};
use swapmeet_store::{run_transaction, DocumentStore};

use crate::dispatch::NotificationDispatcher;
use crate::error::{CoordinatorError, CoordinatorResult, ErrorKind};
use crate::ports::NotificationPort;
use crate::transitions::{
    CancelExchange, CancelOutcome, ConfirmExchange, ConfirmOutcome, HideExchange,
    RequestExchange, RequestOutcome, RespondOutcome, RespondToExchange, ViewExchange,
};

/// Log a failed operation at the level its kind deserves.
pub(crate) fn log_failure(operation: &'static str, err: &CoordinatorError) {
    match err.kind() {
        ErrorKind::Internal => error!(operation, error = %err, "Operation failed"),
        kind => debug!(operation, kind = kind.name(), error = %err, "Operation rejected"),
    }
}

/// Runs exchange lifecycle operations against a document store.
pub struct ExchangeCoordinator<S: DocumentStore, N: NotificationPort> {
    /// Store the transactions run against
    store: Arc<S>,
    /// Post-commit notification fan-out
    dispatcher: Arc<NotificationDispatcher<N>>,
}

impl<S: DocumentStore, N: NotificationPort> ExchangeCoordinator<S, N> {
    /// Create a new coordinator.
    pub fn new(store: Arc<S>, dispatcher: Arc<NotificationDispatcher<N>>) -> Self {
        Self { store, dispatcher }
    }

    /// Get the store (for inspection in tests).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Open a pending request for an item.
    pub async fn request_exchange(
        &self,
        item_id: ItemId,
        requester_id: UserId,
        message: Option<String>,
    ) -> CoordinatorResult<RequestOutcome> {
        let body = RequestExchange {
            item_id,
            requester_id,
            message,
        };

        let result = run_transaction(self.store.as_ref(), &body).await;
        let committed = self.finish("request_exchange", result)?;
        info!(
            exchange_id = %committed.outcome.exchange_id,
            %item_id,
            %requester_id,
            "Exchange requested"
        );

        self.dispatcher.dispatch(committed.notices).await;
        Ok(committed.outcome)
    }

    /// Owner accepts or rejects a pending request.
    pub async fn respond_to_exchange(
        &self,
        exchange_id: ExchangeId,
        actor_id: UserId,
        action: RespondAction,
    ) -> CoordinatorResult<RespondOutcome> {
        let body = RespondToExchange {
            exchange_id,
            actor_id,
            action,
        };

        let result = run_transaction(self.store.as_ref(), &body).await;
        let committed = self.finish("respond_to_exchange", result)?;
        info!(%exchange_id, ?action, status = %committed.outcome.status, "Exchange responded");

        self.dispatcher.dispatch(committed.notices).await;
        Ok(committed.outcome)
    }

    /// Either participant withdraws.
    pub async fn cancel_exchange(
        &self,
        exchange_id: ExchangeId,
        actor_id: UserId,
        reason: Option<String>,
    ) -> CoordinatorResult<CancelOutcome> {
        let body = CancelExchange {
            exchange_id,
            actor_id,
            reason,
        };

        let result = run_transaction(self.store.as_ref(), &body).await;
        let committed = self.finish("cancel_exchange", result)?;
        info!(%exchange_id, cancelled_by = %actor_id, "Exchange cancelled");

        self.dispatcher.dispatch(committed.notices).await;
        Ok(committed.outcome)
    }

    /// One participant confirms the hand-off; the second confirmation completes it.
    pub async fn confirm_exchange(
        &self,
        exchange_id: ExchangeId,
        actor_id: UserId,
    ) -> CoordinatorResult<ConfirmOutcome> {
        let body = ConfirmExchange {
            exchange_id,
            actor_id,
        };

        let result = run_transaction(self.store.as_ref(), &body).await;
        let committed = self.finish("confirm_exchange", result)?;
        info!(
            %exchange_id,
            confirmed_by = %actor_id,
            both_confirmed = committed.outcome.both_confirmed,
            "Exchange confirmed"
        );

        self.dispatcher.dispatch(committed.notices).await;
        Ok(committed.outcome)
    }

    /// Hide a finished or ongoing exchange from the actor's own list.
    pub async fn hide_exchange(
        &self,
        exchange_id: ExchangeId,
        actor_id: UserId,
    ) -> CoordinatorResult<()> {
        let body = HideExchange {
            exchange_id,
            actor_id,
        };

        let result = run_transaction(self.store.as_ref(), &body).await;
        self.finish("hide_exchange", result)?;
        debug!(%exchange_id, %actor_id, "Exchange hidden");
        Ok(())
    }

    /// Participant-only read; the status comes back normalized.
    pub async fn get_exchange(
        &self,
        exchange_id: ExchangeId,
        actor_id: UserId,
    ) -> CoordinatorResult<Exchange> {
        let body = ViewExchange {
            exchange_id,
            actor_id,
        };

        let result = run_transaction(self.store.as_ref(), &body).await;
        self.finish("get_exchange", result)
    }

    fn finish<T>(
        &self,
        operation: &'static str,
        result: CoordinatorResult<T>,
    ) -> CoordinatorResult<T> {
        if let Err(e) = &result {
            log_failure(operation, e);
        }
        result
    }
}

// =============================================================================
// Tests
// =============================================================================
