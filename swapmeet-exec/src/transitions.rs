//! Transaction bodies for each lifecycle operation.
//!
//! A body reads everything it decides on through the transaction, asks the
//! engine for the decision, buffers its writes and returns the notices to
//! send once the commit succeeded. Bodies own their inputs so the store can
//! replay them after a conflict.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use swapmeet_domain::{
    Exchange, ExchangeEvent, ExchangeId, ExchangeStatus, Item, ItemId, ItemStatus, Notice,
    RespondAction, Role, UserId,
};
use swapmeet_engine::{
    cancel_reason_required, decide_confirmation, item_status_after_release, normalize_reason,
    validate_transition, Confirmation,
};
use swapmeet_store::{Transaction, TransactionBody};
use tracing::debug;

use crate::error::{CoordinatorError, CoordinatorResult};

/// Reason recorded on claims closed because the item went to someone else
const HANDED_OFF_REASON: &str = "Item was exchanged with another user";

// =============================================================================
// Outcomes
// =============================================================================

/// Result of creating an exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOutcome {
    /// New exchange id
    pub exchange_id: ExchangeId,
    /// Always `pending`
    pub status: ExchangeStatus,
}

/// Result of accepting or rejecting a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondOutcome {
    /// Status after the response
    pub status: ExchangeStatus,
}

/// Result of a cancellation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOutcome {
    /// Always `cancelled`
    pub status: ExchangeStatus,
}

/// Result of a confirmation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmOutcome {
    /// Both parties have confirmed
    pub both_confirmed: bool,
    /// Status after the confirmation
    pub status: ExchangeStatus,
}

/// A committed body's result plus what to tell whom.
pub(crate) struct Committed<T> {
    pub(crate) outcome: T,
    pub(crate) notices: Vec<Notice>,
}

impl<T> Committed<T> {
    pub(crate) fn new(outcome: T, notices: Vec<Notice>) -> Self {
        Self { outcome, notices }
    }

    pub(crate) fn quiet(outcome: T) -> Self {
        Self::new(outcome, Vec::new())
    }
}

// =============================================================================
// Shared reads
// =============================================================================

async fn load_exchange(
    tx: &mut dyn Transaction,
    exchange_id: ExchangeId,
) -> CoordinatorResult<Exchange> {
    tx.get_exchange(exchange_id)
        .await?
        .ok_or(CoordinatorError::ExchangeNotFound(exchange_id))
}

async fn load_item(tx: &mut dyn Transaction, item_id: ItemId) -> CoordinatorResult<Item> {
    tx.get_item(item_id).await?.ok_or(CoordinatorError::ItemNotFound(item_id))
}

/// Revert the item to available when `closing` was the last active claim on it.
///
/// Must run before `closing` is written back, so the active query still sees
/// the committed set.
async fn release_item(
    tx: &mut dyn Transaction,
    closing: &Exchange,
    now: DateTime<Utc>,
) -> CoordinatorResult<()> {
    let other_active = tx
        .find_active_exchanges_for_item(closing.item_id)
        .await?
        .iter()
        .filter(|e| e.id != closing.id)
        .count();

    let mut item = load_item(tx, closing.item_id).await?;
    if let Some(status) = item_status_after_release(item.status, other_active) {
        debug!(item_id = %item.id, %status, "Releasing item");
        item.set_status(status, now);
        tx.put_item(&item).await?;
    } else {
        debug!(item_id = %item.id, other_active, "Item stays held");
    }

    Ok(())
}

/// Refuse to promise an item that is handed off or already promised elsewhere.
async fn claim_item(tx: &mut dyn Transaction, accepting: &Exchange) -> CoordinatorResult<()> {
    let item = load_item(tx, accepting.item_id).await?;
    if item.status == ItemStatus::Completed {
        return Err(CoordinatorError::ItemUnavailable(item.id));
    }

    let promised = tx
        .find_active_exchanges_for_item(item.id)
        .await?
        .iter()
        .any(|e| e.id != accepting.id && e.current_status() == ExchangeStatus::InProgress);
    if promised {
        return Err(CoordinatorError::ItemPromised(item.id));
    }

    Ok(())
}

/// Close every other active claim on an item that was just handed off.
///
/// Pending requests are rejected; a stray in-progress claim is cancelled on
/// the owner's behalf.
async fn close_siblings(
    tx: &mut dyn Transaction,
    completed: &Exchange,
    now: DateTime<Utc>,
) -> CoordinatorResult<Vec<Notice>> {
    let siblings: Vec<Exchange> = tx
        .find_active_exchanges_for_item(completed.item_id)
        .await?
        .into_iter()
        .filter(|e| e.id != completed.id)
        .collect();

    let mut notices = Vec::with_capacity(siblings.len());
    for mut sibling in siblings {
        let event = if sibling.current_status() == ExchangeStatus::Pending {
            sibling.status = ExchangeStatus::Rejected;
            ExchangeEvent::Rejected {
                exchange_id: sibling.id,
                item_title: sibling.item_title.clone(),
                timestamp: now,
            }
        } else {
            let reason = Some(HANDED_OFF_REASON.to_string());
            sibling.status = ExchangeStatus::Cancelled;
            sibling.cancel_reason = reason.clone();
            sibling.cancelled_by = Some(completed.owner_id);
            sibling.cancelled_at = Some(now);
            ExchangeEvent::Cancelled {
                exchange_id: sibling.id,
                item_title: sibling.item_title.clone(),
                cancelled_by: completed.owner_id,
                reason,
                timestamp: now,
            }
        };

        sibling.updated_at = now;
        tx.put_exchange(&sibling).await?;
        debug!(exchange_id = %sibling.id, status = %sibling.status, "Closed sibling exchange");
        notices.push(Notice::new(sibling.requester_id, event));
    }

    Ok(notices)
}

fn set_confirmed(exchange: &mut Exchange, role: Role) {
    match role {
        Role::Owner => exchange.owner_confirmed = true,
        Role::Requester => exchange.requester_confirmed = true,
    }
}

// =============================================================================
// Request
// =============================================================================

pub(crate) struct RequestExchange {
    pub(crate) item_id: ItemId,
    pub(crate) requester_id: UserId,
    pub(crate) message: Option<String>,
}

#[async_trait]
impl TransactionBody for RequestExchange {
    type Output = Committed<RequestOutcome>;
    type Error = CoordinatorError;

    async fn run(&self, tx: &mut dyn Transaction) -> CoordinatorResult<Self::Output> {
        let mut item = load_item(tx, self.item_id).await?;

        if item.owner_id == self.requester_id {
            return Err(CoordinatorError::OwnItem);
        }
        if item.status == ItemStatus::Completed {
            return Err(CoordinatorError::ItemUnavailable(item.id));
        }

        let active = tx.find_active_exchanges_for_item(item.id).await?;
        if active.iter().any(|e| e.requester_id == self.requester_id) {
            return Err(CoordinatorError::DuplicateRequest);
        }

        let exchange = Exchange::request(&item, self.requester_id, self.message.clone());
        tx.put_exchange(&exchange).await?;

        if item.status != ItemStatus::Pending {
            item.set_status(ItemStatus::Pending, exchange.created_at);
            tx.put_item(&item).await?;
        }

        let notice = Notice::new(
            exchange.owner_id,
            ExchangeEvent::Requested {
                exchange_id: exchange.id,
                item_id: item.id,
                item_title: exchange.item_title.clone(),
                requester_id: self.requester_id,
                timestamp: exchange.created_at,
            },
        );

        Ok(Committed::new(
            RequestOutcome {
                exchange_id: exchange.id,
                status: exchange.status,
            },
            vec![notice],
        ))
    }
}

// =============================================================================
// Respond
// =============================================================================

pub(crate) struct RespondToExchange {
    pub(crate) exchange_id: ExchangeId,
    pub(crate) actor_id: UserId,
    pub(crate) action: RespondAction,
}

#[async_trait]
impl TransactionBody for RespondToExchange {
    type Output = Committed<RespondOutcome>;
    type Error = CoordinatorError;

    async fn run(&self, tx: &mut dyn Transaction) -> CoordinatorResult<Self::Output> {
        let mut exchange = load_exchange(tx, self.exchange_id).await?;

        if exchange.owner_id != self.actor_id {
            return Err(CoordinatorError::NotOwner);
        }

        let target = self.action.target_status();
        validate_transition(exchange.status, target)?;

        let now = Utc::now();
        match self.action {
            RespondAction::Accept => claim_item(tx, &exchange).await?,
            RespondAction::Reject => release_item(tx, &exchange, now).await?,
        }

        exchange.status = target;
        exchange.updated_at = now;
        tx.put_exchange(&exchange).await?;

        let event = match self.action {
            RespondAction::Accept => ExchangeEvent::Accepted {
                exchange_id: exchange.id,
                item_title: exchange.item_title.clone(),
                timestamp: now,
            },
            RespondAction::Reject => ExchangeEvent::Rejected {
                exchange_id: exchange.id,
                item_title: exchange.item_title.clone(),
                timestamp: now,
            },
        };

        Ok(Committed::new(
            RespondOutcome { status: target },
            vec![Notice::new(exchange.requester_id, event)],
        ))
    }
}

// =============================================================================
// Cancel
// =============================================================================

pub(crate) struct CancelExchange {
    pub(crate) exchange_id: ExchangeId,
    pub(crate) actor_id: UserId,
    pub(crate) reason: Option<String>,
}

#[async_trait]
impl TransactionBody for CancelExchange {
    type Output = Committed<CancelOutcome>;
    type Error = CoordinatorError;

    async fn run(&self, tx: &mut dyn Transaction) -> CoordinatorResult<Self::Output> {
        let mut exchange = load_exchange(tx, self.exchange_id).await?;

        if exchange.status == ExchangeStatus::Cancelled {
            return Err(CoordinatorError::AlreadyCancelled);
        }

        let role = exchange.role_of(self.actor_id).ok_or(CoordinatorError::NotParticipant)?;
        validate_transition(exchange.status, ExchangeStatus::Cancelled)?;

        let reason = normalize_reason(self.reason.as_deref());
        if reason.is_none() && cancel_reason_required(role, exchange.status) {
            return Err(CoordinatorError::Validation(
                "A reason is required to cancel this exchange".to_string(),
            ));
        }

        let now = Utc::now();
        release_item(tx, &exchange, now).await?;

        exchange.status = ExchangeStatus::Cancelled;
        exchange.cancel_reason = reason.clone();
        exchange.cancelled_by = Some(self.actor_id);
        exchange.cancelled_at = Some(now);
        exchange.updated_at = now;
        tx.put_exchange(&exchange).await?;

        let notice = Notice::new(
            exchange.counterparty(role),
            ExchangeEvent::Cancelled {
                exchange_id: exchange.id,
                item_title: exchange.item_title.clone(),
                cancelled_by: self.actor_id,
                reason,
                timestamp: now,
            },
        );

        Ok(Committed::new(
            CancelOutcome {
                status: ExchangeStatus::Cancelled,
            },
            vec![notice],
        ))
    }
}

// =============================================================================
// Confirm
// =============================================================================

pub(crate) struct ConfirmExchange {
    pub(crate) exchange_id: ExchangeId,
    pub(crate) actor_id: UserId,
}

#[async_trait]
impl TransactionBody for ConfirmExchange {
    type Output = Committed<ConfirmOutcome>;
    type Error = CoordinatorError;

    async fn run(&self, tx: &mut dyn Transaction) -> CoordinatorResult<Self::Output> {
        let mut exchange = load_exchange(tx, self.exchange_id).await?;
        let role = exchange.role_of(self.actor_id).ok_or(CoordinatorError::NotParticipant)?;
        let decision = decide_confirmation(&exchange, role);

        // Repeating a confirmation after completion is a no-op
        if exchange.current_status() == ExchangeStatus::Completed {
            if let Confirmation::AlreadyConfirmed { .. } = decision {
                return Ok(Committed::quiet(ConfirmOutcome {
                    both_confirmed: exchange.both_confirmed(),
                    status: ExchangeStatus::Completed,
                }));
            }
        }

        validate_transition(exchange.status, ExchangeStatus::Completed)?;

        let both_confirmed = match decision {
            Confirmation::AlreadyConfirmed {
                both_confirmed: false,
            } => {
                return Ok(Committed::quiet(ConfirmOutcome {
                    both_confirmed: false,
                    status: exchange.current_status(),
                }));
            },
            other => other.both_confirmed(),
        };

        let now = Utc::now();
        set_confirmed(&mut exchange, role);
        exchange.updated_at = now;

        let mut notices = Vec::new();
        let event = if both_confirmed {
            let mut item = load_item(tx, exchange.item_id).await?;
            if item.status != ItemStatus::Pending {
                return Err(CoordinatorError::ItemUnavailable(item.id));
            }

            notices = close_siblings(tx, &exchange, now).await?;

            exchange.status = ExchangeStatus::Completed;
            exchange.completed_at = Some(now);
            item.set_status(ItemStatus::Completed, now);
            tx.put_item(&item).await?;

            ExchangeEvent::Completed {
                exchange_id: exchange.id,
                item_title: exchange.item_title.clone(),
                timestamp: now,
            }
        } else {
            ExchangeEvent::Confirmed {
                exchange_id: exchange.id,
                item_title: exchange.item_title.clone(),
                confirmed_by: self.actor_id,
                timestamp: now,
            }
        };
        tx.put_exchange(&exchange).await?;
        notices.insert(0, Notice::new(exchange.counterparty(role), event));

        Ok(Committed::new(
            ConfirmOutcome {
                both_confirmed,
                status: exchange.current_status(),
            },
            notices,
        ))
    }
}

// =============================================================================
// Hide / View
// =============================================================================

pub(crate) struct HideExchange {
    pub(crate) exchange_id: ExchangeId,
    pub(crate) actor_id: UserId,
}

#[async_trait]
impl TransactionBody for HideExchange {
    type Output = ();
    type Error = CoordinatorError;

    async fn run(&self, tx: &mut dyn Transaction) -> CoordinatorResult<()> {
        let mut exchange = load_exchange(tx, self.exchange_id).await?;

        if !exchange.is_participant(self.actor_id) {
            return Err(CoordinatorError::NotParticipant);
        }

        if !exchange.is_hidden_for(self.actor_id) {
            exchange.hidden_for.push(self.actor_id);
            tx.put_exchange(&exchange).await?;
        }

        Ok(())
    }
}

pub(crate) struct ViewExchange {
    pub(crate) exchange_id: ExchangeId,
    pub(crate) actor_id: UserId,
}

#[async_trait]
impl TransactionBody for ViewExchange {
    type Output = Exchange;
    type Error = CoordinatorError;

    async fn run(&self, tx: &mut dyn Transaction) -> CoordinatorResult<Exchange> {
        let mut exchange = load_exchange(tx, self.exchange_id).await?;

        if !exchange.is_participant(self.actor_id) {
            return Err(CoordinatorError::NotParticipant);
        }

        exchange.status = exchange.current_status();
        Ok(exchange)
    }
}
