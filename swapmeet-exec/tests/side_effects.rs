//! Failure handling around the transaction: notification failures are
//! swallowed, storage failures surface as `Internal` and leave no writes.
//!
//! Run with: `cargo test -p swapmeet-exec --test side_effects`

use swapmeet_domain::{ExchangeStatus, ItemStatus, RespondAction};
use swapmeet_exec::{CoordinatorError, ErrorKind, ReviewSubmission};
use swapmeet_store::{MemoryStore, StoreError};
use swapmeet_testkit::{seed_exchange, seed_item, seed_user, Marketplace};

#[tokio::test]
async fn test_notification_failure_does_not_fail_or_undo_mutation() {
    let market = Marketplace::new();
    market.notifier.set_fail_push(true);
    market.notifier.set_fail_in_app(true);

    let owner = seed_user(&market.store, "Owner");
    let requester = seed_user(&market.store, "Requester");
    let item = seed_item(&market.store, &owner, "Tent");
    let exchange = seed_exchange(&market.store, &item, &requester, ExchangeStatus::Pending);

    let outcome = market
        .coordinator
        .respond_to_exchange(exchange.id, owner.id, RespondAction::Reject)
        .await
        .unwrap();

    assert_eq!(outcome.status, ExchangeStatus::Rejected);
    assert_eq!(market.store.exchange(exchange.id).unwrap().status, ExchangeStatus::Rejected);
    assert_eq!(market.store.item(item.id).unwrap().status, ItemStatus::Available);
    assert!(market.notifier.pushes().is_empty());
}

#[tokio::test]
async fn test_review_survives_notification_failure() {
    let market = Marketplace::new();
    market.notifier.set_fail_push(true);

    let owner = seed_user(&market.store, "Owner");
    let requester = seed_user(&market.store, "Requester");
    let item = seed_item(&market.store, &owner, "Tent");
    let exchange = seed_exchange(&market.store, &item, &requester, ExchangeStatus::Completed);

    market
        .ratings
        .submit_review(ReviewSubmission {
            exchange_id: exchange.id,
            reviewer_id: requester.id,
            target_user_id: owner.id,
            rating: 5,
            comment: String::new(),
            item_title: None,
        })
        .await
        .unwrap();

    assert_eq!(market.store.review_count(), 1);
    assert_eq!(market.notifier.in_app().len(), 1);
}

#[tokio::test]
async fn test_transient_conflicts_are_retried_transparently() {
    let market = Marketplace::with_store(MemoryStore::new().with_max_attempts(5));
    let owner = seed_user(&market.store, "Owner");
    let requester = seed_user(&market.store, "Requester");
    let item = seed_item(&market.store, &owner, "Tent");
    let exchange = seed_exchange(&market.store, &item, &requester, ExchangeStatus::Pending);

    market.store.inject_conflicts(3);
    let outcome = market
        .coordinator
        .respond_to_exchange(exchange.id, owner.id, RespondAction::Accept)
        .await
        .unwrap();

    assert_eq!(outcome.status, ExchangeStatus::InProgress);
    // One notification despite four body runs
    assert_eq!(market.notifier.kinds_for(requester.id), vec!["exchange_accepted"]);
}

#[tokio::test]
async fn test_exhausted_retries_are_internal_and_write_nothing() {
    let market = Marketplace::with_store(MemoryStore::new().with_max_attempts(2));
    let owner = seed_user(&market.store, "Owner");
    let requester = seed_user(&market.store, "Requester");
    let item = seed_item(&market.store, &owner, "Tent");
    let exchange = seed_exchange(&market.store, &item, &requester, ExchangeStatus::Pending);

    market.store.inject_conflicts(2);
    let err = market
        .coordinator
        .cancel_exchange(exchange.id, requester.id, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoordinatorError::Store(StoreError::RetriesExhausted { attempts: 2 })
    ));
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(market.store.exchange(exchange.id).unwrap().status, ExchangeStatus::Pending);
    assert_eq!(market.store.item(item.id).unwrap().status, ItemStatus::Pending);
    assert!(market.notifier.pushes().is_empty());
}

#[tokio::test]
async fn test_commit_failure_is_internal_and_not_notified() {
    let market = Marketplace::new();
    let owner = seed_user(&market.store, "Owner");
    let requester = seed_user(&market.store, "Requester");
    let item = seed_item(&market.store, &owner, "Tent");
    let exchange = seed_exchange(&market.store, &item, &requester, ExchangeStatus::InProgress);

    market.store.set_fail_commits(true);
    let err = market.coordinator.confirm_exchange(exchange.id, owner.id).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(!err.public_message().contains("injected"));
    assert!(!market.store.exchange(exchange.id).unwrap().owner_confirmed);
    assert!(market.notifier.pushes().is_empty());
}
