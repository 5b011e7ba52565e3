//! Review submission and rating aggregation.
//!
//! Run with: `cargo test -p swapmeet-exec --test ratings`

use rust_decimal_macros::dec;
use std::sync::Arc;
use swapmeet_domain::{ExchangeStatus, ReviewKey};
use swapmeet_exec::{CoordinatorError, ErrorKind, ReviewSubmission};
use swapmeet_testkit::{seed_exchange, seed_item, seed_user, seed_user_with_rating, Marketplace};
use uuid::Uuid;

fn submission(
    exchange_id: Uuid,
    reviewer_id: Uuid,
    target_user_id: Uuid,
    rating: i64,
) -> ReviewSubmission {
    ReviewSubmission {
        exchange_id,
        reviewer_id,
        target_user_id,
        rating,
        comment: "Smooth hand-off".to_string(),
        item_title: None,
    }
}

#[tokio::test]
async fn test_five_star_on_four_of_two_gives_four_point_three() {
    let market = Marketplace::new();
    let owner = seed_user_with_rating(&market.store, "Owner", dec!(4.0), 2);
    let requester = seed_user(&market.store, "Requester");
    let item = seed_item(&market.store, &owner, "Tent");
    let exchange = seed_exchange(&market.store, &item, &requester, ExchangeStatus::Completed);

    let receipt = market
        .ratings
        .submit_review(submission(exchange.id, requester.id, owner.id, 5))
        .await
        .unwrap();

    assert_eq!(receipt.review_id, format!("{}_{}", exchange.id, requester.id));
    assert_eq!(receipt.target_rating.average, dec!(4.3));
    assert_eq!(receipt.target_rating.count, 3);

    let stored = market.store.user(owner.id).unwrap();
    assert_eq!(stored.rating.average, dec!(4.3));
    assert_eq!(stored.rating.count, 3);

    let review = market.store.review(&ReviewKey::new(exchange.id, requester.id)).unwrap();
    assert_eq!(review.item_title, "Tent");
    assert_eq!(review.reviewer_name.as_deref(), Some("Requester"));
    assert_eq!(review.rating.value(), 5);

    assert_eq!(market.notifier.kinds_for(owner.id), vec!["review_received"]);
}

#[tokio::test]
async fn test_both_parties_can_review_each_other() {
    let market = Marketplace::new();
    let owner = seed_user(&market.store, "Owner");
    let requester = seed_user(&market.store, "Requester");
    let item = seed_item(&market.store, &owner, "Tent");
    let exchange = seed_exchange(&market.store, &item, &requester, ExchangeStatus::Completed);

    market
        .ratings
        .submit_review(submission(exchange.id, requester.id, owner.id, 4))
        .await
        .unwrap();
    market
        .ratings
        .submit_review(submission(exchange.id, owner.id, requester.id, 2))
        .await
        .unwrap();

    assert_eq!(market.store.review_count(), 2);
    assert_eq!(market.store.user(owner.id).unwrap().rating.average, dec!(4.0));
    assert_eq!(market.store.user(requester.id).unwrap().rating.average, dec!(2.0));
}

#[tokio::test]
async fn test_second_review_is_duplicate_and_aggregate_unchanged() {
    let market = Marketplace::new();
    let owner = seed_user(&market.store, "Owner");
    let requester = seed_user(&market.store, "Requester");
    let item = seed_item(&market.store, &owner, "Tent");
    let exchange = seed_exchange(&market.store, &item, &requester, ExchangeStatus::Completed);

    market
        .ratings
        .submit_review(submission(exchange.id, requester.id, owner.id, 5))
        .await
        .unwrap();
    let err = market
        .ratings
        .submit_review(submission(exchange.id, requester.id, owner.id, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, CoordinatorError::DuplicateReview));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let rating = market.store.user(owner.id).unwrap().rating;
    assert_eq!(rating.average, dec!(5.0));
    assert_eq!(rating.count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicates_apply_exactly_once() {
    let market = Arc::new(Marketplace::new());
    let owner = seed_user(&market.store, "Owner");
    let requester = seed_user(&market.store, "Requester");
    let item = seed_item(&market.store, &owner, "Tent");
    let exchange = seed_exchange(&market.store, &item, &requester, ExchangeStatus::Completed);

    let mut handles = Vec::new();
    for _ in 0..6 {
        let market = Arc::clone(&market);
        let review = submission(exchange.id, requester.id, owner.id, 5);
        handles.push(tokio::spawn(async move { market.ratings.submit_review(review).await }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(e) => assert!(
                matches!(e.kind(), ErrorKind::Conflict | ErrorKind::Internal),
                "unexpected error: {:?}",
                e
            ),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(market.store.review_count(), 1);
    assert_eq!(market.store.user(owner.id).unwrap().rating.count, 1);
}

#[tokio::test]
async fn test_rating_out_of_range_is_validation() {
    let market = Marketplace::new();
    let owner = seed_user(&market.store, "Owner");
    let requester = seed_user(&market.store, "Requester");
    let item = seed_item(&market.store, &owner, "Tent");
    let exchange = seed_exchange(&market.store, &item, &requester, ExchangeStatus::Completed);

    for rating in [0, 6, -1] {
        let err = market
            .ratings
            .submit_review(submission(exchange.id, requester.id, owner.id, rating))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    assert_eq!(market.store.review_count(), 0);
}

#[tokio::test]
async fn test_non_participant_and_missing_target() {
    let market = Marketplace::new();
    let owner = seed_user(&market.store, "Owner");
    let requester = seed_user(&market.store, "Requester");
    let stranger = seed_user(&market.store, "Stranger");
    let item = seed_item(&market.store, &owner, "Tent");
    let exchange = seed_exchange(&market.store, &item, &requester, ExchangeStatus::Completed);

    let err = market
        .ratings
        .submit_review(submission(exchange.id, stranger.id, owner.id, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::NotParticipant));
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = market
        .ratings
        .submit_review(submission(exchange.id, requester.id, Uuid::now_v7(), 3))
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::TargetNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = market
        .ratings
        .submit_review(submission(Uuid::now_v7(), requester.id, owner.id, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::ExchangeNotFound(_)));

    assert_eq!(market.store.review_count(), 0);
}

#[tokio::test]
async fn test_self_review_is_rejected() {
    let market = Marketplace::new();
    let owner = seed_user(&market.store, "Owner");
    let requester = seed_user(&market.store, "Requester");
    let item = seed_item(&market.store, &owner, "Tent");
    let exchange = seed_exchange(&market.store, &item, &requester, ExchangeStatus::Completed);

    let err = market
        .ratings
        .submit_review(submission(exchange.id, requester.id, requester.id, 5))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(market.store.user(requester.id).unwrap().rating.count, 0);
}

#[tokio::test]
async fn test_caller_item_title_is_kept() {
    let market = Marketplace::new();
    let owner = seed_user(&market.store, "Owner");
    let requester = seed_user(&market.store, "Requester");
    let item = seed_item(&market.store, &owner, "Tent");
    let exchange = seed_exchange(&market.store, &item, &requester, ExchangeStatus::Completed);

    let mut review = submission(exchange.id, requester.id, owner.id, 4);
    review.item_title = Some("Two-person tent".to_string());
    market.ratings.submit_review(review).await.unwrap();

    let stored = market.store.review(&ReviewKey::new(exchange.id, requester.id)).unwrap();
    assert_eq!(stored.item_title, "Two-person tent");
    assert_eq!(stored.comment, "Smooth hand-off");
}

#[tokio::test]
async fn test_only_the_counterparty_can_be_rated() {
    let market = Marketplace::new();
    let owner = seed_user(&market.store, "Owner");
    let requester = seed_user(&market.store, "Requester");
    let bystander = seed_user(&market.store, "Bystander");
    let item = seed_item(&market.store, &owner, "Tent");
    let exchange = seed_exchange(&market.store, &item, &requester, ExchangeStatus::Completed);

    let err = market
        .ratings
        .submit_review(submission(exchange.id, requester.id, bystander.id, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, CoordinatorError::NotCounterparty));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(market.store.user(bystander.id).unwrap().rating.count, 0);
    assert_eq!(market.store.review_count(), 0);
    assert!(market.notifier.pushes().is_empty());

    // The rejected attempt does not use up the reviewer's one review
    market
        .ratings
        .submit_review(submission(exchange.id, requester.id, owner.id, 4))
        .await
        .unwrap();
    assert_eq!(market.store.user(owner.id).unwrap().rating.count, 1);
}
