//! Rating aggregator: one review per reviewer per exchange, folded into the
//! target's running average in the same transaction.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use swapmeet_domain::{
    ExchangeEvent, ExchangeId, Notice, Rating, RatingAggregate, Review, ReviewKey, UserId,
};
use swapmeet_engine::next_rating;
use swapmeet_store::{run_transaction, DocumentStore, Transaction, TransactionBody};
use tracing::info;

use crate::coordinator::log_failure;
use crate::dispatch::NotificationDispatcher;
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::ports::NotificationPort;
use crate::transitions::Committed;

/// Longest comment accepted, in characters
pub const MAX_COMMENT_CHARS: usize = 2000;

/// Input for [`RatingAggregator::submit_review`].
#[derive(Debug, Clone)]
pub struct ReviewSubmission {
    /// Exchange being reviewed
    pub exchange_id: ExchangeId,
    /// Participant leaving the review
    pub reviewer_id: UserId,
    /// User receiving the rating
    pub target_user_id: UserId,
    /// Raw score, validated to `1..=5`
    pub rating: i64,
    /// Free text, may be empty
    pub comment: String,
    /// Item title as shown to the reviewer; falls back to the exchange snapshot
    pub item_title: Option<String>,
}

/// Result of a submitted review.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReceipt {
    /// `{exchangeId}_{reviewerId}`
    pub review_id: String,
    /// Target's aggregate after the fold
    pub target_rating: RatingAggregate,
}

struct SubmitReview {
    key: ReviewKey,
    target_user_id: UserId,
    rating: Rating,
    comment: String,
    item_title: Option<String>,
}

#[async_trait]
impl TransactionBody for SubmitReview {
    type Output = Committed<ReviewReceipt>;
    type Error = CoordinatorError;

    async fn run(&self, tx: &mut dyn Transaction) -> CoordinatorResult<Self::Output> {
        // Dedup read comes first so concurrent duplicates collide on it
        if tx.get_review(&self.key).await?.is_some() {
            return Err(CoordinatorError::DuplicateReview);
        }

        let exchange = tx
            .get_exchange(self.key.exchange_id)
            .await?
            .ok_or(CoordinatorError::ExchangeNotFound(self.key.exchange_id))?;

        let role = exchange
            .role_of(self.key.reviewer_id)
            .ok_or(CoordinatorError::NotParticipant)?;

        let mut target = tx
            .get_user(self.target_user_id)
            .await?
            .ok_or(CoordinatorError::TargetNotFound(self.target_user_id))?;

        if target.id != exchange.counterparty(role) {
            return Err(CoordinatorError::NotCounterparty);
        }

        let reviewer_name = tx.get_user(self.key.reviewer_id).await?.map(|u| u.display_name);
        let now = Utc::now();

        let review = Review {
            id: self.key.document_id(),
            exchange_id: self.key.exchange_id,
            reviewer_id: self.key.reviewer_id,
            target_user_id: self.target_user_id,
            rating: self.rating,
            comment: self.comment.clone(),
            item_title: self
                .item_title
                .clone()
                .unwrap_or_else(|| exchange.item_title.clone()),
            reviewer_name,
            created_at: now,
        };

        target.rating = next_rating(target.rating, self.rating);

        tx.put_review(&review).await?;
        tx.put_user(&target).await?;

        let notice = Notice::new(
            target.id,
            ExchangeEvent::ReviewReceived {
                exchange_id: exchange.id,
                review_id: review.id.clone(),
                reviewer_id: review.reviewer_id,
                rating: self.rating,
                timestamp: now,
            },
        );

        Ok(Committed::new(
            ReviewReceipt {
                review_id: review.id,
                target_rating: target.rating,
            },
            vec![notice],
        ))
    }
}

/// Applies reviews to user rating aggregates exactly once.
pub struct RatingAggregator<S: DocumentStore, N: NotificationPort> {
    store: Arc<S>,
    dispatcher: Arc<NotificationDispatcher<N>>,
}

impl<S: DocumentStore, N: NotificationPort> RatingAggregator<S, N> {
    /// Create an aggregator sharing a dispatcher with the coordinator.
    pub fn new(store: Arc<S>, dispatcher: Arc<NotificationDispatcher<N>>) -> Self {
        Self { store, dispatcher }
    }

    /// Record a review and fold its rating into the target's aggregate.
    ///
    /// Rejects a second review by the same reviewer on the same exchange with
    /// `DuplicateReview`, including when both arrive concurrently.
    pub async fn submit_review(
        &self,
        submission: ReviewSubmission,
    ) -> CoordinatorResult<ReviewReceipt> {
        let result = self.submit(submission).await;
        if let Err(e) = &result {
            log_failure("submit_review", e);
        }
        result
    }

    async fn submit(&self, submission: ReviewSubmission) -> CoordinatorResult<ReviewReceipt> {
        let rating = Rating::new(submission.rating)?;

        if submission.reviewer_id == submission.target_user_id {
            return Err(CoordinatorError::Validation(
                "You cannot review yourself".to_string(),
            ));
        }

        let comment = submission.comment.trim().to_string();
        if comment.chars().count() > MAX_COMMENT_CHARS {
            return Err(CoordinatorError::Validation(format!(
                "Comment must be at most {} characters",
                MAX_COMMENT_CHARS
            )));
        }

        let body = SubmitReview {
            key: ReviewKey::new(submission.exchange_id, submission.reviewer_id),
            target_user_id: submission.target_user_id,
            rating,
            comment,
            item_title: submission
                .item_title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        };

        let committed = run_transaction(self.store.as_ref(), &body).await?;

        info!(
            review_id = %committed.outcome.review_id,
            target = %body.target_user_id,
            rating = %rating,
            average = %committed.outcome.target_rating.average,
            count = committed.outcome.target_rating.count,
            "Review recorded"
        );

        self.dispatcher.dispatch(committed.notices).await;
        Ok(committed.outcome)
    }
}
