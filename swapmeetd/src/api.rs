//! HTTP API for the Swapmeet daemon.
//!
//! Provides REST endpoints for:
//! - Health check
//! - Requesting an item
//! - Viewing, responding to, cancelling, confirming and hiding an exchange
//! - Reviewing the other participant
//!
//! The acting user arrives in the `x-user-id` header, set by the session
//! layer in front of the daemon.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request, State},
    http::{request::Parts, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use swapmeet_domain::{DomainError, Exchange, RespondAction, UserId};
use swapmeet_exec::{
    CancelOutcome, ConfirmOutcome, ExchangeCoordinator, NotificationPort, RatingAggregator,
    RequestOutcome, RespondOutcome, ReviewReceipt, ReviewSubmission,
};
use swapmeet_store::DocumentStore;

use crate::error::DaemonError;

/// Header carrying the authenticated actor.
pub const USER_ID_HEADER: &str = "x-user-id";

// =============================================================================
// API State
// =============================================================================

/// Shared state for API handlers.
pub struct ApiState<S: DocumentStore + 'static, N: NotificationPort + 'static> {
    pub coordinator: Arc<ExchangeCoordinator<S, N>>,
    pub ratings: Arc<RatingAggregator<S, N>>,
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Request to open an exchange.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExchangeRequest {
    pub item_id: Uuid,
    #[serde(default)]
    pub message: Option<String>,
}

/// Owner's answer, `accept` or `reject`.
#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub action: String,
}

/// Cancellation with an optional reason.
#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Review of the other participant.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub target_user_id: Uuid,
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub item_title: Option<String>,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

// =============================================================================
// Actor Extraction
// =============================================================================

/// The authenticated user making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub UserId);

#[async_trait]
impl<St: Send + Sync> FromRequestParts<St> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| {
                to_error_response(DaemonError::Unauthorized(format!(
                    "Missing {} header",
                    USER_ID_HEADER
                )))
            })?
            .to_str()
            .map_err(|_| {
                to_error_response(DaemonError::Unauthorized(format!(
                    "Malformed {} header",
                    USER_ID_HEADER
                )))
            })?;

        Uuid::parse_str(value.trim()).map(Actor).map_err(|_| {
            to_error_response(DaemonError::Unauthorized(format!(
                "Invalid {} header: {}",
                USER_ID_HEADER, value
            )))
        })
    }
}

/// JSON body whose rejections use the `{error, kind}` shape.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, St> FromRequest<St> for JsonBody<T>
where
    T: DeserializeOwned,
    St: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &St) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(to_error_response(DaemonError::InvalidBody(
                rejection.body_text(),
            ))),
        }
    }
}

// =============================================================================
// Router
// =============================================================================

/// Create the API router.
pub fn create_router<S, N>(state: Arc<ApiState<S, N>>) -> Router
where
    S: DocumentStore + 'static,
    N: NotificationPort + 'static,
{
    Router::new()
        .route("/health", get(health_handler))
        .route("/exchanges", post(create_exchange_handler))
        .route("/exchanges/:id", get(get_exchange_handler))
        .route("/exchanges/:id/respond", post(respond_handler))
        .route("/exchanges/:id/cancel", post(cancel_handler))
        .route("/exchanges/:id/confirm", post(confirm_handler))
        .route("/exchanges/:id/hide", post(hide_handler))
        .route("/exchanges/:id/reviews", post(review_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Open a pending request for an item.
async fn create_exchange_handler<S, N>(
    State(state): State<Arc<ApiState<S, N>>>,
    Actor(actor): Actor,
    JsonBody(req): JsonBody<CreateExchangeRequest>,
) -> Result<(StatusCode, Json<RequestOutcome>), ApiError>
where
    S: DocumentStore + 'static,
    N: NotificationPort + 'static,
{
    let outcome = state
        .coordinator
        .request_exchange(req.item_id, actor, req.message)
        .await
        .map_err(|e| to_error_response(e.into()))?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Participant view of one exchange.
async fn get_exchange_handler<S, N>(
    State(state): State<Arc<ApiState<S, N>>>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Exchange>, ApiError>
where
    S: DocumentStore + 'static,
    N: NotificationPort + 'static,
{
    let exchange = state
        .coordinator
        .get_exchange(id, actor)
        .await
        .map_err(|e| to_error_response(e.into()))?;

    Ok(Json(exchange))
}

/// Accept or reject a pending request.
async fn respond_handler<S, N>(
    State(state): State<Arc<ApiState<S, N>>>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<RespondRequest>,
) -> Result<Json<RespondOutcome>, ApiError>
where
    S: DocumentStore + 'static,
    N: NotificationPort + 'static,
{
    let action: RespondAction = req
        .action
        .parse()
        .map_err(|e: DomainError| to_error_response(e.into()))?;

    let outcome = state
        .coordinator
        .respond_to_exchange(id, actor, action)
        .await
        .map_err(|e| to_error_response(e.into()))?;

    Ok(Json(outcome))
}

/// Withdraw from an exchange. The body is optional.
async fn cancel_handler<S, N>(
    State(state): State<Arc<ApiState<S, N>>>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<CancelOutcome>, ApiError>
where
    S: DocumentStore + 'static,
    N: NotificationPort + 'static,
{
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let outcome = state
        .coordinator
        .cancel_exchange(id, actor, req.reason)
        .await
        .map_err(|e| to_error_response(e.into()))?;

    Ok(Json(outcome))
}

/// Confirm the hand-off.
async fn confirm_handler<S, N>(
    State(state): State<Arc<ApiState<S, N>>>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<ConfirmOutcome>, ApiError>
where
    S: DocumentStore + 'static,
    N: NotificationPort + 'static,
{
    let outcome = state
        .coordinator
        .confirm_exchange(id, actor)
        .await
        .map_err(|e| to_error_response(e.into()))?;

    Ok(Json(outcome))
}

/// Hide an exchange from the actor's list.
async fn hide_handler<S, N>(
    State(state): State<Arc<ApiState<S, N>>>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
    S: DocumentStore + 'static,
    N: NotificationPort + 'static,
{
    state
        .coordinator
        .hide_exchange(id, actor)
        .await
        .map_err(|e| to_error_response(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Review the other participant.
async fn review_handler<S, N>(
    State(state): State<Arc<ApiState<S, N>>>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<ReviewRequest>,
) -> Result<(StatusCode, Json<ReviewReceipt>), ApiError>
where
    S: DocumentStore + 'static,
    N: NotificationPort + 'static,
{
    let receipt = state
        .ratings
        .submit_review(ReviewSubmission {
            exchange_id: id,
            reviewer_id: actor,
            target_user_id: req.target_user_id,
            rating: req.rating,
            comment: req.comment,
            item_title: req.item_title,
        })
        .await
        .map_err(|e| to_error_response(e.into()))?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

// =============================================================================
// Error Mapping
// =============================================================================

const GENERIC_ERROR: &str = "Something went wrong, please try again";

fn to_error_response(error: DaemonError) -> ApiError {
    let (status, error, kind) = match error {
        DaemonError::Coordinator(e) => {
            let kind = e.kind();
            let status = StatusCode::from_u16(kind.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, e.public_message(), kind.name())
        },
        DaemonError::Domain(e) => (StatusCode::BAD_REQUEST, e.to_string(), "validation"),
        DaemonError::InvalidBody(msg) => (StatusCode::BAD_REQUEST, msg, "validation"),
        DaemonError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, "unauthorized"),
        other => {
            tracing::error!(error = %other, "Request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR.to_string(), "internal")
        },
    };

    (
        status,
        Json(ErrorResponse {
            error,
            kind: kind.to_string(),
        }),
    )
}

// =============================================================================
// Tests
// =============================================================================
