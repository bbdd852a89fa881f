use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use rv_counters::{CounterOutcome, ReconcileOutcome, SagaOutcome};
use rv_types::{
    Amount, BidRecord, CommentId, CounterField, CounterKey, EntityId, Listing, ListingId,
    ListingStatus, NewListing, PostId, UserId,
};

use crate::auth::Actor;
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ServerResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ServerError::BadRequest(e.body_text()))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn info_handler() -> Json<serde_json::Value> {
    Json(json!({
        "name": "rv-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// Listings

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    pub post_id: String,
    pub starting_bid: Amount,
    pub auction_end_time: DateTime<Utc>,
}

pub async fn create_listing(
    State(state): State<AppState>,
    Actor(owner): Actor,
    payload: Result<Json<CreateListingRequest>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<Listing>)> {
    let req = body(payload)?;
    let listing = state
        .lifecycle
        .create_listing(NewListing {
            post_id: PostId::new(req.post_id)?,
            owner_id: owner,
            starting_bid: req.starting_bid,
            auction_end_time: req.auction_end_time,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub async fn list_listings(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ServerResult<Json<Vec<Listing>>> {
    let Query(query) = query.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<ListingStatus>)
        .transpose()?;
    Ok(Json(state.lifecycle.list(status).await?))
}

pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Listing>> {
    let id: ListingId = id.parse()?;
    Ok(Json(state.lifecycle.get(&id).await?))
}

pub async fn listing_bids(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Vec<BidRecord>>> {
    let id: ListingId = id.parse()?;
    // 404 for unknown listings rather than an empty history.
    state.lifecycle.get(&id).await?;
    Ok(Json(state.arbiter.history(&id).await?))
}

#[derive(Debug, Deserialize)]
pub struct PlaceBidRequest {
    pub amount: Amount,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBidResponse {
    pub accepted_amount: Amount,
    pub version: u64,
}

pub async fn place_bid(
    State(state): State<AppState>,
    Actor(bidder): Actor,
    Path(id): Path<String>,
    payload: Result<Json<PlaceBidRequest>, JsonRejection>,
) -> ServerResult<Json<PlaceBidResponse>> {
    let id: ListingId = id.parse()?;
    let req = body(payload)?;
    let receipt = state.arbiter.place_bid(&id, &bidder, req.amount).await?;
    Ok(Json(PlaceBidResponse {
        accepted_amount: receipt.accepted_amount,
        version: receipt.version,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteResponse {
    pub status: ListingStatus,
    pub winning_bid: Amount,
    pub winner: Option<UserId>,
}

pub async fn complete_auction(
    State(state): State<AppState>,
    Actor(owner): Actor,
    Path(id): Path<String>,
) -> ServerResult<Json<CompleteResponse>> {
    let id: ListingId = id.parse()?;
    let listing = state.lifecycle.complete(&id, &owner).await?;
    Ok(Json(CompleteResponse {
        status: listing.status,
        winning_bid: listing.current_bid,
        winner: listing.highest_bidder,
    }))
}

// Relationships

pub async fn like_post(
    State(state): State<AppState>,
    Actor(user): Actor,
    Path(post): Path<String>,
) -> ServerResult<(StatusCode, Json<SagaOutcome>)> {
    let post = PostId::new(post)?;
    let outcome = state.saga.like(&user, &post).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn unlike_post(
    State(state): State<AppState>,
    Actor(user): Actor,
    Path(post): Path<String>,
) -> ServerResult<Json<SagaOutcome>> {
    let post = PostId::new(post)?;
    Ok(Json(state.saga.unlike(&user, &post).await?))
}

pub async fn follow_user(
    State(state): State<AppState>,
    Actor(follower): Actor,
    Path(followee): Path<String>,
) -> ServerResult<(StatusCode, Json<SagaOutcome>)> {
    let followee = UserId::new(followee)?;
    let outcome = state.saga.follow(&follower, &followee).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn unfollow_user(
    State(state): State<AppState>,
    Actor(follower): Actor,
    Path(followee): Path<String>,
) -> ServerResult<Json<SagaOutcome>> {
    let followee = UserId::new(followee)?;
    Ok(Json(state.saga.unfollow(&follower, &followee).await?))
}

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub text: String,
}

pub async fn add_comment(
    State(state): State<AppState>,
    Actor(author): Actor,
    Path(post): Path<String>,
    payload: Result<Json<AddCommentRequest>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<SagaOutcome>)> {
    let post = PostId::new(post)?;
    let req = body(payload)?;
    let outcome = state.saga.add_comment(&post, &author, &req.text).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Actor(requester): Actor,
    Path(id): Path<String>,
) -> ServerResult<Json<SagaOutcome>> {
    let id: CommentId = id.parse()?;
    Ok(Json(state.saga.delete_comment(&id, &requester).await?))
}

// Counters

fn counter_key(entity: String, field: &str) -> ServerResult<CounterKey> {
    let field: CounterField = field.parse()?;
    Ok(CounterKey::new(EntityId::new(entity)?, field))
}

/// A single relationship's worth of change. Larger corrections go through
/// reconcile.
#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub delta: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustResponse {
    pub new_value: u64,
    pub clamped_to_zero: bool,
}

impl From<CounterOutcome> for AdjustResponse {
    fn from(outcome: CounterOutcome) -> Self {
        Self {
            new_value: outcome.new_value,
            clamped_to_zero: outcome.clamped_to_zero,
        }
    }
}

pub async fn adjust_counter(
    State(state): State<AppState>,
    Actor(_caller): Actor,
    Path((entity, field)): Path<(String, String)>,
    payload: Result<Json<AdjustRequest>, JsonRejection>,
) -> ServerResult<Json<AdjustResponse>> {
    let key = counter_key(entity, &field)?;
    let req = body(payload)?;
    if !matches!(req.delta, 1 | -1) {
        return Err(ServerError::BadRequest(format!(
            "delta must be 1 or -1, got {}",
            req.delta
        )));
    }
    let outcome = state.ledger.apply_delta(&key, req.delta).await?;
    Ok(Json(outcome.into()))
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub outcome: &'static str,
    pub value: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
}

impl From<ReconcileOutcome> for ReconcileResponse {
    fn from(outcome: ReconcileOutcome) -> Self {
        match outcome {
            ReconcileOutcome::Corrected { from, to } => Self {
                outcome: "corrected",
                value: to,
                from: Some(from),
            },
            ReconcileOutcome::NoChange { value } => Self {
                outcome: "no_change",
                value,
                from: None,
            },
        }
    }
}

pub async fn reconcile_counter(
    State(state): State<AppState>,
    Actor(_caller): Actor,
    Path((entity, field)): Path<(String, String)>,
) -> ServerResult<Json<ReconcileResponse>> {
    let key = counter_key(entity, &field)?;
    Ok(Json(state.auditor.reconcile(&key).await?.into()))
}
