use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all engine endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route(
            "/v1/listings",
            post(handler::create_listing).get(handler::list_listings),
        )
        .route("/v1/listings/:id", get(handler::get_listing))
        .route(
            "/v1/listings/:id/bids",
            get(handler::listing_bids).post(handler::place_bid),
        )
        .route("/v1/listings/:id/complete", post(handler::complete_auction))
        .route(
            "/v1/posts/:id/like",
            post(handler::like_post).delete(handler::unlike_post),
        )
        .route("/v1/posts/:id/comments", post(handler::add_comment))
        .route("/v1/comments/:id", delete(handler::delete_comment))
        .route(
            "/v1/users/:id/follow",
            post(handler::follow_user).delete(handler::unfollow_user),
        )
        .route(
            "/v1/counters/:entity/:field/adjust",
            post(handler::adjust_counter),
        )
        .route(
            "/v1/counters/:entity/:field/reconcile",
            post(handler::reconcile_counter),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
