//! Router assembly: HTTP endpoints, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Header carrying the authenticated caller id, set by the auth layer in front of us.
pub const USER_HEADER: &str = "x-user-id";

/// Build the application router with:
/// - JSON API under `/api/v1/...`
/// - CORS (allow any origin/method/headers); adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/plans", get(http::http_list_plans))
        .route("/api/v1/plans/generate", post(http::http_generate_plan))
        .route("/api/v1/plans/recompute", post(http::http_recompute_plan))
        .route("/api/v1/plans/:plan_id", get(http::http_get_plan))
        .route("/api/v1/plans/:plan_id/archive", post(http::http_archive_plan))
        .route("/api/v1/challenges/:challenge_id", get(http::http_get_challenge))
        .route("/api/v1/submissions/evaluate", post(http::http_evaluate_submission))
        .route("/api/v1/progress", get(http::http_progress))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
