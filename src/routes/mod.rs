//! Router assembly: HTTP endpoints, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// API routes only; see `build_router` for the full app.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(http::http_health))
        // Tasks
        .route("/api/v1/tasks", get(http::http_list_tasks))
        .route("/api/v1/tasks/random", get(http::http_random_task))
        .route("/api/v1/tasks/:id", get(http::http_get_task))
        // Attempts + feedback
        .route("/api/v1/attempts", get(http::http_list_attempts).post(http::http_post_attempt))
        .route("/api/v1/attempts/:id", get(http::http_get_attempt))
        .route("/api/v1/attempts/:id/feedback", post(http::http_post_feedback))
        .route("/api/v1/attempts/:id/fill-in", get(http::http_get_fill_in))
        // PREP
        .route("/api/v1/prep/evaluate", post(http::http_post_prep_evaluate))
        .route("/api/v1/essays/generate", post(http::http_post_essay_generate))
        // Vocabulary / idiom review queue
        .route("/api/v1/items", get(http::http_list_items).post(http::http_post_item))
        .route("/api/v1/reviews", post(http::http_post_review))
        .route("/api/v1/reviews/due", get(http::http_get_due))
        .route("/api/v1/reviews/upcoming", get(http::http_get_upcoming))
        .route("/api/v1/reviews/stats", get(http::http_get_review_stats))
        .with_state(state)
}

/// Build the application router with:
/// - JSON API under `/api/v1/...`
/// - Static SPA from `STATIC_DIR` (default `./static`) with index fallback
/// - CORS (allow any origin/method/headers), adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = std::env::var("STATIC_DIR").unwrap_or_else(|_| "./static".into());
    let static_service = ServeDir::new(&static_dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(format!("{static_dir}/index.html")));

    api_router(state)
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
        // Frontend fallback
        .fallback_service(static_service)
}
