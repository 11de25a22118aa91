//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post, put},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{auth_middleware, track_http_metrics};
use crate::presentation::websocket::ws_handler;
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes(state.clone()))
        // WebSocket gateway endpoint; the token travels in the query string
        .route("/gateway", get(ws_handler))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(track_http_metrics))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

/// API v1 routes
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/users", user_routes(state))
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new().route("/sign-in", post(handlers::auth::sign_in))
}

/// User routes (protected)
fn user_routes(state: AppState) -> Router<AppState> {
    // Photo uploads may exceed the default body limit; the blob store
    // enforces its own maximum.
    let photo_limit = state.settings.blob.max_upload_bytes + 1;

    Router::new()
        .route(
            "/@me",
            get(handlers::user::get_current_user).patch(handlers::user::update_current_user),
        )
        .route("/@me/settings", patch(handlers::user::update_settings))
        .route(
            "/@me/photo",
            put(handlers::user::update_photo).layer(DefaultBodyLimit::max(photo_limit)),
        )
        .route("/search", get(handlers::user::search_users))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
