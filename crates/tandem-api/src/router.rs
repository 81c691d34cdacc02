//! Route definitions for the Tandem HTTP API.
//!
//! REST and health routes are mounted under `/api`; feeds live under `/ws`.

use std::time::Duration;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::middleware::cors::build_cors_layer;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config.server.request_timeout_seconds);

    let api_routes = Router::new()
        .merge(presence_routes())
        .merge(session_routes())
        .layer(TimeoutLayer::new(request_timeout))
        .merge(health_routes());

    Router::new()
        .nest("/api", api_routes)
        .merge(stream_routes())
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&state.config.server.cors))
        .layer(axum_middleware::from_fn(
            middleware::logging::request_logging,
        ))
        .with_state(state)
}

fn presence_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/presence/heartbeat",
            post(handlers::presence::heartbeat),
        )
        .route("/presence/query", post(handlers::presence::query_presence))
        .route(
            "/presence/friends",
            get(handlers::presence::friends_presence),
        )
        .route("/presence/{user_id}", get(handlers::presence::get_presence))
}

fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(handlers::session::create_session))
        .route("/sessions/active", get(handlers::session::active_sessions))
        .route("/sessions/history", get(handlers::session::session_history))
        .route("/sessions/{id}", get(handlers::session::session_status))
        .route("/sessions/{id}/pause", post(handlers::session::set_pause))
        .route("/sessions/{id}/end", post(handlers::session::end_session))
        .route(
            "/sessions/{id}/cancel",
            post(handlers::session::cancel_session),
        )
}

fn stream_routes() -> Router<AppState> {
    Router::new()
        .route("/ws/sessions", get(handlers::stream::sessions_feed))
        .route("/ws/presence", get(handlers::stream::presence_feed))
}

fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}
