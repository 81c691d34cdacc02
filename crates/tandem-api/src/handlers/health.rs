//! Health check handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::dto::response::{DetailedHealthResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = chrono::Utc::now() - state.started_at;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds(),
    })
}

/// GET /api/health/detailed
///
/// Returns 503 when either store is unreachable.
pub async fn health_detailed(
    State(state): State<AppState>,
) -> (StatusCode, Json<DetailedHealthResponse>) {
    let presence_ok = state.stores.presence.health_check().await.unwrap_or(false);
    let sessions_ok = state.stores.sessions.health_check().await.unwrap_or(false);
    let healthy = presence_ok && sessions_ok;

    let describe = |ok: bool| if ok { "ok" } else { "unreachable" }.to_string();
    let body = DetailedHealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        store_provider: format!("{:?}", state.config.database.provider).to_lowercase(),
        presence_store: describe(presence_ok),
        session_store: describe(sessions_ok),
        feeds_open: state.realtime.registry.total_feeds(),
        feed_users: state.realtime.registry.unique_users(),
        feed_metrics: state.realtime.metrics.snapshot(),
        checked_at: chrono::Utc::now(),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}
