//! Presence handlers.

use axum::Json;
use axum::extract::{Path, State};

use tandem_core::types::UserId;
use tandem_entity::presence::PresenceView;
use tandem_service::HeartbeatAck;

use crate::dto::request::{PresenceQueryRequest, validate};
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/presence/heartbeat
pub async fn heartbeat(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<HeartbeatAck>>, ApiError> {
    let ack = state.presence.heartbeat(auth.user_id()).await?;
    Ok(Json(ApiResponse::ok(ack)))
}

/// GET /api/presence/{user_id}
pub async fn get_presence(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<UserId>,
) -> Result<Json<ApiResponse<PresenceView>>, ApiError> {
    let view = state.presence.is_online(user_id).await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// POST /api/presence/query
pub async fn query_presence(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(req): Json<PresenceQueryRequest>,
) -> Result<Json<ApiResponse<Vec<PresenceView>>>, ApiError> {
    validate(&req)?;
    let views = state.presence.is_online_many(&req.user_ids).await?;
    Ok(Json(ApiResponse::ok(views)))
}

/// GET /api/presence/friends
pub async fn friends_presence(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<PresenceView>>>, ApiError> {
    let views = state.presence.friends_presence(auth.user_id()).await?;
    Ok(Json(ApiResponse::ok(views)))
}
