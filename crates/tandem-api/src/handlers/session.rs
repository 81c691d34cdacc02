//! Focus session handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use tandem_core::types::SessionId;
use tandem_entity::session::{EndOutcome, PauseResult, SessionStatusView, SessionsSnapshot};

use crate::dto::request::{
    CreateSessionRequest, EndSessionRequest, HistoryQuery, PauseRequest, validate,
};
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/sessions
pub async fn create_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionStatusView>>), ApiError> {
    validate(&req)?;
    let view = state
        .sessions
        .create_for(
            auth.user_id(),
            req.participant_ids,
            req.start_time,
            req.planned_end_time,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(view))))
}

/// GET /api/sessions/active
pub async fn active_sessions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<SessionsSnapshot>>, ApiError> {
    let snapshot = state.sessions.active_snapshot(auth.user_id()).await?;
    Ok(Json(ApiResponse::ok(snapshot)))
}

/// GET /api/sessions/history
pub async fn session_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<SessionStatusView>>>, ApiError> {
    let history = state.sessions.history(auth.user_id(), query.limit).await?;
    Ok(Json(ApiResponse::ok(history)))
}

/// GET /api/sessions/{id}
pub async fn session_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<SessionId>,
) -> Result<Json<ApiResponse<SessionStatusView>>, ApiError> {
    let view = state.sessions.status(id, auth.user_id()).await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// POST /api/sessions/{id}/pause
pub async fn set_pause(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<SessionId>,
    Json(req): Json<PauseRequest>,
) -> Result<Json<ApiResponse<PauseResult>>, ApiError> {
    let result = state
        .sessions
        .set_pause_status(id, auth.user_id(), req.is_paused)
        .await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// POST /api/sessions/{id}/end
///
/// The body is optional; an empty request ends the session now.
pub async fn end_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<SessionId>,
    body: Option<Json<EndSessionRequest>>,
) -> Result<Json<ApiResponse<EndOutcome>>, ApiError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    validate(&req)?;
    let outcome = state
        .sessions
        .end(id, auth.user_id(), req.end_time, req.minutes)
        .await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// POST /api/sessions/{id}/cancel
pub async fn cancel_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<SessionId>,
) -> Result<Json<ApiResponse<EndOutcome>>, ApiError> {
    let outcome = state.sessions.cancel(id, auth.user_id()).await?;
    Ok(Json(ApiResponse::ok(outcome)))
}
