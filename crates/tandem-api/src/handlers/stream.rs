//! WebSocket feed handlers.
//!
//! Each socket carries one feed. Frames are pushed as JSON text; anything
//! the client sends other than close and ping is ignored.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use tandem_core::types::UserId;
use tandem_realtime::{FeedKind, FeedSubscription};

use crate::dto::request::WsQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /ws/sessions?token={jwt}
pub async fn sessions_feed(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    upgrade(state, ws, &query.token, FeedKind::Sessions)
}

/// GET /ws/presence?token={jwt}
pub async fn presence_feed(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    upgrade(state, ws, &query.token, FeedKind::Presence)
}

fn upgrade(
    state: AppState,
    ws: WebSocketUpgrade,
    token: &str,
    kind: FeedKind,
) -> Result<Response, ApiError> {
    // Authenticate and open the feed before upgrading so failures are plain HTTP errors.
    let user_id = state.jwt_decoder.decode(token)?;
    let subscription = state.realtime.open_feed(user_id, kind)?;
    Ok(ws.on_upgrade(move |socket| pump(socket, user_id, subscription)))
}

async fn pump(socket: WebSocket, user_id: UserId, mut subscription: FeedSubscription) {
    let conn_id = subscription.id;
    let kind = subscription.kind;
    info!(conn_id = %conn_id, user_id = %user_id, kind = %kind, "Feed connection established");

    let (mut ws_tx, mut ws_rx) = socket.split();
    // The feed's sender drops when it stops for any reason, so `recv` ends the loop.
    loop {
        tokio::select! {
            biased;
            frame = subscription.recv() => {
                let Some(frame) = frame else { break };
                let text = match frame.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(conn_id = %conn_id, error = %e, "Failed to serialize frame");
                        continue;
                    }
                };
                if ws_tx.send(Message::Text(text.into())).await.is_err() {
                    debug!(conn_id = %conn_id, "Client went away");
                    break;
                }
            }
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(conn_id = %conn_id, error = %e, "WebSocket read error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    subscription.close();
    let _ = ws_tx.close().await;
    info!(conn_id = %conn_id, user_id = %user_id, kind = %kind, "Feed connection closed");
}
