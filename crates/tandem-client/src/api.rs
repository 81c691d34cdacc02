//! Transport to the Tandem server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use tandem_core::error::{AppError, ErrorKind};
use tandem_core::result::AppResult;
use tandem_core::types::SessionId;
use tandem_entity::session::{EndOutcome, PauseResult, SessionStatusView, SessionsSnapshot};

/// Session operations the client needs.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Snapshot of the caller's sessions.
    async fn active(&self) -> AppResult<SessionsSnapshot>;

    /// Authoritative status of one session.
    async fn status(&self, session_id: SessionId) -> AppResult<SessionStatusView>;

    /// Report this device's pause flag.
    async fn set_pause(&self, session_id: SessionId, is_paused: bool) -> AppResult<PauseResult>;

    /// End a session with client-tracked minutes.
    async fn end(&self, session_id: SessionId, minutes: Option<i64>) -> AppResult<EndOutcome>;

    /// Mark the caller online.
    async fn heartbeat(&self) -> AppResult<()>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

/// [`SessionApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSessionApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpSessionApi {
    /// Creates a client for the server at `base_url`, authenticating with `token`.
    pub fn new(base_url: &str, token: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> AppResult<T> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn active(&self) -> AppResult<SessionsSnapshot> {
        self.send(self.client.get(self.url("/sessions/active"))).await
    }

    async fn status(&self, session_id: SessionId) -> AppResult<SessionStatusView> {
        self.send(self.client.get(self.url(&format!("/sessions/{session_id}"))))
            .await
    }

    async fn set_pause(&self, session_id: SessionId, is_paused: bool) -> AppResult<PauseResult> {
        let body = serde_json::json!({ "is_paused": is_paused });
        self.send(
            self.client
                .post(self.url(&format!("/sessions/{session_id}/pause")))
                .json(&body),
        )
        .await
    }

    async fn end(&self, session_id: SessionId, minutes: Option<i64>) -> AppResult<EndOutcome> {
        let body = serde_json::json!({ "minutes": minutes });
        self.send(
            self.client
                .post(self.url(&format!("/sessions/{session_id}/end")))
                .json(&body),
        )
        .await
    }

    async fn heartbeat(&self) -> AppResult<()> {
        let _: serde_json::Value = self
            .send(self.client.post(self.url("/presence/heartbeat")))
            .await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> AppResult<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<Envelope<T>>()
            .await
            .map(|envelope| envelope.data)
            .map_err(|e| AppError::with_source(ErrorKind::Serialization, "Malformed response body", e));
    }

    let body = response.json::<ErrorBody>().await.ok();
    debug!(status = status.as_u16(), "Request rejected");
    let (code, message) = match body {
        Some(b) => (Some(b.error), b.message),
        None => (None, format!("Request failed with status {status}")),
    };
    Err(AppError::new(kind_for(status, code.as_deref()), message))
}

/// Error kind for a rejected response.
pub(crate) fn kind_for(status: StatusCode, code: Option<&str>) -> ErrorKind {
    match status {
        StatusCode::UNAUTHORIZED => ErrorKind::Unauthorized,
        StatusCode::FORBIDDEN => ErrorKind::Forbidden,
        StatusCode::NOT_FOUND => ErrorKind::NotFound,
        StatusCode::CONFLICT => ErrorKind::Conflict,
        StatusCode::BAD_REQUEST if code == Some("INVALID_STATE") => ErrorKind::InvalidState,
        StatusCode::BAD_REQUEST => ErrorKind::Validation,
        s if s.is_server_error() && s != StatusCode::INTERNAL_SERVER_ERROR => ErrorKind::Transient,
        _ => ErrorKind::Internal,
    }
}

fn transport_error(e: reqwest::Error) -> AppError {
    if e.is_decode() {
        AppError::with_source(ErrorKind::Serialization, "Malformed response body", e)
    } else {
        AppError::with_source(ErrorKind::Transient, "Server unreachable", e)
    }
}
