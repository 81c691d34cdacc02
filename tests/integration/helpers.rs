//! Shared test helpers for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use chrono::Utc;
use http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use tandem_api::{AppState, build_app};
use tandem_auth::JwtEncoder;
use tandem_core::clock::ManualClock;
use tandem_core::config::AppConfig;
use tandem_core::types::UserId;
use tandem_database::StoreBackend;
use tandem_database::memory::MemoryFriendGraph;

/// Test application over the in-memory stores and a manual clock.
pub struct TestApp {
    /// The Axum router for making test requests.
    pub router: Router,
    /// Wired services.
    pub state: AppState,
    /// Clock every service reads.
    pub clock: Arc<ManualClock>,
    /// Friend graph, mutable during the test.
    pub friends: MemoryFriendGraph,
    encoder: JwtEncoder,
}

impl TestApp {
    /// Create a test application with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a test application with the given configuration.
    pub fn with_config(config: AppConfig) -> Self {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let friends = MemoryFriendGraph::new();
        let stores = StoreBackend::memory(friends.clone());
        let encoder = JwtEncoder::new(&config.auth);
        let state = AppState::new(config, stores, clock.clone());
        let router = build_app(state.clone());
        Self {
            router,
            state,
            clock,
            friends,
            encoder,
        }
    }

    /// Bearer token for `user_id`.
    pub fn token(&self, user_id: UserId) -> String {
        self.encoder.issue(user_id).expect("Failed to issue token")
    }

    /// Make `a` and `b` friends.
    pub fn befriend(&self, a: UserId, b: UserId) {
        self.friends.befriend(a, b);
    }

    /// Send a request as `user`, or anonymously.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        user: Option<UserId>,
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);

        if let Some(user) = user {
            req = req.header("Authorization", format!("Bearer {}", self.token(user)));
        }

        let req = match body {
            Some(body) => req
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::to_string(&body).expect("Failed to serialize body"),
                )),
            None => req.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Heartbeat as `user`, asserting success.
    pub async fn heartbeat(&self, user: UserId) {
        let response = self
            .request("POST", "/api/presence/heartbeat", None, Some(user))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    }
}

/// Response from a test request.
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Parsed JSON body.
    pub body: Value,
}

impl TestResponse {
    /// The `data` field of a success envelope.
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

/// Two fresh users ordered so the first has the lower ID.
pub fn ordered_pair() -> (UserId, UserId) {
    let (a, b) = (UserId::new(), UserId::new());
    if a < b { (a, b) } else { (b, a) }
}
