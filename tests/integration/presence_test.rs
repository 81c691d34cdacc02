//! Integration tests for presence endpoints.

mod helpers;

use chrono::Duration;
use http::StatusCode;
use serde_json::json;

use helpers::TestApp;
use tandem_core::config::AppConfig;
use tandem_core::types::UserId;

#[tokio::test]
async fn test_heartbeat_is_idempotent() {
    let app = TestApp::new();
    let user = UserId::new();

    let first = app
        .request("POST", "/api/presence/heartbeat", None, Some(user))
        .await;
    let second = app
        .request("POST", "/api/presence/heartbeat", None, Some(user))
        .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.data(), second.data());

    let view = app
        .request("GET", &format!("/api/presence/{user}"), None, Some(user))
        .await;
    assert_eq!(view.data()["is_online"], true);
}

#[tokio::test]
async fn test_online_window_boundary() {
    let app = TestApp::new();
    let (viewer, user) = (UserId::new(), UserId::new());
    app.heartbeat(user).await;

    app.clock.advance(Duration::seconds(60));
    let view = app
        .request("GET", &format!("/api/presence/{user}"), None, Some(viewer))
        .await;
    assert_eq!(view.data()["is_online"], true);

    app.clock.advance(Duration::seconds(1));
    let view = app
        .request("GET", &format!("/api/presence/{user}"), None, Some(viewer))
        .await;
    assert_eq!(view.data()["is_online"], false);
    assert!(view.data()["last_seen_at"].is_string());
}

#[tokio::test]
async fn test_never_seen_user_is_offline() {
    let app = TestApp::new();
    let view = app
        .request(
            "GET",
            &format!("/api/presence/{}", UserId::new()),
            None,
            Some(UserId::new()),
        )
        .await;
    assert_eq!(view.status, StatusCode::OK);
    assert_eq!(view.data()["is_online"], false);
    assert!(view.data()["last_seen_at"].is_null());
}

#[tokio::test]
async fn test_bulk_query_keeps_request_order() {
    let app = TestApp::new();
    let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
    app.heartbeat(b).await;

    let response = app
        .request(
            "POST",
            "/api/presence/query",
            Some(json!({ "user_ids": [c, b, a] })),
            Some(a),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let views = response.data().as_array().unwrap();
    let online: Vec<bool> = views
        .iter()
        .map(|v| v["is_online"].as_bool().unwrap())
        .collect();
    assert_eq!(online, vec![false, true, false]);
    assert_eq!(views[0]["user_id"], c.to_string());

    let empty = app
        .request(
            "POST",
            "/api/presence/query",
            Some(json!({ "user_ids": [] })),
            Some(a),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_friends_presence_lists_only_friends() {
    let app = TestApp::new();
    let (me, friend, stranger) = (UserId::new(), UserId::new(), UserId::new());
    app.befriend(me, friend);
    app.heartbeat(friend).await;
    app.heartbeat(stranger).await;

    let response = app
        .request("GET", "/api/presence/friends", None, Some(me))
        .await;
    let views = response.data().as_array().unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0]["user_id"], friend.to_string());
    assert_eq!(views[0]["is_online"], true);
}

#[tokio::test]
async fn test_auto_join_can_be_disabled() {
    let mut config = AppConfig::default();
    config.session.auto_join.enabled = false;
    let app = TestApp::with_config(config);
    let (x, y) = (UserId::new(), UserId::new());
    app.befriend(x, y);
    for _ in 0..2 {
        app.heartbeat(x).await;
        app.heartbeat(y).await;
    }

    let response = app.request("GET", "/api/sessions/active", None, Some(x)).await;
    assert!(response.data()["active"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let app = TestApp::new();
    let anonymous = app
        .request("POST", "/api/presence/heartbeat", None, None)
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["success"], false);
}

#[tokio::test]
async fn test_health_reports_memory_provider() {
    let app = TestApp::new();
    let health = app.request("GET", "/api/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "ok");

    let detailed = app.request("GET", "/api/health/detailed", None, None).await;
    assert_eq!(detailed.status, StatusCode::OK);
    assert_eq!(detailed.body["store_provider"], "memory");
    assert_eq!(detailed.body["feeds_open"], 0);
}
