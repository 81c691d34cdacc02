//! Integration tests for session coordination over HTTP.

mod helpers;

use chrono::Duration;
use http::StatusCode;
use serde_json::{Value, json};

use helpers::{TestApp, ordered_pair};
use tandem_core::types::UserId;

/// Heartbeat both users twice so whichever order the IDs fall in, the
/// lower one sees the other online.
async fn pair_online(app: &TestApp, x: UserId, y: UserId) -> String {
    app.befriend(x, y);
    for _ in 0..2 {
        app.heartbeat(x).await;
        app.heartbeat(y).await;
    }

    let response = app.request("GET", "/api/sessions/active", None, Some(x)).await;
    assert_eq!(response.status, StatusCode::OK);
    let active = response.data()["active"].as_array().unwrap().clone();
    assert_eq!(active.len(), 1, "expected one shared session: {active:?}");
    active[0]["session"]["id"].as_str().unwrap().to_string()
}

async fn status(app: &TestApp, id: &str, user: UserId) -> Value {
    let response = app
        .request("GET", &format!("/api/sessions/{id}"), None, Some(user))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    response.data().clone()
}

async fn pause(app: &TestApp, id: &str, user: UserId, paused: bool) -> Value {
    let response = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/pause"),
            Some(json!({ "is_paused": paused })),
            Some(user),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    response.data().clone()
}

#[tokio::test]
async fn test_friends_online_together_get_one_session() {
    let app = TestApp::new();
    let (x, y) = (UserId::new(), UserId::new());
    let id = pair_online(&app, x, y).await;

    let view = status(&app, &id, y).await;
    assert_eq!(view["status"], "active");
    assert_eq!(view["session"]["origin"], "auto_join");
    assert_eq!(view["aggregate_paused"], false);
    let participants = view["participants"].as_array().unwrap();
    assert_eq!(participants.len(), 2);
    assert!(participants.iter().all(|p| p["is_paused"] == false));

    // Further heartbeats never add a second session.
    app.heartbeat(x).await;
    app.heartbeat(y).await;
    let response = app.request("GET", "/api/sessions/active", None, Some(y)).await;
    assert_eq!(response.data()["active"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_aggregate_pause_holds_until_everyone_resumes() {
    let app = TestApp::new();
    let (x, y) = (UserId::new(), UserId::new());
    let id = pair_online(&app, x, y).await;

    let result = pause(&app, &id, x, true).await;
    assert_eq!(result["aggregate_paused"], true);
    assert_eq!(status(&app, &id, x).await["aggregate_paused"], true);
    assert_eq!(status(&app, &id, y).await["aggregate_paused"], true);

    app.clock.advance(Duration::seconds(1));
    pause(&app, &id, y, true).await;
    app.clock.advance(Duration::seconds(1));
    let result = pause(&app, &id, x, false).await;
    assert_eq!(result["aggregate_paused"], true);

    app.clock.advance(Duration::seconds(1));
    let result = pause(&app, &id, y, false).await;
    assert_eq!(result["aggregate_paused"], false);
    assert_eq!(status(&app, &id, x).await["aggregate_paused"], false);
}

#[tokio::test]
async fn test_end_without_minutes_records_elapsed_for_everyone() {
    let app = TestApp::new();
    let (x, y) = (UserId::new(), UserId::new());
    let id = pair_online(&app, x, y).await;

    app.clock.advance(Duration::minutes(25));
    let response = app
        .request("POST", &format!("/api/sessions/{id}/end"), None, Some(y))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.data()["already_ended"], false);
    assert_eq!(response.data()["session"]["status"], "completed");
    assert_eq!(response.data()["session"]["minutes"], 25);

    let view = status(&app, &id, x).await;
    assert_eq!(view["status"], "completed");
    assert_eq!(view["session"]["minutes"], 25);
    assert!(view["session"]["end_time"].is_string());

    // Ending again changes nothing.
    let again = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/end"),
            Some(json!({ "minutes": 3 })),
            Some(x),
        )
        .await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.data()["already_ended"], true);
    assert_eq!(again.data()["session"]["minutes"], 25);

    // Pausing a finished session is rejected.
    let late = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/pause"),
            Some(json!({ "is_paused": true })),
            Some(x),
        )
        .await;
    assert_eq!(late.status, StatusCode::BAD_REQUEST);
    assert_eq!(late.body["error"], "INVALID_STATE");
}

#[tokio::test]
async fn test_client_minutes_are_authoritative() {
    let app = TestApp::new();
    let (x, y) = (UserId::new(), UserId::new());
    let id = pair_online(&app, x, y).await;

    app.clock.advance(Duration::minutes(40));
    let response = app
        .request(
            "POST",
            &format!("/api/sessions/{id}/end"),
            Some(json!({ "minutes": 31 })),
            Some(x),
        )
        .await;
    assert_eq!(response.data()["session"]["minutes"], 31);

    let negative = app
        .request(
            "POST",
            &format!("/api/sessions/{}/end", uuid::Uuid::new_v4()),
            Some(json!({ "minutes": -1 })),
            Some(x),
        )
        .await;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_manual_create_and_fence() {
    let app = TestApp::new();
    let (x, y) = ordered_pair();

    let created = app
        .request(
            "POST",
            "/api/sessions",
            Some(json!({ "participant_ids": [x, y] })),
            Some(x),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    assert_eq!(created.data()["session"]["origin"], "manual");

    let duplicate = app
        .request(
            "POST",
            "/api/sessions",
            Some(json!({ "participant_ids": [y, x] })),
            Some(y),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    // Friends coming online do not add a second session either.
    app.befriend(x, y);
    app.heartbeat(y).await;
    app.heartbeat(x).await;
    let response = app.request("GET", "/api/sessions/active", None, Some(x)).await;
    assert_eq!(response.data()["active"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_rejects_bad_participants() {
    let app = TestApp::new();
    let (x, y, z) = (UserId::new(), UserId::new(), UserId::new());

    let without_caller = app
        .request(
            "POST",
            "/api/sessions",
            Some(json!({ "participant_ids": [y, z] })),
            Some(x),
        )
        .await;
    assert_eq!(without_caller.status, StatusCode::BAD_REQUEST);

    let empty = app
        .request(
            "POST",
            "/api/sessions",
            Some(json!({ "participant_ids": [] })),
            Some(x),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_access_errors_are_distinct() {
    let app = TestApp::new();
    let (x, y) = (UserId::new(), UserId::new());
    let id = pair_online(&app, x, y).await;
    let stranger = UserId::new();

    let missing = app
        .request(
            "GET",
            &format!("/api/sessions/{}", uuid::Uuid::new_v4()),
            None,
            Some(x),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let forbidden = app
        .request("GET", &format!("/api/sessions/{id}"), None, Some(stranger))
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let forbidden_end = app
        .request("POST", &format!("/api/sessions/{id}/end"), None, Some(stranger))
        .await;
    assert_eq!(forbidden_end.status, StatusCode::FORBIDDEN);

    let anonymous = app
        .request("GET", &format!("/api/sessions/{id}"), None, None)
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cancel_then_history() {
    let app = TestApp::new();
    let (x, y) = (UserId::new(), UserId::new());
    let id = pair_online(&app, x, y).await;

    let cancelled = app
        .request("POST", &format!("/api/sessions/{id}/cancel"), None, Some(x))
        .await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(cancelled.data()["session"]["status"], "cancelled");

    // Recently ended sessions stay in the snapshot for the retention window.
    let snapshot = app.request("GET", "/api/sessions/active", None, Some(y)).await;
    assert_eq!(snapshot.data()["active"].as_array().unwrap().len(), 0);
    assert_eq!(snapshot.data()["recently_ended"].as_array().unwrap().len(), 1);

    app.clock.advance(Duration::seconds(61));
    let snapshot = app.request("GET", "/api/sessions/active", None, Some(y)).await;
    assert_eq!(snapshot.data()["recently_ended"].as_array().unwrap().len(), 0);

    let history = app
        .request("GET", "/api/sessions/history?limit=5", None, Some(y))
        .await;
    assert_eq!(history.status, StatusCode::OK);
    let entries = history.data().as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["session"]["id"], id.as_str());
}
