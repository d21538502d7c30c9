use axum::http::StatusCode;
use chrono::Duration;
use serde_json::json as j;

use crate::helpers::{json, make_test_app, make_test_app_with_db, submission};

#[tokio::test]
async fn sessions_are_listed_newest_first_with_labels() {
    let app = make_test_app_with_db().await;

    let first = app
        .post_json("/api/tokens", &j!({ "label": "COS301 - Lecture 3" }))
        .await;
    let first = json(first).await["token"].as_str().unwrap().to_owned();
    app.clock.advance(Duration::hours(2));
    let second = app.issue().await;

    let body = json(app.get("/api/sessions").await).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["per_page"], 20);

    let sessions = body["data"]["sessions"].as_array().unwrap();
    assert_eq!(sessions[0]["token"], second);
    assert!(sessions[0]["label"].is_null());
    assert_eq!(sessions[1]["token"], first);
    assert_eq!(sessions[1]["label"], "COS301 - Lecture 3");
    assert!(sessions[1].get("qr_code").is_none());
}

#[tokio::test]
async fn sessions_filter_by_status() {
    let app = make_test_app().await;
    let used = app.issue().await;
    let fresh = app.issue().await;
    let res = app
        .post_json("/api/attendance/mark", &submission(&used, "u1"))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = json(app.get("/api/sessions?status=active").await).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["sessions"][0]["token"], fresh);

    let body = json(app.get("/api/sessions?status=consumed").await).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["sessions"][0]["token"], used);

    app.clock.advance(Duration::hours(25));
    let body = json(app.get("/api/sessions?status=expired").await).await;
    assert_eq!(body["data"]["total"], 2);

    let res = app.get("/api/sessions?status=paused").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(res).await["success"], false);
}

#[tokio::test]
async fn revoked_session_can_no_longer_be_scanned() {
    let app = make_test_app_with_db().await;
    let token = app.issue().await;

    let res = app.delete(&format!("/api/sessions/{token}")).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json(res).await;
    assert_eq!(body["message"], "Session revoked");
    assert_eq!(body["data"]["token"], token);

    let res = app
        .post_json("/api/attendance/mark", &submission(&token, "u1"))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.delete(&format!("/api/sessions/{token}")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn used_session_cannot_be_revoked() {
    let app = make_test_app().await;
    let token = app.issue().await;
    app.post_json("/api/attendance/mark", &submission(&token, "u1"))
        .await;

    let res = app.delete(&format!("/api/sessions/{token}")).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(json(res).await["message"], "Attendance token already used");

    let body = json(app.get("/api/attendance/records").await).await;
    assert_eq!(body["data"]["total"], 1);
}
