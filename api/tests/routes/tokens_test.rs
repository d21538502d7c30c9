use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde_json::json as j;
use std::collections::HashSet;

use crate::helpers::{
    json, make_test_app, make_test_app_with_base_url, make_test_app_with_db, submission, t0,
};

#[tokio::test]
async fn issue_returns_qr_token_and_expiry_24h_ahead() {
    let app = make_test_app().await;

    let res = app.post_json("/api/tokens", &j!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json(res).await;

    let token = body["token"].as_str().unwrap();
    assert!(!token.is_empty());

    let expiry: DateTime<Utc> = body["expiry"].as_str().unwrap().parse().unwrap();
    assert_eq!(expiry, t0() + Duration::hours(24));
    assert_eq!(body["expiry"], "2025-05-13T08:00:00.000Z");

    let qr = body["qrCode"].as_str().unwrap();
    let svg = qr.strip_prefix("data:image/svg+xml;base64,").unwrap();
    let svg = base64::engine::general_purpose::STANDARD.decode(svg).unwrap();
    assert!(String::from_utf8(svg).unwrap().contains("<svg"));

    let stored = app.store.find(token).await.unwrap().unwrap();
    assert!(!stored.consumed);
}

#[tokio::test]
async fn issued_tokens_are_distinct() {
    let app = make_test_app().await;

    let mut seen = HashSet::new();
    for _ in 0..200 {
        assert!(seen.insert(app.issue().await));
    }
}

#[tokio::test]
async fn other_methods_are_rejected_with_exact_body() {
    let app = make_test_app().await;

    for method in ["GET", "PUT", "DELETE", "PATCH"] {
        let res = app
            .send(
                Request::builder()
                    .method(method)
                    .uri("/api/tokens")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(json(res).await, j!({ "error": "Method not allowed" }));
    }
}

#[tokio::test]
async fn issue_without_base_url_reports_qr_failure() {
    let app = make_test_app_with_base_url("").await;

    let res = app.post_json("/api/tokens", &j!({})).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(res).await, j!({ "error": "Error generating QR code" }));

    let stats = app.store.stats(t0()).await.unwrap();
    assert_eq!(stats.active_tokens, 0);
}

#[tokio::test]
async fn token_status_follows_its_lifecycle() {
    let app = make_test_app_with_db().await;
    let token = app.issue().await;
    let uri = format!("/api/tokens/{token}");

    let body = json(app.get(&uri).await).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "active");
    assert_eq!(body["data"]["consumed"], false);
    assert!(body["data"]["consumed_at"].is_null());
    assert!(
        body["data"]["qr_code"]
            .as_str()
            .unwrap()
            .starts_with("data:image/svg+xml;base64,")
    );

    app.clock.advance(Duration::minutes(1));
    let res = app
        .post_json("/api/attendance/mark", &submission(&token, "u21456789"))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = json(app.get(&uri).await).await;
    assert_eq!(body["data"]["status"], "consumed");
    assert_eq!(body["data"]["consumed_at"], "2025-05-12T08:01:00.000Z");

    app.clock.advance(Duration::hours(25));
    let body = json(app.get(&uri).await).await;
    assert_eq!(body["data"]["status"], "expired");
}

#[tokio::test]
async fn unknown_token_status_is_not_found() {
    let app = make_test_app().await;

    let res = app
        .get(&format!("/api/tokens/{}", uuid::Uuid::new_v4()))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let body = json(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid attendance token");
}

#[tokio::test]
async fn issue_accepts_a_bodyless_request() {
    let app = make_test_app().await;

    let res = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/tokens")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json(res).await;
    assert!(body.get("label").is_none());
}

#[tokio::test]
async fn label_travels_with_the_token() {
    let app = make_test_app().await;

    let res = app
        .post_json("/api/tokens", &j!({ "label": "  COS301 - Lecture 4 " }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json(res).await;
    assert_eq!(body["label"], "COS301 - Lecture 4");

    let token = body["token"].as_str().unwrap();
    let status = json(app.get(&format!("/api/tokens/{token}")).await).await;
    assert_eq!(status["data"]["label"], "COS301 - Lecture 4");
}

#[tokio::test]
async fn overlong_label_is_rejected() {
    let app = make_test_app().await;

    let res = app
        .post_json("/api/tokens", &j!({ "label": "x".repeat(129) }))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json(res).await,
        j!({ "error": "label must be at most 128 characters" })
    );

    let stats = app.store.stats(t0()).await.unwrap();
    assert_eq!(stats.active_tokens, 0);
}
