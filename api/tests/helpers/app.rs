use api::{routes::routes, services::token_issuer::TokenIssuer, state::AppState};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode},
};
use chrono::{DateTime, TimeZone, Utc};
use db::{
    test_utils::setup_test_db,
    token_store::{MemoryTokenStore, SeaOrmTokenStore, TokenStore},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use util::clock::ManualClock;

pub const BASE_URL: &str = "https://attend.example.edu";

pub struct TestApp {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub store: Arc<dyn TokenStore>,
}

/// 2025-05-12 08:00:00 UTC, a Monday morning lecture.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 12, 8, 0, 0).unwrap()
}

fn build(store: Arc<dyn TokenStore>, base_url: &str) -> TestApp {
    let clock = Arc::new(ManualClock::new(t0()));
    let state = AppState::new(store.clone(), clock.clone(), TokenIssuer::new(base_url));

    TestApp {
        router: Router::new().nest("/api", routes(state)),
        clock,
        store,
    }
}

/// App over the in-memory store with the clock parked at [`t0`].
pub async fn make_test_app() -> TestApp {
    build(Arc::new(MemoryTokenStore::new()), BASE_URL)
}

/// App over a fresh in-memory SQLite database.
pub async fn make_test_app_with_db() -> TestApp {
    build(
        Arc::new(SeaOrmTokenStore::new(setup_test_db().await)),
        BASE_URL,
    )
}

pub async fn make_test_app_with_base_url(base_url: &str) -> TestApp {
    build(Arc::new(MemoryTokenStore::new()), base_url)
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Issues a token through the API and returns its value.
    pub async fn issue(&self) -> String {
        let res = self.post_json("/api/tokens", &serde_json::json!({})).await;
        assert_eq!(res.status(), StatusCode::OK);
        json(res).await["token"].as_str().unwrap().to_owned()
    }
}

pub async fn json(res: Response<Body>) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn text(res: Response<Body>) -> String {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A complete, valid mark-attendance body.
pub fn submission(token: &str, student_id: &str) -> Value {
    serde_json::json!({
        "token": token,
        "student_id": student_id,
        "student_name": "Thandi Mokoena",
        "latitude": -25.7545,
        "longitude": 28.2314,
        "verification_method": "qr"
    })
}
