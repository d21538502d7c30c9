use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Duration;
use serde_json::{Value, json as j};

use crate::helpers::{TestApp, json, make_test_app, make_test_app_with_db, submission, text};

const MARK: &str = "/api/attendance/mark";

async fn assert_rejected(app: &TestApp, body: &Value, status: StatusCode, message: &str) {
    let res = app.post_json(MARK, body).await;
    assert_eq!(res.status(), status);
    let body = json(res).await;
    assert_eq!(body["success"], false);
    assert!(body["data"].is_null());
    assert_eq!(body["message"], message);
}

async fn single_use_lifecycle(app: TestApp) {
    let token = app.issue().await;

    app.clock.advance(Duration::minutes(1));
    let res = app.post_json(MARK, &submission(&token, "u21456789")).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Attendance recorded");
    assert_eq!(body["data"]["token"], token);
    assert_eq!(body["data"]["student_id"], "u21456789");
    assert_eq!(body["data"]["verification_method"], "qr");
    assert_eq!(body["data"]["taken_at"], "2025-05-12T08:01:00Z");

    app.clock.advance(Duration::minutes(1));
    assert_rejected(
        &app,
        &submission(&token, "u21456789"),
        StatusCode::CONFLICT,
        "Attendance token already used",
    )
    .await;

    app.clock.advance(Duration::hours(25));
    assert_rejected(
        &app,
        &submission(&token, "u21456789"),
        StatusCode::BAD_REQUEST,
        "Attendance token expired",
    )
    .await;
}

#[tokio::test]
async fn single_use_lifecycle_in_memory() {
    single_use_lifecycle(make_test_app().await).await;
}

#[tokio::test]
async fn single_use_lifecycle_in_database() {
    single_use_lifecycle(make_test_app_with_db().await).await;
}

#[tokio::test]
async fn unused_token_expires_after_24_hours() {
    let app = make_test_app().await;
    let token = app.issue().await;

    app.clock.advance(Duration::hours(24));
    let res = app.post_json(MARK, &submission(&token, "u1")).await;
    assert_eq!(res.status(), StatusCode::OK);

    let late = app.issue().await;
    app.clock.advance(Duration::hours(24) + Duration::seconds(1));
    assert_rejected(
        &app,
        &submission(&late, "u2"),
        StatusCode::BAD_REQUEST,
        "Attendance token expired",
    )
    .await;
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let app = make_test_app().await;
    assert_rejected(
        &app,
        &submission(&uuid::Uuid::new_v4().to_string(), "u1"),
        StatusCode::NOT_FOUND,
        "Invalid attendance token",
    )
    .await;
}

#[tokio::test]
async fn token_can_come_from_the_query_string() {
    let app = make_test_app().await;
    let token = app.issue().await;

    let mut body = submission(&token, "u1");
    body.as_object_mut().unwrap().remove("token");

    let res = app
        .post_json(&format!("{MARK}?token={token}"), &body)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json(res).await["data"]["token"], token);
}

#[tokio::test]
async fn body_token_wins_over_query_token() {
    let app = make_test_app().await;
    let token = app.issue().await;

    let res = app
        .post_json(
            &format!("{MARK}?token=not-the-real-one"),
            &submission(&token, "u1"),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_submissions_never_touch_the_token() {
    let app = make_test_app().await;
    let token = app.issue().await;

    assert_rejected(
        &app,
        &j!({ "token": token }),
        StatusCode::BAD_REQUEST,
        "Missing required fields: student_id, latitude, longitude, verification_method",
    )
    .await;

    let mut far_north = submission(&token, "u1");
    far_north["latitude"] = j!(123.0);
    assert_rejected(
        &app,
        &far_north,
        StatusCode::BAD_REQUEST,
        "latitude must be between -90 and 90",
    )
    .await;

    let mut by_email = submission(&token, "u1");
    by_email["verification_method"] = j!("email");
    assert_rejected(
        &app,
        &by_email,
        StatusCode::BAD_REQUEST,
        "Unsupported verification method 'email'",
    )
    .await;

    let res = app
        .send(
            Request::builder()
                .method("POST")
                .uri(MARK)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{ not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = json(res).await;
    assert_eq!(body["success"], false);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request body")
    );

    let stored = app.store.find(&token).await.unwrap().unwrap();
    assert!(!stored.consumed);
}

async fn concurrent_scans_yield_one_record(app: TestApp) {
    let token = app.issue().await;

    let first = submission(&token, "u1");
    let second = submission(&token, "u2");
    let (a, b) = tokio::join!(app.post_json(MARK, &first), app.post_json(MARK, &second));

    let mut statuses = [a.status(), b.status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);

    let body = json(app.get("/api/attendance/records").await).await;
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scans_in_memory() {
    concurrent_scans_yield_one_record(make_test_app().await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scans_in_database() {
    concurrent_scans_yield_one_record(make_test_app_with_db().await).await;
}

async fn mark(app: &TestApp, student_id: &str) -> String {
    let token = app.issue().await;
    let res = app.post_json(MARK, &submission(&token, student_id)).await;
    assert_eq!(res.status(), StatusCode::OK);
    token
}

#[tokio::test]
async fn records_are_listed_newest_first_and_filtered() {
    let app = make_test_app_with_db().await;
    for student in ["u1", "u2", "u1"] {
        mark(&app, student).await;
        app.clock.advance(Duration::minutes(5));
    }

    let body = json(app.get("/api/attendance/records?per_page=2").await).await;
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["per_page"], 2);
    let records = body["data"]["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["taken_at"], "2025-05-12T08:10:00Z");

    let body = json(app.get("/api/attendance/records?student_id=u2").await).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["records"][0]["student_id"], "u2");
}

#[tokio::test]
async fn export_is_a_csv_attachment() {
    let app = make_test_app().await;
    mark(&app, "u1").await;
    let token = mark(&app, "u2").await;

    let res = app.get("/api/attendance/records/export").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        res.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"attendance_records.csv\""
    );
    let csv = text(res).await;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "id,token,student_id,student_name,latitude,longitude,verification_method,taken_at"
    );
    assert_eq!(lines.len(), 3);

    let res = app
        .get(&format!("/api/attendance/records/export?token={token}"))
        .await;
    assert_eq!(
        res.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"attendance_{token}.csv\"").as_str()
    );
    let csv = text(res).await;
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.contains(",u2,"));
}

#[tokio::test]
async fn stats_summarise_the_day() {
    let app = make_test_app().await;
    mark(&app, "u1").await;
    mark(&app, "u1").await;
    mark(&app, "u2").await;
    app.issue().await;

    let body = json(app.get("/api/attendance/stats").await).await;
    assert_eq!(body["success"], true);
    assert_eq!(
        body["data"],
        j!({
            "total_attendance": 3,
            "today_attendance": 3,
            "unique_students": 2,
            "active_tokens": 1
        })
    );

    app.clock.advance(Duration::days(1));
    let body = json(app.get("/api/attendance/stats").await).await;
    assert_eq!(body["data"]["today_attendance"], 0);
    assert_eq!(body["data"]["total_attendance"], 3);
}

#[tokio::test]
async fn far_record_pages_are_empty_not_errors() {
    let app = make_test_app_with_db().await;
    mark(&app, "u1").await;

    for page in ["18446744073709551615", "922337203685477581"] {
        let res = app
            .get(&format!("/api/attendance/records?page={page}"))
            .await;
        assert_eq!(res.status(), StatusCode::OK, "page {page}");
        let body = json(res).await;
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["records"], j!([]));
    }
}

#[tokio::test]
async fn trends_list_each_day_oldest_first() {
    let app = make_test_app_with_db().await;
    mark(&app, "u1").await;
    app.clock.advance(Duration::days(1));
    mark(&app, "u2").await;
    mark(&app, "u3").await;

    let body = json(app.get("/api/attendance/trends?days=3").await).await;
    assert_eq!(body["success"], true);
    assert_eq!(
        body["data"],
        j!([
            { "date": "2025-05-11", "count": 0 },
            { "date": "2025-05-12", "count": 1 },
            { "date": "2025-05-13", "count": 2 }
        ])
    );

    let body = json(app.get("/api/attendance/trends").await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 7);
}
