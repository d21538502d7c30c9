use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

mod common;
mod get;
mod post;

pub use common::{AttendanceRecordResponse, ListQuery, ListResponse, TrendQuery};
pub use get::{attendance_stats, attendance_trends, export_records_csv, list_records};
pub use post::mark_attendance;

/// Builds the `/attendance` route group.
///
/// - `POST /mark` is what the capture page calls after a scan.
/// - `GET /records`, `GET /records/export`, `GET /stats` and `GET /trends` are
///   reporting views.
pub fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route("/mark", post(mark_attendance))
        .route("/records", get(list_records))
        .route("/records/export", get(export_records_csv))
        .route("/stats", get(attendance_stats))
        .route("/trends", get(attendance_trends))
}
