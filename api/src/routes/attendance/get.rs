use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, header},
};
use chrono::SecondsFormat;
use db::models::attendance_record::Model as AttendanceRecord;
use db::token_store::{AttendanceStats, DailyCount};

use super::common::{AttendanceRecordResponse, ListQuery, ListResponse, TrendQuery};
use crate::error::AttendanceError;
use crate::response::ApiResponse;
use crate::state::AppState;

/// GET /api/attendance/records
///
/// Lists attendance records, newest first.
///
/// **Query**:
/// - `student_id` *(optional)*: only this student's records
/// - `token` *(optional)*: only the record taken with this token
/// - `page` *(default 1)*
/// - `per_page` *(default 20, max 100)*
pub async fn list_records(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiResponse<ListResponse>>, AttendanceError> {
    let (page, per_page) = (q.page(), q.per_page());
    let found = state.store().records(&q.filter(), page, per_page).await?;

    let resp = ListResponse {
        records: found
            .records
            .into_iter()
            .map(AttendanceRecordResponse::from)
            .collect(),
        page,
        per_page,
        total: found.total,
    };

    Ok(Json(ApiResponse::success(resp, "Attendance records retrieved")))
}

fn esc(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub(crate) fn records_to_csv(records: &[AttendanceRecord]) -> String {
    let mut csv = String::from(
        "id,token,student_id,student_name,latitude,longitude,verification_method,taken_at\n",
    );

    for r in records {
        let row = format!(
            "{},{},{},{},{},{},{},{}\n",
            r.id,
            esc(&r.token),
            esc(&r.student_id),
            esc(r.student_name.as_deref().unwrap_or("")),
            r.latitude,
            r.longitude,
            r.verification_method,
            r.taken_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        csv.push_str(&row);
    }
    csv
}

/// GET /api/attendance/records/export
///
/// Same filters as the listing, without paging.
///
/// **Response**: `text/csv` attachment with columns
/// `id,token,student_id,student_name,latitude,longitude,verification_method,taken_at`
pub async fn export_records_csv(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<(HeaderMap, String), AttendanceError> {
    let filter = q.filter();
    let records = state.store().all_records(&filter).await?;
    let csv = records_to_csv(&records);

    let filename = match &filter.token {
        Some(token) => format!("attendance_{token}.csv"),
        None => "attendance_records.csv".to_string(),
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
            .unwrap_or(HeaderValue::from_static("attachment")),
    );

    Ok((headers, csv))
}

/// GET /api/attendance/stats
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "total_attendance": 128,
///     "today_attendance": 42,
///     "unique_students": 57,
///     "active_tokens": 3
///   },
///   "message": "Attendance statistics retrieved"
/// }
/// ```
///
/// "Today" is the current UTC calendar day.
pub async fn attendance_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<AttendanceStats>>, AttendanceError> {
    let stats = state.store().stats(state.now()).await?;
    Ok(Json(ApiResponse::success(
        stats,
        "Attendance statistics retrieved",
    )))
}

/// GET /api/attendance/trends
///
/// Attendance per UTC day, oldest first, ending today. Days without any
/// attendance are included with a zero count.
///
/// **Query**:
/// - `days` *(default 7, between 1 and 90)*
///
/// ```json
/// {
///   "success": true,
///   "data": [
///     { "date": "2025-05-11", "count": 0 },
///     { "date": "2025-05-12", "count": 42 }
///   ],
///   "message": "Attendance trends retrieved"
/// }
/// ```
pub async fn attendance_trends(
    State(state): State<AppState>,
    Query(q): Query<TrendQuery>,
) -> Result<Json<ApiResponse<Vec<DailyCount>>>, AttendanceError> {
    let trend = state.store().daily_counts(state.now(), q.days()).await?;
    Ok(Json(ApiResponse::success(
        trend,
        "Attendance trends retrieved",
    )))
}
