use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};

use super::common::{AttendanceRecordResponse, MarkQuery};
use crate::error::AttendanceError;
use crate::response::ApiResponse;
use crate::services::attendance_verifier::{self, MarkAttendanceReq};
use crate::state::AppState;

/// POST /api/attendance/mark
///
/// Marks attendance with a scanned token. The token may travel in the body or
/// as `?token=` (the QR URL carries it that way); the body wins when both are
/// present.
///
/// ### Request Body
/// ```json
/// {
///   "token": "0b6c1d2e-8a4f-4c55-9d1e-2f3a4b5c6d7e",
///   "student_id": "u21456789",
///   "student_name": "Thandi Mokoena",
///   "latitude": -25.7545,
///   "longitude": 28.2314,
///   "verification_method": "qr"
/// }
/// ```
///
/// ### Responses
///
/// - `200 OK` with the stored record and message `"Attendance recorded"`.
/// - `400 Bad Request` for a malformed submission or an expired token.
/// - `404 Not Found` for a token that was never issued.
/// - `409 Conflict` when the token was already used.
/// - `500 Internal Server Error` when the store is unavailable.
///
/// Failures carry `{ "success": false, "data": null, "message": <reason> }`.
pub async fn mark_attendance(
    State(state): State<AppState>,
    Query(query): Query<MarkQuery>,
    body: Result<Json<MarkAttendanceReq>, JsonRejection>,
) -> Result<Json<ApiResponse<AttendanceRecordResponse>>, AttendanceError> {
    let Json(req) = body.map_err(|rejection| {
        AttendanceError::MalformedRequest(format!(
            "Invalid request body: {}",
            rejection.body_text()
        ))
    })?;

    let record =
        attendance_verifier::mark_attendance(state.store(), state.now(), req, query.token).await?;

    Ok(Json(ApiResponse::success(
        AttendanceRecordResponse::from(record),
        "Attendance recorded",
    )))
}
