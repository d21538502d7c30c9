use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use validator::Validate;

use super::common::IssueTokenReq;
use crate::error::{AttendanceError, SimpleError};
use crate::routes::common::format_validation_errors;
use crate::services::token_issuer::IssuedToken;
use crate::state::AppState;

/// POST /api/tokens
///
/// Issues a new single-use attendance token valid for 24 hours and returns it
/// together with a QR code pointing at the capture page.
///
/// ### Request Body (optional)
/// ```json
/// { "label": "COS301 - Lecture 4" }
/// ```
/// A request without a JSON content type is treated as having no body.
///
/// ### Responses
///
/// - `200 OK`
/// ```json
/// {
///   "qrCode": "data:image/svg+xml;base64,PD94bWwg...",
///   "token": "0b6c1d2e-8a4f-4c55-9d1e-2f3a4b5c6d7e",
///   "expiry": "2025-05-13T08:00:00.000Z",
///   "label": "COS301 - Lecture 4"
/// }
/// ```
/// `label` is omitted when none was given.
///
/// - `400 Bad Request` for an unreadable body or an over-long label
/// ```json
/// { "error": "label must be at most 128 characters" }
/// ```
///
/// - `500 Internal Server Error`
/// ```json
/// { "error": "Error generating QR code" }
/// ```
///
/// Every issuance failure is reported with the same message; the cause is logged.
pub async fn issue_token(
    State(state): State<AppState>,
    body: Result<Json<IssueTokenReq>, JsonRejection>,
) -> Result<Json<IssuedToken>, SimpleError> {
    let req = match body {
        Ok(Json(req)) => req,
        Err(JsonRejection::MissingJsonContentType(_)) => IssueTokenReq::default(),
        Err(rejection) => {
            return Err(SimpleError(AttendanceError::MalformedRequest(format!(
                "Invalid request body: {}",
                rejection.body_text()
            ))));
        }
    };
    req.validate().map_err(|errs| {
        SimpleError(AttendanceError::MalformedRequest(format_validation_errors(
            &errs,
        )))
    })?;

    state
        .issuer()
        .issue(state.store(), state.now(), req.label())
        .await
        .map(Json)
        .map_err(|err| {
            tracing::error!(error = %err, "Token issuance failed");
            SimpleError(AttendanceError::EncodingFailure)
        })
}

/// Any method other than `POST` on `/api/tokens`.
///
/// - `405 Method Not Allowed`
/// ```json
/// { "error": "Method not allowed" }
/// ```
pub async fn method_not_allowed() -> SimpleError {
    SimpleError(AttendanceError::MethodNotAllowed)
}
