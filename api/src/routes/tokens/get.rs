use axum::{
    Json,
    extract::{Path, State},
};

use super::common::TokenStatusResponse;
use crate::error::AttendanceError;
use crate::response::ApiResponse;
use crate::state::AppState;

/// GET /api/tokens/{token}
///
/// Reports where a token is in its lifecycle and re-renders its QR code so a
/// lecturer can put it back on screen.
///
/// ### Responses
///
/// - `200 OK`
/// ```json
/// {
///   "success": true,
///   "data": {
///     "token": "0b6c1d2e-8a4f-4c55-9d1e-2f3a4b5c6d7e",
///     "label": "COS301 - Lecture 4",
///     "issued_at": "2025-05-12T08:00:00.000Z",
///     "expires_at": "2025-05-13T08:00:00.000Z",
///     "consumed": false,
///     "consumed_at": null,
///     "status": "active",
///     "qr_code": "data:image/svg+xml;base64,PD94bWwg..."
///   },
///   "message": "Token retrieved"
/// }
/// ```
///
/// - `404 Not Found` when the token was never issued (or has been purged).
/// - `500 Internal Server Error` when the store or QR rendering fails.
pub async fn get_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<TokenStatusResponse>>, AttendanceError> {
    let found = state
        .store()
        .find(&token)
        .await?
        .ok_or(AttendanceError::InvalidToken)?;

    let qr_code = state.issuer().qr_for(&found.token)?;
    let body = TokenStatusResponse::new(found, state.now(), qr_code);

    Ok(Json(ApiResponse::success(body, "Token retrieved")))
}
