use axum::{
    Json,
    extract::{Path, State},
};

use crate::error::AttendanceError;
use crate::response::ApiResponse;
use crate::routes::tokens::TokenSummary;
use crate::state::AppState;

/// DELETE /api/sessions/{token}
///
/// Revokes a token that has not been used yet. Scanning it afterwards fails
/// as an invalid token.
///
/// ### Responses
///
/// - `200 OK` with the revoked token and message `"Session revoked"`.
/// - `404 Not Found` when the token does not exist.
/// - `409 Conflict` when the token was already used; its attendance record is
///   kept.
pub async fn revoke_session(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<TokenSummary>>, AttendanceError> {
    let revoked = state.store().revoke(&token).await?;
    tracing::info!(%token, "Revoked attendance token");

    Ok(Json(ApiResponse::success(
        TokenSummary::new(revoked, state.now()),
        "Session revoked",
    )))
}
