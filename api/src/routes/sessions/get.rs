use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use db::token_store::TokenFilter;

use super::common::{SessionListQuery, SessionListResponse};
use crate::error::AttendanceError;
use crate::response::ApiResponse;
use crate::routes::tokens::TokenSummary;
use crate::state::AppState;

/// GET /api/sessions
///
/// Lists issued tokens, most recently issued first.
///
/// **Query**:
/// - `status` *(optional)*: `active` | `consumed` | `expired`
/// - `page` *(default 1)*
/// - `per_page` *(default 20, max 100)*
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "sessions": [
///       {
///         "token": "0b6c1d2e-8a4f-4c55-9d1e-2f3a4b5c6d7e",
///         "label": "COS301 - Lecture 4",
///         "issued_at": "2025-05-12T08:00:00.000Z",
///         "expires_at": "2025-05-13T08:00:00.000Z",
///         "consumed": false,
///         "consumed_at": null,
///         "status": "active"
///       }
///     ],
///     "page": 1,
///     "per_page": 20,
///     "total": 1
///   },
///   "message": "Sessions retrieved"
/// }
/// ```
///
/// An unknown `status` is a `400 Bad Request`.
pub async fn list_sessions(
    State(state): State<AppState>,
    query: Result<Query<SessionListQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<SessionListResponse>>, AttendanceError> {
    let Query(q) = query.map_err(|rejection| {
        AttendanceError::MalformedRequest(format!("Invalid query: {}", rejection.body_text()))
    })?;
    let (page, per_page) = q.paging();
    let now = state.now();

    let found = state
        .store()
        .tokens(TokenFilter { status: q.status }, now, page, per_page)
        .await?;

    let resp = SessionListResponse {
        sessions: found
            .tokens
            .into_iter()
            .map(|t| TokenSummary::new(t, now))
            .collect(),
        page,
        per_page,
        total: found.total,
    };

    Ok(Json(ApiResponse::success(resp, "Sessions retrieved")))
}
