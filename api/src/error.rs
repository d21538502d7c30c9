//! Request-boundary error type.
//!
//! Every failure in the token and attendance flows ends up here and is turned
//! into a structured JSON body; nothing propagates far enough to take the
//! process down. Only [`AttendanceError::StoreUnavailable`] and
//! [`AttendanceError::EncodingFailure`] are reported as server faults.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::token_store::StoreError;
use serde::Serialize;

use crate::response::ApiResponse;

#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Error generating QR code")]
    EncodingFailure,

    #[error("Invalid attendance token")]
    InvalidToken,

    #[error("Attendance token expired")]
    TokenExpired,

    #[error("Attendance token already used")]
    TokenAlreadyUsed,

    #[error("Attendance service unavailable, please try again")]
    StoreUnavailable,

    #[error("{0}")]
    MalformedRequest(String),
}

impl AttendanceError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::EncodingFailure | Self::StoreUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidToken => StatusCode::NOT_FOUND,
            Self::TokenAlreadyUsed => StatusCode::CONFLICT,
            Self::TokenExpired | Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Whether the fault lies with the server rather than the caller.
    pub fn is_server_fault(&self) -> bool {
        self.status().is_server_error()
    }
}

impl From<StoreError> for AttendanceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidToken => Self::InvalidToken,
            StoreError::TokenExpired => Self::TokenExpired,
            StoreError::TokenAlreadyUsed => Self::TokenAlreadyUsed,
            StoreError::DuplicateToken => {
                tracing::error!("Freshly generated token collided with an existing one");
                Self::StoreUnavailable
            }
            StoreError::Unavailable(db_err) => {
                tracing::error!(error = %db_err, "Token store failure");
                Self::StoreUnavailable
            }
        }
    }
}

/// `{ "success": false, "data": null, "message": ... }`
impl IntoResponse for AttendanceError {
    fn into_response(self) -> Response {
        (self.status(), Json(ApiResponse::<()>::error(self.to_string()))).into_response()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Renders an error as the bare `{ "error": ... }` body used by the token
/// issuance endpoint.
pub struct SimpleError(pub AttendanceError);

impl IntoResponse for SimpleError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (self.0.status(), Json(body)).into_response()
    }
}

impl From<AttendanceError> for SimpleError {
    fn from(err: AttendanceError) -> Self {
        Self(err)
    }
}
