//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → liveness probe
//! - `/tokens` → attendance token issuance and lookup
//! - `/sessions` → administering issued tokens
//! - `/attendance` → marking attendance and attendance reports

use axum::Router;

use crate::routes::{
    attendance::attendance_routes, health::health_routes, sessions::session_routes,
    tokens::token_routes,
};
use crate::state::AppState;

pub mod attendance;
pub mod common;
pub mod health;
pub mod sessions;
pub mod tokens;

/// Builds the complete `/api` router with its state attached.
///
/// # Route Structure:
/// - `GET  /health`
/// - `POST /tokens`, `GET /tokens/{token}`
/// - `GET  /sessions`, `DELETE /sessions/{token}`
/// - `POST /attendance/mark`
/// - `GET  /attendance/records`, `GET /attendance/records/export`
/// - `GET  /attendance/stats`, `GET /attendance/trends`
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest("/tokens", token_routes())
        .nest("/sessions", session_routes())
        .nest("/attendance", attendance_routes())
        .with_state(app_state)
}
