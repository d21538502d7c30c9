//! Administration of issued tokens. Each token stands for one lecture session.

use axum::{
    Router,
    routing::{delete, get},
};

use crate::state::AppState;

mod common;
mod delete;
mod get;

pub use common::{SessionListQuery, SessionListResponse};
pub use delete::revoke_session;
pub use get::list_sessions;

/// Builds the `/sessions` route group.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sessions))
        .route("/{token}", delete(revoke_session))
}
