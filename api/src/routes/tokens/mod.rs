use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

mod common;
mod get;
mod post;

pub use common::{IssueTokenReq, TokenStatusResponse, TokenSummary};
pub use get::get_token;
pub use post::{issue_token, method_not_allowed};

/// Builds the `/tokens` route group.
///
/// Anything other than `POST` on the collection answers `405` with the same
/// `{ "error": ... }` body shape issuance uses.
pub fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(issue_token).fallback(method_not_allowed))
        .route("/{token}", get(get_token))
}
