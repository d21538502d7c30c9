//! Application state shared across Axum route handlers.
//!
//! Holds the token store, the time source and the token issuer. Cheap to
//! clone; handlers receive it through Axum's `State<T>` extractor.

use chrono::{DateTime, Utc};
use db::token_store::TokenStore;
use std::sync::Arc;
use util::clock::Clock;

use crate::services::token_issuer::TokenIssuer;

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    issuer: TokenIssuer,
}

impl AppState {
    pub fn new(store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>, issuer: TokenIssuer) -> Self {
        Self {
            store,
            clock,
            issuer,
        }
    }

    pub fn store(&self) -> &dyn TokenStore {
        self.store.as_ref()
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Current time according to the configured clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
