use db::models::attendance_token::TokenStatus;
use serde::{Deserialize, Serialize};

use crate::routes::common::page_params;
use crate::routes::tokens::TokenSummary;

#[derive(Debug, Default, Deserialize)]
pub struct SessionListQuery {
    pub status: Option<TokenStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl SessionListQuery {
    pub fn paging(&self) -> (u64, u64) {
        page_params(self.page, self.per_page)
    }
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<TokenSummary>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}
