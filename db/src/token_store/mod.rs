//! Attendance token persistence.
//!
//! [`TokenStore`] is the single seam through which tokens are registered and
//! consumed. Both backings guarantee that checking a token's liveness, marking
//! it consumed and writing the attendance record happen as one atomic unit, so
//! two scanners submitting the same captured QR image can never both succeed.

mod database;
mod memory;

pub use database::SeaOrmTokenStore;
pub use memory::MemoryTokenStore;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sea_orm::DbErr;
use serde::Serialize;

use crate::models::attendance_record::{Model as AttendanceRecord, VerificationMethod};
use crate::models::attendance_token::{Model as AttendanceToken, TokenStatus};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid attendance token")]
    InvalidToken,

    #[error("Attendance token has expired")]
    TokenExpired,

    #[error("Attendance token has already been used")]
    TokenAlreadyUsed,

    #[error("Attendance token already registered")]
    DuplicateToken,

    #[error("Token store unavailable: {0}")]
    Unavailable(#[from] DbErr),
}

/// The attendance data a student submits alongside a token.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendance {
    pub student_id: String,
    pub student_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub verification_method: VerificationMethod,
}

/// Optional filters for record listings. Empty means "everything".
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub student_id: Option<String>,
    pub token: Option<String>,
}

impl RecordFilter {
    pub(crate) fn matches(&self, record: &AttendanceRecord) -> bool {
        self.student_id
            .as_deref()
            .is_none_or(|s| record.student_id == s)
            && self.token.as_deref().is_none_or(|t| record.token == t)
    }
}

/// One page of records, newest first.
#[derive(Debug, Clone)]
pub struct RecordPage {
    pub records: Vec<AttendanceRecord>,
    pub total: u64,
}

/// Optional filter for token listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenFilter {
    pub status: Option<TokenStatus>,
}

/// One page of tokens, most recently issued first.
#[derive(Debug, Clone)]
pub struct TokenPage {
    pub tokens: Vec<AttendanceToken>,
    pub total: u64,
}

/// Attendance taken on one UTC calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceStats {
    pub total_attendance: u64,
    pub today_attendance: u64,
    pub unique_students: u64,
    pub active_tokens: u64,
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Registers a freshly issued, unconsumed token.
    async fn put(&self, token: AttendanceToken) -> Result<(), StoreError>;

    async fn find(&self, token: &str) -> Result<Option<AttendanceToken>, StoreError>;

    /// Consumes `token` and records `attendance` against it, or explains why not.
    ///
    /// Failure precedence: unknown token, then expiry (so an expired token is
    /// rejected the same way whether or not it was consumed), then reuse.
    async fn get_and_consume_if_valid(
        &self,
        token: &str,
        now: DateTime<Utc>,
        attendance: NewAttendance,
    ) -> Result<AttendanceRecord, StoreError>;

    /// `page` is 1-based.
    async fn records(
        &self,
        filter: &RecordFilter,
        page: u64,
        per_page: u64,
    ) -> Result<RecordPage, StoreError>;

    async fn all_records(&self, filter: &RecordFilter) -> Result<Vec<AttendanceRecord>, StoreError>;

    async fn stats(&self, now: DateTime<Utc>) -> Result<AttendanceStats, StoreError>;

    /// Attendance per UTC day for the `days` days ending on the day of `now`,
    /// oldest first. Days without attendance are present with a zero count.
    async fn daily_counts(
        &self,
        now: DateTime<Utc>,
        days: u32,
    ) -> Result<Vec<DailyCount>, StoreError>;

    /// `page` is 1-based. Status is judged at `now`.
    async fn tokens(
        &self,
        filter: TokenFilter,
        now: DateTime<Utc>,
        page: u64,
        per_page: u64,
    ) -> Result<TokenPage, StoreError>;

    /// Withdraws a token that has not been used yet and returns it.
    ///
    /// A consumed token is kept so its attendance record stays intact.
    async fn revoke(&self, token: &str) -> Result<AttendanceToken, StoreError>;

    /// Drops tokens that expired without ever being used. Returns how many went.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Why a token that could not be consumed was rejected.
pub(crate) fn rejection(existing: Option<&AttendanceToken>, now: DateTime<Utc>) -> StoreError {
    match existing {
        None => StoreError::InvalidToken,
        Some(t) if t.is_expired(now) => StoreError::TokenExpired,
        Some(_) => StoreError::TokenAlreadyUsed,
    }
}

/// Why a token could not be revoked.
pub(crate) fn revoke_rejection(existing: Option<&AttendanceToken>) -> StoreError {
    match existing {
        None => StoreError::InvalidToken,
        Some(_) => StoreError::TokenAlreadyUsed,
    }
}

/// Zero-based page index, capped so `index * per_page` stays within `i64`.
pub(crate) fn page_index(page: u64, per_page: u64) -> u64 {
    page.saturating_sub(1).min(i64::MAX as u64 / per_page.max(1))
}

/// `[start, end)` covering the `days` UTC days that end on the day of `now`.
pub(crate) fn trend_window(now: DateTime<Utc>, days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let (today, end) = utc_day(now);
    (today - Duration::days(i64::from(days.max(1)) - 1), end)
}

/// Buckets `taken_at` stamps into per-day counts over the trend window.
pub(crate) fn bucket_by_day(
    now: DateTime<Utc>,
    days: u32,
    stamps: impl IntoIterator<Item = DateTime<Utc>>,
) -> Vec<DailyCount> {
    let (start, end) = trend_window(now, days);
    let mut counts: Vec<DailyCount> = (0..days.max(1))
        .map(|i| DailyCount {
            date: (start + Duration::days(i64::from(i))).date_naive(),
            count: 0,
        })
        .collect();

    for ts in stamps {
        if ts < start || ts >= end {
            continue;
        }
        let slot = (ts - start).num_days() as usize;
        if let Some(day) = counts.get_mut(slot) {
            day.count += 1;
        }
    }
    counts
}

/// `[start, end)` of the UTC calendar day containing `now`.
pub(crate) fn utc_day(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}
