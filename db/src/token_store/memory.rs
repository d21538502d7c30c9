use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{
    AttendanceStats, DailyCount, NewAttendance, RecordFilter, RecordPage, StoreError, TokenFilter,
    TokenPage, TokenStore, bucket_by_day, page_index, rejection, revoke_rejection, utc_day,
};
use crate::models::attendance_record::Model as AttendanceRecord;
use crate::models::attendance_token::Model as AttendanceToken;

#[derive(Default)]
struct Inner {
    tokens: HashMap<String, AttendanceToken>,
    records: Vec<AttendanceRecord>,
    next_record_id: i64,
}

/// Process-local token store.
///
/// Tokens and records sit behind one lock, so consume-and-record is a single
/// critical section.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut records: Vec<AttendanceRecord>) -> Vec<AttendanceRecord> {
    records.sort_by(|a, b| b.taken_at.cmp(&a.taken_at).then(b.id.cmp(&a.id)));
    records
}

/// `(skip, take)` for a 1-based page.
fn window(page: u64, per_page: u64) -> (usize, usize) {
    let per_page = per_page.max(1);
    let skip = page_index(page, per_page).saturating_mul(per_page);
    (
        usize::try_from(skip).unwrap_or(usize::MAX),
        usize::try_from(per_page).unwrap_or(usize::MAX),
    )
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn put(&self, token: AttendanceToken) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.tokens.contains_key(&token.token) {
            return Err(StoreError::DuplicateToken);
        }
        inner.tokens.insert(token.token.clone(), token);
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<AttendanceToken>, StoreError> {
        Ok(self.inner.lock().await.tokens.get(token).cloned())
    }

    async fn get_and_consume_if_valid(
        &self,
        token: &str,
        now: DateTime<Utc>,
        attendance: NewAttendance,
    ) -> Result<AttendanceRecord, StoreError> {
        let mut inner = self.inner.lock().await;

        let entry = match inner.tokens.get_mut(token) {
            Some(t) if !t.is_expired(now) && !t.consumed => t,
            other => return Err(rejection(other.as_deref(), now)),
        };
        let stamped = now.trunc_subsecs(0);
        entry.consumed = true;
        entry.consumed_at = Some(stamped);

        inner.next_record_id += 1;
        let record = AttendanceRecord {
            id: inner.next_record_id,
            token: token.to_owned(),
            student_id: attendance.student_id,
            student_name: attendance.student_name,
            latitude: attendance.latitude,
            longitude: attendance.longitude,
            verification_method: attendance.verification_method,
            taken_at: stamped,
        };
        inner.records.push(record.clone());
        Ok(record)
    }

    async fn records(
        &self,
        filter: &RecordFilter,
        page: u64,
        per_page: u64,
    ) -> Result<RecordPage, StoreError> {
        let all = self.all_records(filter).await?;
        let (skip, take) = window(page, per_page);

        Ok(RecordPage {
            total: all.len() as u64,
            records: all.into_iter().skip(skip).take(take).collect(),
        })
    }

    async fn all_records(&self, filter: &RecordFilter) -> Result<Vec<AttendanceRecord>, StoreError> {
        let inner = self.inner.lock().await;
        let matching = inner
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        Ok(newest_first(matching))
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<AttendanceStats, StoreError> {
        let (day_start, day_end) = utc_day(now);
        let inner = self.inner.lock().await;

        let today_attendance = inner
            .records
            .iter()
            .filter(|r| r.taken_at >= day_start && r.taken_at < day_end)
            .count();
        let unique_students: HashSet<&str> =
            inner.records.iter().map(|r| r.student_id.as_str()).collect();
        let active_tokens = inner
            .tokens
            .values()
            .filter(|t| !t.consumed && !t.is_expired(now))
            .count();

        Ok(AttendanceStats {
            total_attendance: inner.records.len() as u64,
            today_attendance: today_attendance as u64,
            unique_students: unique_students.len() as u64,
            active_tokens: active_tokens as u64,
        })
    }

    async fn daily_counts(
        &self,
        now: DateTime<Utc>,
        days: u32,
    ) -> Result<Vec<DailyCount>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(bucket_by_day(
            now,
            days,
            inner.records.iter().map(|r| r.taken_at),
        ))
    }

    async fn tokens(
        &self,
        filter: TokenFilter,
        now: DateTime<Utc>,
        page: u64,
        per_page: u64,
    ) -> Result<TokenPage, StoreError> {
        let inner = self.inner.lock().await;
        let mut matching: Vec<AttendanceToken> = inner
            .tokens
            .values()
            .filter(|t| filter.status.is_none_or(|s| t.status(now) == s))
            .cloned()
            .collect();
        drop(inner);

        matching.sort_by(|a, b| {
            b.issued_at
                .cmp(&a.issued_at)
                .then_with(|| b.token.cmp(&a.token))
        });

        let (skip, take) = window(page, per_page);
        Ok(TokenPage {
            total: matching.len() as u64,
            tokens: matching.into_iter().skip(skip).take(take).collect(),
        })
    }

    async fn revoke(&self, token: &str) -> Result<AttendanceToken, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.tokens.get(token) {
            Some(t) if !t.consumed => {}
            other => return Err(revoke_rejection(other)),
        }
        inner.tokens.remove(token).ok_or(StoreError::InvalidToken)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;
        let before = inner.tokens.len();
        inner.tokens.retain(|_, t| t.consumed || !t.is_expired(now));
        Ok((before - inner.tokens.len()) as u64)
    }
}
