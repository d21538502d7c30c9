use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, SqlErr,
    TransactionTrait,
};

use super::{
    AttendanceStats, DailyCount, NewAttendance, RecordFilter, RecordPage, StoreError, TokenFilter,
    TokenPage, TokenStore, bucket_by_day, page_index, rejection, revoke_rejection, trend_window,
    utc_day,
};
use crate::models::attendance_record::{
    self, Column as RecordCol, Entity as RecordEntity, Model as AttendanceRecord,
};
use crate::models::attendance_token::{
    Column as TokenCol, Entity as TokenEntity, Model as AttendanceToken, TokenStatus,
};

/// Token store backed by the application database.
#[derive(Clone)]
pub struct SeaOrmTokenStore {
    db: DatabaseConnection,
}

impl SeaOrmTokenStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn filtered(filter: &RecordFilter) -> Select<RecordEntity> {
    let mut cond = Condition::all();
    if let Some(student_id) = &filter.student_id {
        cond = cond.add(RecordCol::StudentId.eq(student_id.as_str()));
    }
    if let Some(token) = &filter.token {
        cond = cond.add(RecordCol::Token.eq(token.as_str()));
    }
    RecordEntity::find()
        .filter(cond)
        .order_by_desc(RecordCol::TakenAt)
        .order_by_desc(RecordCol::Id)
}

fn tokens_filtered(filter: TokenFilter, now: DateTime<Utc>) -> Select<TokenEntity> {
    let sel = match filter.status {
        None => TokenEntity::find(),
        Some(TokenStatus::Active) => TokenEntity::find()
            .filter(TokenCol::Consumed.eq(false))
            .filter(TokenCol::ExpiresAt.gte(now)),
        Some(TokenStatus::Consumed) => TokenEntity::find()
            .filter(TokenCol::Consumed.eq(true))
            .filter(TokenCol::ExpiresAt.gte(now)),
        Some(TokenStatus::Expired) => TokenEntity::find().filter(TokenCol::ExpiresAt.lt(now)),
    };
    sel.order_by_desc(TokenCol::IssuedAt)
        .order_by_desc(TokenCol::Token)
}

#[async_trait]
impl TokenStore for SeaOrmTokenStore {
    async fn put(&self, token: AttendanceToken) -> Result<(), StoreError> {
        TokenEntity::insert(token.into_active_model())
            .exec_without_returning(&self.db)
            .await
            .map_err(|err| match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::DuplicateToken,
                _ => StoreError::Unavailable(err),
            })?;
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<AttendanceToken>, StoreError> {
        Ok(TokenEntity::find_by_id(token.to_owned()).one(&self.db).await?)
    }

    async fn get_and_consume_if_valid(
        &self,
        token: &str,
        now: DateTime<Utc>,
        attendance: NewAttendance,
    ) -> Result<AttendanceRecord, StoreError> {
        let stamped = now.trunc_subsecs(0);
        let txn = self.db.begin().await?;

        // Conditional update: only a live, unconsumed token flips. Concurrent
        // callers race on this statement and at most one sees a row affected.
        let updated = TokenEntity::update_many()
            .col_expr(TokenCol::Consumed, Expr::value(true))
            .col_expr(TokenCol::ConsumedAt, Expr::value(stamped))
            .filter(TokenCol::Token.eq(token))
            .filter(TokenCol::Consumed.eq(false))
            .filter(TokenCol::ExpiresAt.gte(now))
            .exec(&txn)
            .await?;

        if updated.rows_affected == 0 {
            let existing = TokenEntity::find_by_id(token.to_owned()).one(&txn).await?;
            txn.rollback().await?;
            return Err(rejection(existing.as_ref(), now));
        }

        // Any failure from here drops `txn` uncommitted, which rolls the consume back.
        let record = attendance_record::ActiveModel {
            token: Set(token.to_owned()),
            student_id: Set(attendance.student_id),
            student_name: Set(attendance.student_name),
            latitude: Set(attendance.latitude),
            longitude: Set(attendance.longitude),
            verification_method: Set(attendance.verification_method),
            taken_at: Set(stamped),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(record)
    }

    async fn records(
        &self,
        filter: &RecordFilter,
        page: u64,
        per_page: u64,
    ) -> Result<RecordPage, StoreError> {
        let per_page = per_page.max(1);
        let paginator = filtered(filter).paginate(&self.db, per_page);
        let total = paginator.num_items().await?;
        let records = paginator.fetch_page(page_index(page, per_page)).await?;
        Ok(RecordPage { records, total })
    }

    async fn all_records(&self, filter: &RecordFilter) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(filtered(filter).all(&self.db).await?)
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<AttendanceStats, StoreError> {
        let (day_start, day_end) = utc_day(now);

        let total_attendance = RecordEntity::find().count(&self.db).await?;
        let today_attendance = RecordEntity::find()
            .filter(RecordCol::TakenAt.gte(day_start))
            .filter(RecordCol::TakenAt.lt(day_end))
            .count(&self.db)
            .await?;
        let unique_students = RecordEntity::find()
            .select_only()
            .column(RecordCol::StudentId)
            .distinct()
            .count(&self.db)
            .await?;
        let active_tokens = TokenEntity::find()
            .filter(TokenCol::Consumed.eq(false))
            .filter(TokenCol::ExpiresAt.gte(now))
            .count(&self.db)
            .await?;

        Ok(AttendanceStats {
            total_attendance,
            today_attendance,
            unique_students,
            active_tokens,
        })
    }

    async fn daily_counts(
        &self,
        now: DateTime<Utc>,
        days: u32,
    ) -> Result<Vec<DailyCount>, StoreError> {
        let (start, end) = trend_window(now, days);
        let stamps: Vec<DateTime<Utc>> = RecordEntity::find()
            .select_only()
            .column(RecordCol::TakenAt)
            .filter(RecordCol::TakenAt.gte(start))
            .filter(RecordCol::TakenAt.lt(end))
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(bucket_by_day(now, days, stamps))
    }

    async fn tokens(
        &self,
        filter: TokenFilter,
        now: DateTime<Utc>,
        page: u64,
        per_page: u64,
    ) -> Result<TokenPage, StoreError> {
        let per_page = per_page.max(1);
        let paginator = tokens_filtered(filter, now).paginate(&self.db, per_page);
        let total = paginator.num_items().await?;
        let tokens = paginator.fetch_page(page_index(page, per_page)).await?;
        Ok(TokenPage { tokens, total })
    }

    async fn revoke(&self, token: &str) -> Result<AttendanceToken, StoreError> {
        let txn = self.db.begin().await?;
        let existing = TokenEntity::find_by_id(token.to_owned()).one(&txn).await?;

        // Only an unconsumed row goes; a consume that won the race keeps it.
        let deleted = TokenEntity::delete_many()
            .filter(TokenCol::Token.eq(token))
            .filter(TokenCol::Consumed.eq(false))
            .exec(&txn)
            .await?;

        if deleted.rows_affected == 0 {
            txn.rollback().await?;
            return Err(revoke_rejection(existing.as_ref()));
        }

        txn.commit().await?;
        existing.ok_or(StoreError::InvalidToken)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let res = TokenEntity::delete_many()
            .filter(TokenCol::Consumed.eq(false))
            .filter(TokenCol::ExpiresAt.lt(now))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }
}
