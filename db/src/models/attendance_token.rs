use chrono::{DateTime, Duration, SubsecRound, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// How long an issued token stays valid. Fixed; not configurable per call.
pub const TOKEN_VALIDITY_HOURS: i64 = 24;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub token: String,
    /// Free-form lecture description, e.g. `"COS301 - Lecture 4"`.
    pub label: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub consumed_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Lifecycle state of a token as seen at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TokenStatus {
    Active,
    Consumed,
    Expired,
}

impl Model {
    /// Builds a fresh, unconsumed token issued at `issued_at`.
    ///
    /// The issue time is truncated to whole seconds so `expires_at` is exactly
    /// [`TOKEN_VALIDITY_HOURS`] later and round-trips through storage unchanged.
    pub fn issue(issued_at: DateTime<Utc>) -> Self {
        let issued_at = issued_at.trunc_subsecs(0);
        Self {
            token: Uuid::new_v4().to_string(),
            label: None,
            issued_at,
            expires_at: issued_at + Duration::hours(TOKEN_VALIDITY_HOURS),
            consumed: false,
            consumed_at: None,
        }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Expiry takes precedence over consumption.
    pub fn status(&self, now: DateTime<Utc>) -> TokenStatus {
        if self.is_expired(now) {
            TokenStatus::Expired
        } else if self.consumed {
            TokenStatus::Consumed
        } else {
            TokenStatus::Active
        }
    }
}
