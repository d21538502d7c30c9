use chrono::SecondsFormat;
use db::models::attendance_record::Model as AttendanceRecord;
use db::token_store::RecordFilter;
use serde::{Deserialize, Serialize};

use crate::routes::common::page_params;

#[derive(Debug, Serialize)]
pub struct AttendanceRecordResponse {
    pub id: i64,
    pub token: String,
    pub student_id: String,
    pub student_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub verification_method: String,
    pub taken_at: String,
}

impl From<AttendanceRecord> for AttendanceRecordResponse {
    fn from(r: AttendanceRecord) -> Self {
        Self {
            id: r.id,
            token: r.token,
            student_id: r.student_id,
            student_name: r.student_name,
            latitude: r.latitude,
            longitude: r.longitude,
            verification_method: r.verification_method.to_string(),
            taken_at: r.taken_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// `?token=` on the mark endpoint, as carried by the scanned QR URL.
#[derive(Debug, Default, Deserialize)]
pub struct MarkQuery {
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub student_id: Option<String>,
    pub token: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> u64 {
        page_params(self.page, self.per_page).0
    }

    pub fn per_page(&self) -> u64 {
        page_params(self.page, self.per_page).1
    }

    pub fn filter(&self) -> RecordFilter {
        let clean = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        RecordFilter {
            student_id: clean(&self.student_id),
            token: clean(&self.token),
        }
    }
}

/// `?days=` for the trend view: default 7, between 1 and 90.
#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    pub days: Option<u32>,
}

impl TrendQuery {
    pub fn days(&self) -> u32 {
        self.days.unwrap_or(7).clamp(1, 90)
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub records: Vec<AttendanceRecordResponse>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}
