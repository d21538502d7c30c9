use chrono::{DateTime, SecondsFormat, Utc};
use db::models::attendance_token::{Model as AttendanceToken, TokenStatus};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Optional body of `POST /api/tokens`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct IssueTokenReq {
    #[validate(length(max = 128, message = "label must be at most 128 characters"))]
    pub label: Option<String>,
}

impl IssueTokenReq {
    /// Trimmed label, `None` when blank.
    pub fn label(self) -> Option<String> {
        self.label
            .map(|l| l.trim().to_owned())
            .filter(|l| !l.is_empty())
    }
}

fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A token as shown to administrators, without its QR rendering.
#[derive(Debug, Serialize)]
pub struct TokenSummary {
    pub token: String,
    pub label: Option<String>,
    pub issued_at: String,
    pub expires_at: String,
    pub consumed: bool,
    pub consumed_at: Option<String>,
    pub status: TokenStatus,
}

impl TokenSummary {
    pub fn new(token: AttendanceToken, now: DateTime<Utc>) -> Self {
        Self {
            status: token.status(now),
            issued_at: iso(token.issued_at),
            expires_at: iso(token.expires_at),
            consumed: token.consumed,
            consumed_at: token.consumed_at.map(iso),
            label: token.label,
            token: token.token,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenStatusResponse {
    #[serde(flatten)]
    pub summary: TokenSummary,
    pub qr_code: String,
}

impl TokenStatusResponse {
    pub fn new(token: AttendanceToken, now: DateTime<Utc>, qr_code: String) -> Self {
        Self {
            summary: TokenSummary::new(token, now),
            qr_code,
        }
    }
}
