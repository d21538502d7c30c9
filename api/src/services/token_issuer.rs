//! Attendance token issuance.

use chrono::{DateTime, SecondsFormat, Utc};
use db::models::attendance_token::Model as AttendanceToken;
use db::token_store::TokenStore;
use serde::Serialize;
use url::Url;

use super::qr;
use crate::error::AttendanceError;

/// Path the Capture Client serves for scanned QR codes.
pub const MARK_ATTENDANCE_PATH: &str = "mark-attendance";

/// Body returned by `POST /api/tokens`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub qr_code: String,
    pub token: String,
    pub expiry: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Mints tokens and renders the QR codes that carry them.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    base_url: String,
}

impl TokenIssuer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim().trim_end_matches('/').to_owned(),
        }
    }

    /// Checks that QR targets can be built at all.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("PUBLIC_BASE_URL is not set".into());
        }
        let url = Url::parse(&self.base_url)
            .map_err(|e| format!("PUBLIC_BASE_URL '{}' is not a valid URL: {e}", self.base_url))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(format!("PUBLIC_BASE_URL must be http(s), got '{other}'")),
        }
    }

    /// The URL a scanned QR code opens: `{base}/mark-attendance?token={token}`.
    pub fn target_url(&self, token: &str) -> Result<Url, AttendanceError> {
        if let Err(reason) = self.validate() {
            tracing::error!(%reason, "Refusing to build attendance QR target");
            return Err(AttendanceError::EncodingFailure);
        }

        let mut url = Url::parse(&format!("{}/{MARK_ATTENDANCE_PATH}", self.base_url))
            .map_err(|_| AttendanceError::EncodingFailure)?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }

    /// Renders the QR data URI for an already issued token.
    pub fn qr_for(&self, token: &str) -> Result<String, AttendanceError> {
        let url = self.target_url(token)?;
        qr::svg_data_uri(url.as_str()).map_err(|err| {
            tracing::error!(error = %err, "QR encoding failed");
            AttendanceError::EncodingFailure
        })
    }

    /// Mints a token valid for 24 hours from `now`, registers it, and returns
    /// it with its QR rendering. `label` names the lecture it was issued for.
    ///
    /// The token is in the store before this returns, so a client can never
    /// scan a token the verifier does not know.
    pub async fn issue(
        &self,
        store: &dyn TokenStore,
        now: DateTime<Utc>,
        label: Option<String>,
    ) -> Result<IssuedToken, AttendanceError> {
        let token = AttendanceToken::issue(now).with_label(label);
        let qr_code = self.qr_for(&token.token)?;

        let issued = IssuedToken {
            qr_code,
            token: token.token.clone(),
            expiry: token.expires_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            label: token.label.clone(),
        };
        store.put(token).await?;

        tracing::info!(token = %issued.token, expiry = %issued.expiry, "Issued attendance token");
        Ok(issued)
    }
}
