//! Attendance verification: validates a scanned submission and consumes its token.

use chrono::{DateTime, Utc};
use db::models::attendance_record::{Model as AttendanceRecord, VerificationMethod};
use db::token_store::{NewAttendance, TokenStore};
use serde::Deserialize;
use std::str::FromStr;
use validator::Validate;

use crate::error::AttendanceError;
use crate::routes::common::format_validation_errors;

/// Body of `POST /api/attendance/mark`.
///
/// Every field is optional at the wire level so that a missing field becomes a
/// structured `MalformedRequest` rather than an extractor rejection.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct MarkAttendanceReq {
    pub token: Option<String>,

    #[validate(length(max = 64, message = "student_id must be at most 64 characters"))]
    pub student_id: Option<String>,

    #[validate(length(max = 128, message = "student_name must be at most 128 characters"))]
    pub student_name: Option<String>,

    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,

    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "longitude must be between -180 and 180"
    ))]
    pub longitude: Option<f64>,

    pub verification_method: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

impl MarkAttendanceReq {
    /// Checks the submission and splits it into the token and the data to record.
    ///
    /// A token in the body wins over `query_token` (the token carried by the
    /// scanned URL).
    pub fn into_submission(
        self,
        query_token: Option<String>,
    ) -> Result<(String, NewAttendance), AttendanceError> {
        self.validate()
            .map_err(|errs| AttendanceError::MalformedRequest(format_validation_errors(&errs)))?;

        let token = non_blank(self.token).or_else(|| non_blank(query_token));
        let student_id = non_blank(self.student_id);
        let method = non_blank(self.verification_method);

        let mut missing = Vec::new();
        if token.is_none() {
            missing.push("token");
        }
        if student_id.is_none() {
            missing.push("student_id");
        }
        if self.latitude.is_none() {
            missing.push("latitude");
        }
        if self.longitude.is_none() {
            missing.push("longitude");
        }
        if method.is_none() {
            missing.push("verification_method");
        }

        let (Some(token), Some(student_id), Some(latitude), Some(longitude), Some(method)) =
            (token, student_id, self.latitude, self.longitude, method)
        else {
            return Err(AttendanceError::MalformedRequest(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        };

        let verification_method = VerificationMethod::from_str(&method).map_err(|_| {
            AttendanceError::MalformedRequest(format!(
                "Unsupported verification method '{method}'"
            ))
        })?;

        Ok((
            token,
            NewAttendance {
                student_id,
                student_name: non_blank(self.student_name),
                latitude,
                longitude,
                verification_method,
            },
        ))
    }
}

/// Validates `req` and, if it is well formed, consumes its token and records
/// the attendance in one step.
///
/// Coordinates are stored exactly as submitted; there is no check that they
/// are anywhere near the venue.
pub async fn mark_attendance(
    store: &dyn TokenStore,
    now: DateTime<Utc>,
    req: MarkAttendanceReq,
    query_token: Option<String>,
) -> Result<AttendanceRecord, AttendanceError> {
    let (token, attendance) = req.into_submission(query_token)?;
    let student_id = attendance.student_id.clone();

    match store.get_and_consume_if_valid(&token, now, attendance).await {
        Ok(record) => {
            tracing::info!(%token, %student_id, "Attendance recorded");
            Ok(record)
        }
        Err(err) => {
            let err = AttendanceError::from(err);
            if !err.is_server_fault() {
                tracing::warn!(%token, %student_id, reason = %err, "Attendance rejected");
            }
            Err(err)
        }
    }
}
