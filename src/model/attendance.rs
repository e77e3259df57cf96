use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::rules::status::{ClassifyError, classify, hours_between};

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Status {
    Present,
    Late,
    HalfDay,
    Absent,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Present => "present",
            Status::Late => "late",
            Status::HalfDay => "half-day",
            Status::Absent => "absent",
        }
    }
}

/// One user's attendance for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "_id": "0b6f3c1e-3f0a-4d7e-9a53-4c1d7d1f2a10",
    "userId": "2",
    "date": "2026-03-02",
    "checkInTime": "2026-03-02T09:12:44Z",
    "checkOutTime": "2026-03-02T17:40:02Z",
    "totalHours": 8.4550,
    "status": "present",
    "createdAt": "2026-03-02T09:12:44Z"
}))]
pub struct AttendanceRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub check_in_time: DateTime<Utc>,
    #[serde(default)]
    pub check_out_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub total_hours: f64,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

fn zero_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// The calendar day `at` falls on in the work timezone.
pub fn local_date(at: DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    at.with_timezone(offset).date_naive()
}

impl AttendanceRecord {
    /// Open a new record for `user_id`, dated by the work timezone.
    pub fn check_in(
        user_id: impl Into<String>,
        at: DateTime<Utc>,
        offset: &FixedOffset,
    ) -> Result<Self, ClassifyError> {
        let local = at.with_timezone(offset);
        let status = classify(&local, None)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            date: local.date_naive(),
            check_in_time: at,
            check_out_time: None,
            total_hours: 0.0,
            status,
            created_at: at,
        })
    }

    /// The closed copy of this record. Check-out time, hours and status change together.
    pub fn check_out(&self, at: DateTime<Utc>, offset: &FixedOffset) -> Result<Self, ClassifyError> {
        let check_in = self.check_in_time.with_timezone(offset);
        let check_out = at.with_timezone(offset);
        let status = classify(&check_in, Some(&check_out))?;

        Ok(Self {
            check_out_time: Some(at),
            total_hours: hours_between(&check_in, &check_out),
            status,
            ..self.clone()
        })
    }

    pub fn is_open(&self) -> bool {
        self.check_out_time.is_none()
    }

    /// Counts toward attendance: anything but an explicit absence.
    pub fn attended(&self) -> bool {
        self.status != Status::Absent
    }
}
