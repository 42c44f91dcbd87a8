use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AbsenceType {
    Vacation,
    SickLeave,
    Personal,
    Unpaid,
    Other,
}

impl AbsenceType {
    /// Only vacation draws from the yearly vacation balance.
    pub fn uses_vacation_balance(&self) -> bool {
        matches!(self, AbsenceType::Vacation)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AbsenceStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, sqlx::FromRow)]
pub struct AbsenceRow {
    pub id: u64,
    pub employee_id: u64,
    pub absence_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub half_day_start: bool,
    pub half_day_end: bool,
    pub status: String,
    pub days: f64,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "absence_type": "vacation",
    "start_date": "2026-03-02",
    "end_date": "2026-03-06",
    "half_day_start": false,
    "half_day_end": true,
    "status": "pending",
    "days": 4.5,
    "reason": "Family trip",
    "created_at": "2026-02-01T09:00:00Z"
}))]
pub struct Absence {
    pub id: u64,
    pub employee_id: u64,
    pub absence_type: AbsenceType,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub half_day_start: bool,
    pub half_day_end: bool,
    pub status: AbsenceStatus,
    pub days: f64,
    pub reason: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl Absence {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Fraction of `date` taken off: 0.5 on a half-day edge, else 1.
    pub fn portion_on(&self, date: NaiveDate) -> f64 {
        if !self.covers(date) {
            return 0.0;
        }
        let half = (date == self.start_date && self.half_day_start)
            || (date == self.end_date && self.half_day_end);
        if half { 0.5 } else { 1.0 }
    }
}

impl TryFrom<AbsenceRow> for Absence {
    type Error = strum::ParseError;

    fn try_from(row: AbsenceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            employee_id: row.employee_id,
            absence_type: row.absence_type.parse()?,
            start_date: row.start_date,
            end_date: row.end_date,
            half_day_start: row.half_day_start,
            half_day_end: row.half_day_end,
            status: row.status.parse()?,
            days: row.days,
            reason: row.reason,
            created_at: row.created_at,
        })
    }
}
