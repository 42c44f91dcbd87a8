use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct WorkSchedule {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Night shift")]
    pub name: String,
    #[schema(example = "22:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "06:00:00", value_type = String)]
    pub end_time: NaiveTime,
}

impl WorkSchedule {
    /// An end at or before the start means the shift finishes the next day.
    pub fn crosses_midnight(&self) -> bool {
        self.end_time <= self.start_time
    }
}

/// Weekly schedule assignment: employee works `schedule_id` on `weekday`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ScheduleAssignment {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 1)]
    pub schedule_id: u64,
    /// 0 = Monday .. 6 = Sunday
    #[schema(example = 0)]
    pub weekday: u8,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub valid_from: NaiveDate,
    #[schema(example = "2026-12-31", value_type = String, format = "date", nullable = true)]
    pub valid_to: Option<NaiveDate>,
    /// Monday of the single ISO week this assignment is limited to.
    #[schema(example = "2026-01-05", value_type = String, format = "date", nullable = true)]
    pub week_start: Option<NaiveDate>,
}
