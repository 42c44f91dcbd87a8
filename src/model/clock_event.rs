use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    ClockIn,
    ClockOut,
    BreakStart,
    BreakEnd,
}

/// Raw row as stored; `kind` is a VARCHAR column.
#[derive(Debug, sqlx::FromRow)]
pub struct ClockEventRow {
    pub id: u64,
    pub employee_id: u64,
    pub kind: String,
    pub occurred_at: NaiveDateTime,
    pub break_type_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClockEvent {
    pub id: u64,
    pub employee_id: u64,
    pub kind: EventKind,
    /// UTC instant
    #[schema(example = "2026-01-05T08:02:00", value_type = String, format = "date-time")]
    pub occurred_at: NaiveDateTime,
    pub break_type_id: Option<u64>,
}

impl TryFrom<ClockEventRow> for ClockEvent {
    type Error = strum::ParseError;

    fn try_from(row: ClockEventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            employee_id: row.employee_id,
            kind: row.kind.parse()?,
            occurred_at: row.occurred_at,
            break_type_id: row.break_type_id,
        })
    }
}
