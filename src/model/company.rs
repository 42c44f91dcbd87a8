use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Tenant record with the settings the reporting engine depends on.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Company {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Acme Logistics")]
    pub name: String,
    /// Minutes east of UTC used to turn stored instants into local time.
    #[schema(example = 60)]
    pub utc_offset_minutes: i32,
    /// Clock-ins up to this many minutes after shift start are not delays.
    #[schema(example = 5)]
    pub delay_grace_minutes: u32,
    /// How long before a shift starts a clock-in is still attributed to it.
    #[schema(example = 120)]
    pub early_checkin_minutes: u32,
}

impl Company {
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }
}
