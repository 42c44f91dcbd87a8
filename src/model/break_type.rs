use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct BreakType {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Lunch")]
    pub name: String,
    /// Paid breaks are not subtracted from worked time.
    #[schema(example = false)]
    pub paid: bool,
    #[schema(example = 60, nullable = true)]
    pub max_minutes: Option<u32>,
}
