use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct VacationPolicy {
    #[schema(example = 22.0)]
    pub annual_days: f64,
    #[schema(example = 5.0)]
    pub max_carry_over_days: f64,
}

impl Default for VacationPolicy {
    fn default() -> Self {
        Self {
            annual_days: 22.0,
            max_carry_over_days: 5.0,
        }
    }
}

/// Per-employee, per-year vacation ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct VacationBalance {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 22.0)]
    pub allotted_days: f64,
    #[schema(example = 3.0)]
    pub carried_over_days: f64,
    #[schema(example = 7.5)]
    pub used_days: f64,
    #[schema(example = 2.0)]
    pub pending_days: f64,
}

impl VacationBalance {
    pub fn available(&self) -> f64 {
        self.allotted_days + self.carried_over_days - self.used_days - self.pending_days
    }
}
