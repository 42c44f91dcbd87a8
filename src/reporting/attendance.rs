use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::ledger::{DailyLedger, DayStatus};

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRow {
    pub employee_id: u64,
    pub employee_name: String,
    pub date: NaiveDate,
    pub status: DayStatus,
    pub shift_name: Option<String>,
    pub first_in: Option<NaiveDateTime>,
    pub delay_minutes: i64,
    pub holiday: Option<String>,
    pub leave_days: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceReport {
    pub rows: Vec<AttendanceRow>,
    pub status_counts: BTreeMap<DayStatus, usize>,
}

pub fn build(ledger: &DailyLedger, names: &HashMap<u64, String>) -> AttendanceReport {
    let mut status_counts = BTreeMap::new();

    let rows = ledger
        .days
        .iter()
        .map(|day| {
            *status_counts.entry(day.status).or_insert(0) += 1;
            AttendanceRow {
                employee_id: day.employee_id,
                employee_name: names.get(&day.employee_id).cloned().unwrap_or_default(),
                date: day.date,
                status: day.status,
                shift_name: day.shift.as_ref().map(|s| s.name.clone()),
                first_in: day.first_in,
                delay_minutes: day.delay_minutes,
                holiday: day.holiday.clone(),
                leave_days: day.leave_days,
            }
        })
        .collect();

    AttendanceReport {
        rows,
        status_counts,
    }
}
