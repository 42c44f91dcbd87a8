use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::ledger::DailyLedger;

#[derive(Debug, Clone, Serialize)]
pub struct TimeReportRow {
    pub employee_id: u64,
    pub employee_name: String,
    pub date: NaiveDate,
    pub shift_name: Option<String>,
    pub first_in: Option<NaiveDateTime>,
    pub last_out: Option<NaiveDateTime>,
    pub worked_minutes: i64,
    pub break_minutes: i64,
    pub net_minutes: i64,
    pub scheduled_minutes: i64,
    pub balance_minutes: i64,
    /// Some session of the day has no clock-out yet.
    pub incomplete: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TimeTotals {
    pub employee_id: u64,
    pub employee_name: String,
    pub worked_minutes: i64,
    pub break_minutes: i64,
    pub net_minutes: i64,
    pub scheduled_minutes: i64,
    pub balance_minutes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeReport {
    pub rows: Vec<TimeReportRow>,
    pub totals: Vec<TimeTotals>,
}

pub fn build(ledger: &DailyLedger, names: &HashMap<u64, String>) -> TimeReport {
    let mut rows = Vec::new();
    let mut totals: Vec<TimeTotals> = Vec::new();

    for day in &ledger.days {
        if day.sessions.is_empty() && day.shift.is_none() {
            continue;
        }

        let name = names.get(&day.employee_id).cloned().unwrap_or_default();

        if totals.last().is_none_or(|t| t.employee_id != day.employee_id) {
            totals.push(TimeTotals {
                employee_id: day.employee_id,
                employee_name: name.clone(),
                ..Default::default()
            });
        }
        if let Some(total) = totals.last_mut() {
            total.worked_minutes += day.worked_minutes;
            total.break_minutes += day.break_minutes;
            total.net_minutes += day.net_minutes;
            total.scheduled_minutes += day.scheduled_minutes;
            total.balance_minutes += day.balance_minutes();
        }

        rows.push(TimeReportRow {
            employee_id: day.employee_id,
            employee_name: name,
            date: day.date,
            shift_name: day.shift.as_ref().map(|s| s.name.clone()),
            first_in: day.first_in,
            last_out: day.last_out,
            worked_minutes: day.worked_minutes,
            break_minutes: day.break_minutes,
            net_minutes: day.net_minutes,
            scheduled_minutes: day.scheduled_minutes,
            balance_minutes: day.balance_minutes(),
            incomplete: day.incomplete_sessions > 0,
        });
    }

    TimeReport { rows, totals }
}
