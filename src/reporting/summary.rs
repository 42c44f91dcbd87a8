use std::collections::{BTreeMap, HashMap};

use chrono::Datelike;
use serde::Serialize;

use super::{
    ledger::{DailyLedger, DayStatus, EmployeeDay},
    round2,
};

/// Counters shared by the per-employee summary and the monthly report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryTotals {
    pub present_days: u32,
    pub late_days: u32,
    pub absent_days: u32,
    pub on_leave_days: u32,
    pub holiday_days: u32,
    pub rest_days: u32,
    pub upcoming_days: u32,
    /// Half days count as 0.5.
    pub leave_days: f64,
    pub worked_minutes: i64,
    pub break_minutes: i64,
    pub net_minutes: i64,
    pub scheduled_minutes: i64,
    pub balance_minutes: i64,
    pub total_delay_minutes: i64,
    pub max_delay_minutes: i64,
    pub attendance_rate: Option<f64>,
    pub average_delay_minutes: Option<f64>,
}

impl SummaryTotals {
    pub fn add(&mut self, day: &EmployeeDay) {
        match day.status {
            DayStatus::Present => self.present_days += 1,
            DayStatus::Late => self.late_days += 1,
            DayStatus::Absent => self.absent_days += 1,
            DayStatus::OnLeave => self.on_leave_days += 1,
            DayStatus::Holiday => self.holiday_days += 1,
            DayStatus::RestDay => self.rest_days += 1,
            DayStatus::Scheduled => self.upcoming_days += 1,
        }
        self.leave_days += day.leave_days;
        self.worked_minutes += day.worked_minutes;
        self.break_minutes += day.break_minutes;
        self.net_minutes += day.net_minutes;
        self.scheduled_minutes += day.scheduled_minutes;
        self.balance_minutes += day.balance_minutes();
        self.total_delay_minutes += day.delay_minutes;
        self.max_delay_minutes = self.max_delay_minutes.max(day.delay_minutes);
    }

    /// Fill in the derived ratios once every day has been added.
    pub fn finish(mut self) -> Self {
        let attended = self.present_days + self.late_days;
        let expected = attended + self.absent_days;
        self.attendance_rate =
            (expected > 0).then(|| round2(f64::from(attended) * 100.0 / f64::from(expected)));
        self.average_delay_minutes = (self.late_days > 0)
            .then(|| round2(self.total_delay_minutes as f64 / f64::from(self.late_days)));
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeSummary {
    pub employee_id: u64,
    pub employee_name: String,
    #[serde(flatten)]
    pub totals: SummaryTotals,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyRow {
    pub employee_id: u64,
    pub employee_name: String,
    /// `YYYY-MM`
    pub month: String,
    #[serde(flatten)]
    pub totals: SummaryTotals,
}

pub fn employee_summaries(
    ledger: &DailyLedger,
    names: &HashMap<u64, String>,
) -> Vec<EmployeeSummary> {
    let mut grouped: BTreeMap<u64, SummaryTotals> = BTreeMap::new();
    for day in &ledger.days {
        grouped.entry(day.employee_id).or_default().add(day);
    }

    grouped
        .into_iter()
        .map(|(employee_id, totals)| EmployeeSummary {
            employee_id,
            employee_name: names.get(&employee_id).cloned().unwrap_or_default(),
            totals: totals.finish(),
        })
        .collect()
}

pub fn monthly(ledger: &DailyLedger, names: &HashMap<u64, String>) -> Vec<MonthlyRow> {
    let mut grouped: BTreeMap<(u64, i32, u32), SummaryTotals> = BTreeMap::new();
    for day in &ledger.days {
        grouped
            .entry((day.employee_id, day.date.year(), day.date.month()))
            .or_default()
            .add(day);
    }

    grouped
        .into_iter()
        .map(|((employee_id, year, month), totals)| MonthlyRow {
            employee_id,
            employee_name: names.get(&employee_id).cloned().unwrap_or_default(),
            month: format!("{year:04}-{month:02}"),
            totals: totals.finish(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::clock_event::EventKind;
    use crate::reporting::fixtures::*;

    fn week_with_two_delays() -> crate::reporting::ReportDataset {
        let mut data = dataset(date(2026, 1, 26), date(2026, 2, 3));
        data.employees.push(employee(2, "ben"));
        data.events = vec![
            event(1, 1, EventKind::ClockIn, at(2026, 1, 26, 9, 10)),
            event(2, 1, EventKind::ClockOut, at(2026, 1, 26, 17, 0)),
            event(3, 1, EventKind::ClockIn, at(2026, 1, 27, 9, 0)),
            event(4, 1, EventKind::ClockOut, at(2026, 1, 27, 17, 0)),
            event(5, 1, EventKind::ClockIn, at(2026, 2, 2, 9, 30)),
            event(6, 1, EventKind::ClockOut, at(2026, 2, 2, 17, 0)),
        ];
        data
    }

    #[test]
    fn summary_counts_days_and_delays() {
        let data = week_with_two_delays();
        let ledger = DailyLedger::build(&data);
        let summaries = employee_summaries(&ledger, &data.employee_names());

        assert_eq!(summaries.len(), 2);
        let ana = &summaries[0].totals;
        assert_eq!(ana.late_days, 2);
        assert_eq!(ana.present_days, 1);
        // Jan 28-30 and Feb 3
        assert_eq!(ana.absent_days, 4);
        assert_eq!(ana.rest_days, 2);
        assert_eq!(ana.total_delay_minutes, 40);
        assert_eq!(ana.max_delay_minutes, 30);
        assert_eq!(ana.average_delay_minutes, Some(20.0));
        assert_eq!(ana.attendance_rate, Some(42.86));

        // no schedule, no events
        let ben = &summaries[1].totals;
        assert_eq!(ben.rest_days, 9);
        assert_eq!(ben.attendance_rate, None);
        assert_eq!(ben.average_delay_minutes, None);
    }

    #[test]
    fn monthly_splits_on_calendar_month() {
        let data = week_with_two_delays();
        let ledger = DailyLedger::build(&data);
        let rows = monthly(&ledger, &data.employee_names());

        let months: Vec<_> = rows
            .iter()
            .map(|r| (r.employee_id, r.month.as_str()))
            .collect();
        assert_eq!(
            months,
            vec![(1, "2026-01"), (1, "2026-02"), (2, "2026-01"), (2, "2026-02")]
        );

        assert_eq!(rows[0].totals.late_days, 1);
        assert_eq!(rows[0].totals.absent_days, 3);
        assert_eq!(rows[1].totals.late_days, 1);
        assert_eq!(rows[1].totals.absent_days, 1);
        assert_eq!(rows[1].totals.attendance_rate, Some(50.0));

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["month"], "2026-01");
        assert_eq!(json["late_days"], 1);
    }
}
