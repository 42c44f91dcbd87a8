use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::{ledger::DailyLedger, round2};

#[derive(Debug, Clone, Serialize)]
pub struct DelayEntry {
    pub date: NaiveDate,
    pub employee_id: u64,
    pub employee_name: String,
    pub schedule_name: String,
    pub scheduled_start: NaiveDateTime,
    pub clock_in: NaiveDateTime,
    pub delay_minutes: i64,
    /// Shift runs past midnight.
    pub overnight: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DelayReport {
    pub entries: Vec<DelayEntry>,
    pub count: usize,
    pub total_minutes: i64,
    pub average_minutes: Option<f64>,
    pub max_minutes: i64,
}

pub fn build(ledger: &DailyLedger, names: &HashMap<u64, String>) -> DelayReport {
    let mut entries: Vec<DelayEntry> = ledger
        .days
        .iter()
        .filter(|d| d.is_delayed())
        .filter_map(|d| {
            let shift = d.shift.as_ref()?;
            Some(DelayEntry {
                date: d.date,
                employee_id: d.employee_id,
                employee_name: names.get(&d.employee_id).cloned().unwrap_or_default(),
                schedule_name: shift.name.clone(),
                scheduled_start: shift.start,
                clock_in: d.shift_clock_in?,
                delay_minutes: d.delay_minutes,
                overnight: shift.crosses_midnight(),
            })
        })
        .collect();

    entries.sort_by_key(|e| (e.date, e.employee_id));

    let count = entries.len();
    let total_minutes: i64 = entries.iter().map(|e| e.delay_minutes).sum();

    DelayReport {
        count,
        total_minutes,
        average_minutes: (count > 0).then(|| round2(total_minutes as f64 / count as f64)),
        max_minutes: entries.iter().map(|e| e.delay_minutes).max().unwrap_or(0),
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::clock_event::EventKind;
    use crate::reporting::fixtures::*;

    #[test]
    fn lists_delays_by_date_then_employee() {
        let mut data = dataset(date(2026, 1, 5), date(2026, 1, 7));
        data.employees.push(employee(2, "ben"));
        data.schedules.push(schedule(2, "Night", time(22, 0), time(6, 0)));
        data.assignments.extend(weekly(20, 2, 2, &[0, 1, 2]));
        data.events = vec![
            // ana late on Tuesday, ben late for Monday night after midnight
            event(1, 1, EventKind::ClockIn, at(2026, 1, 6, 9, 12)),
            event(2, 1, EventKind::ClockOut, at(2026, 1, 6, 17, 0)),
            event(3, 2, EventKind::ClockIn, at(2026, 1, 6, 0, 5)),
            event(4, 2, EventKind::ClockOut, at(2026, 1, 6, 6, 0)),
            event(5, 1, EventKind::ClockIn, at(2026, 1, 5, 9, 45)),
            event(6, 1, EventKind::ClockOut, at(2026, 1, 5, 17, 0)),
            // within grace
            event(7, 2, EventKind::ClockIn, at(2026, 1, 6, 22, 4)),
            event(8, 2, EventKind::ClockOut, at(2026, 1, 7, 6, 0)),
        ];

        let ledger = DailyLedger::build(&data);
        let report = build(&ledger, &data.employee_names());

        let keys: Vec<_> = report
            .entries
            .iter()
            .map(|e| (e.date, e.employee_id, e.delay_minutes))
            .collect();
        assert_eq!(
            keys,
            vec![
                (date(2026, 1, 5), 1, 45),
                (date(2026, 1, 5), 2, 125),
                (date(2026, 1, 6), 1, 12),
            ]
        );
        assert!(report.entries[1].overnight);
        assert_eq!(report.entries[1].scheduled_start, at(2026, 1, 5, 22, 0));
        assert_eq!(report.count, 3);
        assert_eq!(report.total_minutes, 182);
        assert_eq!(report.max_minutes, 125);
        assert_eq!(report.average_minutes, Some(60.67));
    }

    #[test]
    fn empty_report_has_no_average() {
        let data = dataset(date(2026, 1, 5), date(2026, 1, 5));
        let ledger = DailyLedger::build(&data);
        let report = build(&ledger, &data.employee_names());
        assert_eq!(report.count, 0);
        assert_eq!(report.average_minutes, None);
        assert_eq!(report.max_minutes, 0);
    }
}
