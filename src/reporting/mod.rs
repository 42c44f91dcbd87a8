//! Attendance, delay and break reporting.
//!
//! Everything below `loader` is synchronous and works on a [`ReportDataset`]
//! that has already been fetched for one company and one date range.

pub mod attendance;
pub mod breaks;
pub mod delays;
pub mod ledger;
pub mod loader;
pub mod schedule;
pub mod summary;
pub mod time_report;
pub mod timeline;
pub mod vacation;

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use derive_more::Display;
use serde::Serialize;
use strum_macros::{AsRefStr, Display as StrumDisplay, EnumString};
use tracing::{debug, instrument};

use crate::model::{
    absence::Absence, break_type::BreakType, clock_event::ClockEvent, company::Company,
    employee::Employee, holiday::Holiday, schedule::ScheduleAssignment, schedule::WorkSchedule,
};

use self::{
    attendance::AttendanceReport, breaks::BreakTypeRow, delays::DelayReport,
    ledger::DailyLedger, summary::EmployeeSummary, summary::MonthlyRow, time_report::TimeReport,
};

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ReportError {
    #[display(fmt = "`from` ({}) must not be after `to` ({})", from, to)]
    InvertedRange { from: NaiveDate, to: NaiveDate },
    #[display(fmt = "report range spans {} days, the limit is {}", days, max)]
    RangeTooLong { days: i64, max: u32 },
}

impl std::error::Error for ReportError {}

/// Inclusive range of local calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate, max_days: u32) -> Result<Self, ReportError> {
        if from > to {
            return Err(ReportError::InvertedRange { from, to });
        }
        let range = Self { from, to };
        let days = range.len_days();
        if days > i64::from(max_days) {
            return Err(ReportError::RangeTooLong {
                days,
                max: max_days,
            });
        }
        Ok(range)
    }

    pub fn len_days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.from.iter_days().take_while(move |d| *d <= self.to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumString, StrumDisplay, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportKind {
    Time,
    Attendance,
    Summary,
    Monthly,
    Breaks,
    Delays,
}

/// Rows already scoped to one company, one range and (optionally) one employee.
#[derive(Debug, Clone)]
pub struct ReportDataset {
    pub company: Company,
    pub range: DateRange,
    /// UTC instant the report is computed at; shifts starting later are not absences.
    pub as_of: NaiveDateTime,
    pub employees: Vec<Employee>,
    pub events: Vec<ClockEvent>,
    pub schedules: Vec<WorkSchedule>,
    pub assignments: Vec<ScheduleAssignment>,
    pub absences: Vec<Absence>,
    pub holidays: Vec<Holiday>,
    pub break_types: Vec<BreakType>,
}

impl ReportDataset {
    pub fn employee_names(&self) -> HashMap<u64, String> {
        self.employees
            .iter()
            .map(|e| (e.id, e.full_name()))
            .collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReportBody {
    Time(TimeReport),
    Attendance(AttendanceReport),
    Summary(Vec<EmployeeSummary>),
    Monthly(Vec<MonthlyRow>),
    Breaks(Vec<BreakTypeRow>),
    Delays(DelayReport),
}

#[derive(Debug, Serialize)]
pub struct GeneratedReport {
    pub kind: ReportKind,
    pub company_id: u64,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Clock events that could not be paired (orphan clock-outs, stray breaks).
    pub anomalies: usize,
    pub report: ReportBody,
}

#[instrument(
    name = "generate_report",
    skip(dataset),
    fields(company_id = dataset.company.id, from = %dataset.range.from, to = %dataset.range.to)
)]
pub fn generate(kind: ReportKind, dataset: &ReportDataset) -> GeneratedReport {
    let ledger = DailyLedger::build(dataset);
    let names = dataset.employee_names();

    debug!(
        days = ledger.days.len(),
        anomalies = ledger.anomalies,
        "Daily ledger built"
    );

    let report = match kind {
        ReportKind::Time => ReportBody::Time(time_report::build(&ledger, &names)),
        ReportKind::Attendance => ReportBody::Attendance(attendance::build(&ledger, &names)),
        ReportKind::Summary => ReportBody::Summary(summary::employee_summaries(&ledger, &names)),
        ReportKind::Monthly => ReportBody::Monthly(summary::monthly(&ledger, &names)),
        ReportKind::Breaks => {
            ReportBody::Breaks(breaks::build(&ledger, &names, &dataset.break_types))
        }
        ReportKind::Delays => ReportBody::Delays(delays::build(&ledger, &names)),
    };

    GeneratedReport {
        kind,
        company_id: dataset.company.id,
        from: dataset.range.from,
        to: dataset.range.to,
        anomalies: ledger.anomalies,
        report,
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::model::clock_event::EventKind;
    use chrono::{NaiveTime, Utc};

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    pub fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    pub fn company(offset_minutes: i32) -> Company {
        Company {
            id: 1,
            name: "Acme".into(),
            utc_offset_minutes: offset_minutes,
            delay_grace_minutes: 5,
            early_checkin_minutes: 120,
        }
    }

    pub fn employee(id: u64, first: &str) -> Employee {
        Employee {
            id,
            employee_code: format!("EMP-{id}"),
            first_name: first.into(),
            last_name: "Test".into(),
            email: format!("{first}@acme.test"),
            hire_date: date(2024, 1, 1),
            active: true,
        }
    }

    pub fn event(
        id: u64,
        employee_id: u64,
        kind: EventKind,
        occurred_at: NaiveDateTime,
    ) -> ClockEvent {
        ClockEvent {
            id,
            employee_id,
            kind,
            occurred_at,
            break_type_id: None,
        }
    }

    pub fn schedule(id: u64, name: &str, start: NaiveTime, end: NaiveTime) -> WorkSchedule {
        WorkSchedule {
            id,
            name: name.into(),
            start_time: start,
            end_time: end,
        }
    }

    /// Recurring assignment for every weekday in `weekdays`.
    pub fn weekly(
        first_id: u64,
        employee_id: u64,
        schedule_id: u64,
        weekdays: &[u8],
    ) -> Vec<ScheduleAssignment> {
        weekdays
            .iter()
            .enumerate()
            .map(|(i, wd)| ScheduleAssignment {
                id: first_id + i as u64,
                employee_id,
                schedule_id,
                weekday: *wd,
                valid_from: date(2020, 1, 1),
                valid_to: None,
                week_start: None,
            })
            .collect()
    }

    pub fn absence(
        id: u64,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Absence {
        use crate::model::absence::{AbsenceStatus, AbsenceType};
        Absence {
            id,
            employee_id,
            absence_type: AbsenceType::Vacation,
            start_date: start,
            end_date: end,
            half_day_start: false,
            half_day_end: false,
            status: AbsenceStatus::Approved,
            days: 0.0,
            reason: None,
            created_at: Utc::now(),
        }
    }

    pub fn dataset(from: NaiveDate, to: NaiveDate) -> ReportDataset {
        ReportDataset {
            company: company(0),
            range: DateRange::new(from, to, 366).unwrap(),
            as_of: at(2030, 1, 1, 0, 0),
            employees: vec![employee(1, "ana")],
            events: Vec::new(),
            schedules: vec![schedule(1, "Day", time(9, 0), time(17, 0))],
            assignments: weekly(1, 1, 1, &[0, 1, 2, 3, 4]),
            absences: Vec::new(),
            holidays: Vec::new(),
            break_types: Vec::new(),
        }
    }
}
