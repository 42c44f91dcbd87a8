use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use super::{
    ReportDataset,
    schedule::{HolidayCalendar, ScheduleBook, Shift},
    timeline::{WorkSession, build_sessions, to_local},
};
use crate::model::absence::{Absence, AbsenceStatus};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DayStatus {
    Present,
    Late,
    Absent,
    OnLeave,
    Holiday,
    RestDay,
    /// Shift still ahead of the report's as-of time.
    Scheduled,
}

/// Everything known about one employee on one local date.
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeDay {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub status: DayStatus,
    pub shift: Option<Shift>,
    #[serde(skip)]
    pub sessions: Vec<WorkSession>,
    pub holiday: Option<String>,
    pub leave_days: f64,
    pub first_in: Option<NaiveDateTime>,
    pub last_out: Option<NaiveDateTime>,
    /// First clock-in attributed to the day's shift.
    pub shift_clock_in: Option<NaiveDateTime>,
    pub worked_minutes: i64,
    pub break_minutes: i64,
    pub unpaid_break_minutes: i64,
    pub net_minutes: i64,
    pub scheduled_minutes: i64,
    pub delay_minutes: i64,
    pub incomplete_sessions: usize,
}

impl EmployeeDay {
    pub fn balance_minutes(&self) -> i64 {
        self.net_minutes - self.scheduled_minutes
    }

    pub fn is_delayed(&self) -> bool {
        self.delay_minutes > 0
    }
}

#[derive(Debug, Default)]
pub struct DailyLedger {
    /// Ordered by employee, then date.
    pub days: Vec<EmployeeDay>,
    /// Unpaired events whose local date falls inside the range.
    pub anomalies: usize,
}

#[derive(Default)]
struct Attributed {
    sessions: Vec<WorkSession>,
    shift_clock_in: Option<NaiveDateTime>,
}

impl DailyLedger {
    pub fn build(data: &ReportDataset) -> Self {
        let offset = data.company.offset();
        let timeline = build_sessions(&data.events, offset);
        let book = ScheduleBook::new(&data.schedules, &data.assignments);
        let holidays = HolidayCalendar::new(&data.holidays);
        let as_of = to_local(data.as_of, offset);
        let paid: HashMap<u64, bool> = data.break_types.iter().map(|b| (b.id, b.paid)).collect();

        let mut employees: Vec<(u64, NaiveDate)> =
            data.employees.iter().map(|e| (e.id, e.hire_date)).collect();
        employees.sort_unstable();

        let mut days = Vec::with_capacity(employees.len() * data.range.len_days() as usize);

        for (employee_id, hire_date) in employees {
            let mut attributed: BTreeMap<NaiveDate, Attributed> = BTreeMap::new();

            for session in timeline.sessions_for(employee_id) {
                let matched = book.match_clock_in(
                    employee_id,
                    session.clock_in,
                    data.company.early_checkin_minutes,
                );
                let date = matched
                    .as_ref()
                    .map_or(session.clock_in.date(), |shift| shift.date);
                if !data.range.contains(date) {
                    continue;
                }

                let slot = attributed.entry(date).or_default();
                if matched.is_some() {
                    slot.shift_clock_in = Some(
                        slot.shift_clock_in
                            .map_or(session.clock_in, |t| t.min(session.clock_in)),
                    );
                }
                slot.sessions.push(session.clone());
            }

            let absences: Vec<&Absence> = data
                .absences
                .iter()
                .filter(|a| a.employee_id == employee_id && a.status == AbsenceStatus::Approved)
                .collect();

            for date in data.range.days() {
                let slot = attributed.remove(&date).unwrap_or_default();
                let employed = date >= hire_date;
                // nothing is owed before the hire date
                let shift = if employed {
                    book.shift_on(employee_id, date)
                } else {
                    None
                };
                let holiday = holidays.name_on(date).map(str::to_owned);

                let leave_days = if employed && book.is_working_day(employee_id, date, &holidays) {
                    absences
                        .iter()
                        .map(|a| a.portion_on(date))
                        .sum::<f64>()
                        .min(1.0)
                } else {
                    0.0
                };

                days.push(day_entry(DayInput {
                    employee_id,
                    date,
                    shift,
                    slot,
                    holiday,
                    leave_days,
                    as_of,
                    grace_minutes: data.company.delay_grace_minutes,
                    paid: &paid,
                }));
            }
        }

        let anomalies = timeline
            .anomalies
            .iter()
            .filter(|at| data.range.contains(at.date()))
            .count();

        Self { days, anomalies }
    }

    pub fn for_employee(&self, employee_id: u64) -> impl Iterator<Item = &EmployeeDay> {
        self.days.iter().filter(move |d| d.employee_id == employee_id)
    }
}

struct DayInput<'a> {
    employee_id: u64,
    date: NaiveDate,
    shift: Option<Shift>,
    slot: Attributed,
    holiday: Option<String>,
    leave_days: f64,
    as_of: NaiveDateTime,
    grace_minutes: u32,
    paid: &'a HashMap<u64, bool>,
}

fn day_entry(input: DayInput<'_>) -> EmployeeDay {
    let DayInput {
        employee_id,
        date,
        shift,
        slot,
        holiday,
        leave_days,
        as_of,
        grace_minutes,
        paid,
    } = input;
    let sessions = slot.sessions;

    let worked_minutes: i64 = sessions.iter().map(WorkSession::worked_minutes).sum();
    let break_minutes: i64 = sessions.iter().map(WorkSession::break_minutes).sum();
    let unpaid_break_minutes: i64 = sessions
        .iter()
        .filter(|s| s.is_complete())
        .flat_map(|s| s.breaks.iter())
        .filter(|b| {
            !b.break_type_id
                .and_then(|id| paid.get(&id).copied())
                .unwrap_or(false)
        })
        .map(|b| b.minutes())
        .sum();
    let net_minutes = (worked_minutes - unpaid_break_minutes).max(0);

    let delay_minutes = match (&shift, slot.shift_clock_in) {
        (Some(shift), Some(clock_in)) => {
            let late_by = (clock_in - shift.start).num_minutes();
            if late_by > i64::from(grace_minutes) {
                late_by
            } else {
                0
            }
        }
        _ => 0,
    };

    let status = if !sessions.is_empty() {
        if delay_minutes > 0 {
            DayStatus::Late
        } else {
            DayStatus::Present
        }
    } else if holiday.is_some() {
        DayStatus::Holiday
    } else if leave_days > 0.0 {
        DayStatus::OnLeave
    } else if let Some(shift) = &shift {
        if shift.start > as_of {
            DayStatus::Scheduled
        } else {
            DayStatus::Absent
        }
    } else {
        DayStatus::RestDay
    };

    let scheduled_minutes = match &shift {
        Some(shift) if holiday.is_none() => {
            (shift.minutes() as f64 * (1.0 - leave_days)).round() as i64
        }
        _ => 0,
    };

    EmployeeDay {
        employee_id,
        date,
        status,
        first_in: sessions.iter().map(|s| s.clock_in).min(),
        last_out: sessions.iter().filter_map(|s| s.clock_out).max(),
        shift_clock_in: slot.shift_clock_in,
        incomplete_sessions: sessions.iter().filter(|s| !s.is_complete()).count(),
        shift,
        sessions,
        holiday,
        leave_days,
        worked_minutes,
        break_minutes,
        unpaid_break_minutes,
        net_minutes,
        scheduled_minutes,
        delay_minutes,
    }
}
