use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use serde::Serialize;

use crate::model::{
    holiday::Holiday,
    schedule::{ScheduleAssignment, WorkSchedule},
};

/// A concrete occurrence of a work schedule on a local date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shift {
    pub schedule_id: u64,
    pub name: String,
    /// Date the shift starts on; overnight shifts end on the next day.
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Shift {
    pub fn crosses_midnight(&self) -> bool {
        self.end.date() > self.date
    }

    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Resolves weekly schedule assignments into shifts.
pub struct ScheduleBook<'a> {
    schedules: HashMap<u64, &'a WorkSchedule>,
    assignments: HashMap<u64, Vec<&'a ScheduleAssignment>>,
}

impl<'a> ScheduleBook<'a> {
    pub fn new(schedules: &'a [WorkSchedule], assignments: &'a [ScheduleAssignment]) -> Self {
        let mut by_employee: HashMap<u64, Vec<&ScheduleAssignment>> = HashMap::new();
        for assignment in assignments {
            by_employee
                .entry(assignment.employee_id)
                .or_default()
                .push(assignment);
        }

        Self {
            schedules: schedules.iter().map(|s| (s.id, s)).collect(),
            assignments: by_employee,
        }
    }

    pub fn has_assignments(&self, employee_id: u64) -> bool {
        self.assignments
            .get(&employee_id)
            .is_some_and(|list| !list.is_empty())
    }

    /// Week-specific assignments win over recurring ones; among recurring
    /// ones the most recent `valid_from` wins.
    pub fn assignment_on(&self, employee_id: u64, date: NaiveDate) -> Option<&'a ScheduleAssignment> {
        let list = self.assignments.get(&employee_id)?;
        let weekday = date.weekday().num_days_from_monday() as u8;
        let week = monday_of(date);

        let same_day = || list.iter().copied().filter(move |a| a.weekday == weekday);

        if let Some(specific) = same_day()
            .filter(|a| a.week_start == Some(week))
            .max_by_key(|a| a.id)
        {
            return Some(specific);
        }

        same_day()
            .filter(|a| a.week_start.is_none())
            .filter(|a| a.valid_from <= date && a.valid_to.is_none_or(|to| date <= to))
            .max_by_key(|a| (a.valid_from, a.id))
    }

    pub fn shift_on(&self, employee_id: u64, date: NaiveDate) -> Option<Shift> {
        let assignment = self.assignment_on(employee_id, date)?;
        let schedule = self.schedules.get(&assignment.schedule_id)?;

        let start = date.and_time(schedule.start_time);
        let end_date = if schedule.crosses_midnight() {
            date.succ_opt()?
        } else {
            date
        };

        Some(Shift {
            schedule_id: schedule.id,
            name: schedule.name.clone(),
            date,
            start,
            end: end_date.and_time(schedule.end_time),
        })
    }

    /// Find the shift a clock-in at local time `at` belongs to.
    ///
    /// Looks at the previous day's shift (it may run past midnight), the
    /// same day's shift and the next day's (early arrival before midnight).
    pub fn match_clock_in(
        &self,
        employee_id: u64,
        at: NaiveDateTime,
        early_minutes: u32,
    ) -> Option<Shift> {
        let day = at.date();
        let early = Duration::minutes(i64::from(early_minutes));

        [day.pred_opt(), Some(day), day.succ_opt()]
            .into_iter()
            .flatten()
            .filter_map(|d| self.shift_on(employee_id, d))
            .filter(|shift| shift.start - early <= at && at < shift.end)
            .min_by_key(|shift| (at - shift.start).num_seconds().abs())
    }

    /// Working days are days with a shift that are not holidays. Employees
    /// without any assignment fall back to Monday to Friday.
    pub fn is_working_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
        holidays: &HolidayCalendar,
    ) -> bool {
        if holidays.is_holiday(date) {
            return false;
        }
        if self.has_assignments(employee_id) {
            self.assignment_on(employee_id, date).is_some()
        } else {
            !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
        }
    }
}

#[derive(Debug, Default)]
pub struct HolidayCalendar {
    days: HashMap<NaiveDate, String>,
}

impl HolidayCalendar {
    pub fn new(holidays: &[Holiday]) -> Self {
        Self {
            days: holidays
                .iter()
                .map(|h| (h.date, h.name.clone()))
                .collect(),
        }
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.days.contains_key(&date)
    }

    pub fn name_on(&self, date: NaiveDate) -> Option<&str> {
        self.days.get(&date).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::fixtures::*;

    fn night_and_day() -> (Vec<WorkSchedule>, Vec<ScheduleAssignment>) {
        let schedules = vec![
            schedule(1, "Day", time(6, 0), time(14, 0)),
            schedule(2, "Night", time(22, 0), time(6, 0)),
        ];
        // Mon-Wed nights, Thu-Fri days
        let mut assignments = weekly(1, 9, 2, &[0, 1, 2]);
        assignments.extend(weekly(10, 9, 1, &[3, 4]));
        (schedules, assignments)
    }

    #[test]
    fn monday_of_walks_back_to_week_start() {
        assert_eq!(monday_of(date(2026, 1, 8)), date(2026, 1, 5));
        assert_eq!(monday_of(date(2026, 1, 5)), date(2026, 1, 5));
        assert_eq!(monday_of(date(2026, 1, 11)), date(2026, 1, 5));
    }

    #[test]
    fn overnight_shift_ends_next_day() {
        let (schedules, assignments) = night_and_day();
        let book = ScheduleBook::new(&schedules, &assignments);

        let shift = book.shift_on(9, date(2026, 1, 5)).unwrap();
        assert_eq!(shift.name, "Night");
        assert_eq!(shift.start, at(2026, 1, 5, 22, 0));
        assert_eq!(shift.end, at(2026, 1, 6, 6, 0));
        assert!(shift.crosses_midnight());
        assert_eq!(shift.minutes(), 480);

        assert!(book.shift_on(9, date(2026, 1, 10)).is_none());
    }

    #[test]
    fn clock_in_after_midnight_matches_previous_night() {
        let (schedules, assignments) = night_and_day();
        let book = ScheduleBook::new(&schedules, &assignments);

        let shift = book
            .match_clock_in(9, at(2026, 1, 6, 0, 40), 120)
            .unwrap();
        assert_eq!(shift.date, date(2026, 1, 5));
        assert_eq!(shift.name, "Night");
    }

    #[test]
    fn closest_start_wins_between_adjacent_shifts() {
        let schedules = vec![
            schedule(1, "Morning", time(6, 0), time(14, 0)),
            schedule(2, "Night", time(22, 0), time(6, 30)),
        ];
        let mut assignments = weekly(1, 9, 2, &[0]);
        assignments.extend(weekly(2, 9, 1, &[1]));
        let book = ScheduleBook::new(&schedules, &assignments);

        // Tuesday 05:50 lies inside Monday's night shift and in the early window of Tuesday morning
        let shift = book
            .match_clock_in(9, at(2026, 1, 6, 5, 50), 120)
            .unwrap();
        assert_eq!(shift.name, "Morning");
        assert_eq!(shift.date, date(2026, 1, 6));
    }

    #[test]
    fn early_arrival_before_midnight_matches_next_day() {
        let schedules = vec![schedule(1, "Graveyard", time(0, 30), time(8, 30))];
        let assignments = weekly(1, 9, 1, &[1]);
        let book = ScheduleBook::new(&schedules, &assignments);

        let shift = book
            .match_clock_in(9, at(2026, 1, 5, 23, 50), 60)
            .unwrap();
        assert_eq!(shift.date, date(2026, 1, 6));
        assert!(book.match_clock_in(9, at(2026, 1, 5, 23, 0), 60).is_none());
    }

    #[test]
    fn week_specific_assignment_overrides_recurring() {
        let schedules = vec![
            schedule(1, "Day", time(9, 0), time(17, 0)),
            schedule(2, "Late", time(13, 0), time(21, 0)),
        ];
        let mut assignments = weekly(1, 9, 1, &[0]);
        assignments.push(ScheduleAssignment {
            id: 50,
            employee_id: 9,
            schedule_id: 2,
            weekday: 0,
            valid_from: date(2026, 1, 12),
            valid_to: None,
            week_start: Some(date(2026, 1, 12)),
        });
        let book = ScheduleBook::new(&schedules, &assignments);

        assert_eq!(book.shift_on(9, date(2026, 1, 5)).unwrap().name, "Day");
        assert_eq!(book.shift_on(9, date(2026, 1, 12)).unwrap().name, "Late");
        assert_eq!(book.shift_on(9, date(2026, 1, 19)).unwrap().name, "Day");
    }

    #[test]
    fn recurring_assignments_respect_validity() {
        let schedules = vec![
            schedule(1, "Day", time(9, 0), time(17, 0)),
            schedule(2, "Early", time(7, 0), time(15, 0)),
        ];
        let mut assignments = weekly(1, 9, 1, &[2]);
        assignments[0].valid_to = Some(date(2026, 1, 31));
        assignments.push(ScheduleAssignment {
            id: 2,
            employee_id: 9,
            schedule_id: 2,
            weekday: 2,
            valid_from: date(2026, 2, 1),
            valid_to: None,
            week_start: None,
        });
        let book = ScheduleBook::new(&schedules, &assignments);

        assert_eq!(book.shift_on(9, date(2026, 1, 28)).unwrap().name, "Day");
        assert_eq!(book.shift_on(9, date(2026, 2, 4)).unwrap().name, "Early");
    }

    #[test]
    fn working_days_skip_holidays_and_default_to_weekdays() {
        let schedules = vec![schedule(1, "Day", time(9, 0), time(17, 0))];
        let assignments = weekly(1, 9, 1, &[5]);
        let book = ScheduleBook::new(&schedules, &assignments);
        let holidays = HolidayCalendar::new(&[Holiday {
            id: 1,
            date: date(2026, 1, 6),
            name: "Epiphany".into(),
        }]);

        // assigned Saturdays only
        assert!(book.is_working_day(9, date(2026, 1, 10), &holidays));
        assert!(!book.is_working_day(9, date(2026, 1, 5), &holidays));

        // no assignments: weekdays minus holidays
        assert!(book.is_working_day(1, date(2026, 1, 5), &holidays));
        assert!(!book.is_working_day(1, date(2026, 1, 6), &holidays));
        assert!(!book.is_working_day(1, date(2026, 1, 11), &holidays));
        assert_eq!(holidays.name_on(date(2026, 1, 6)), Some("Epiphany"));
    }
}
