//! Working-day counting for absences and the yearly vacation ledger.

use chrono::{Datelike, NaiveDate};

use super::schedule::{HolidayCalendar, ScheduleBook};
use crate::model::{
    absence::{Absence, AbsenceStatus, AbsenceType},
    vacation::{VacationBalance, VacationPolicy},
};

/// Round to the nearest half day.
pub fn round_half(days: f64) -> f64 {
    (days * 2.0).round() / 2.0
}

pub fn working_days_between(
    book: &ScheduleBook<'_>,
    holidays: &HolidayCalendar,
    employee_id: u64,
    from: NaiveDate,
    to: NaiveDate,
) -> u32 {
    from.iter_days()
        .take_while(|d| *d <= to)
        .filter(|d| book.is_working_day(employee_id, *d, holidays))
        .count() as u32
}

/// Working days taken by an absence, with half-day edges counting 0.5.
pub fn absence_days(
    book: &ScheduleBook<'_>,
    holidays: &HolidayCalendar,
    employee_id: u64,
    start: NaiveDate,
    end: NaiveDate,
    half_day_start: bool,
    half_day_end: bool,
) -> f64 {
    if start > end {
        return 0.0;
    }

    let mut days = f64::from(working_days_between(book, holidays, employee_id, start, end));

    if start == end {
        if days > 0.0 && (half_day_start || half_day_end) {
            days = 0.5;
        }
    } else {
        if half_day_start && book.is_working_day(employee_id, start, holidays) {
            days -= 0.5;
        }
        if half_day_end && book.is_working_day(employee_id, end, holidays) {
            days -= 0.5;
        }
    }

    round_half(days.max(0.0))
}

/// Portion of `absence` that falls in `year`. Half-day flags only apply to
/// edges that stay inside the year.
pub fn days_in_year(
    book: &ScheduleBook<'_>,
    holidays: &HolidayCalendar,
    absence: &Absence,
    year: i32,
) -> f64 {
    let (Some(first), Some(last)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return 0.0;
    };

    let start = absence.start_date.max(first);
    let end = absence.end_date.min(last);
    if start > end {
        return 0.0;
    }

    absence_days(
        book,
        holidays,
        absence.employee_id,
        start,
        end,
        absence.half_day_start && start == absence.start_date,
        absence.half_day_end && end == absence.end_date,
    )
}

/// Yearly allotment, prorated by remaining months in the hiring year.
pub fn allotment_for_year(policy: &VacationPolicy, year: i32, hire_date: NaiveDate) -> f64 {
    match hire_date.year().cmp(&year) {
        std::cmp::Ordering::Greater => 0.0,
        std::cmp::Ordering::Less => policy.annual_days,
        std::cmp::Ordering::Equal => {
            let remaining_months = 12 - hire_date.month0();
            round_half(policy.annual_days * f64::from(remaining_months) / 12.0)
        }
    }
}

/// Days moved from a closed year into the next one.
pub fn carry_over(previous: &VacationBalance, policy: &VacationPolicy) -> f64 {
    previous
        .available()
        .max(0.0)
        .min(policy.max_carry_over_days.max(0.0))
}

pub struct BalanceInput<'a> {
    pub employee_id: u64,
    pub year: i32,
    pub allotted_days: f64,
    pub carried_over_days: f64,
    pub absences: &'a [Absence],
}

/// Recompute used and pending days from the employee's vacation absences.
pub fn rebuild_balance(
    book: &ScheduleBook<'_>,
    holidays: &HolidayCalendar,
    input: BalanceInput<'_>,
) -> VacationBalance {
    let mut used_days = 0.0;
    let mut pending_days = 0.0;

    for absence in input
        .absences
        .iter()
        .filter(|a| a.employee_id == input.employee_id)
        .filter(|a| a.absence_type == AbsenceType::Vacation)
    {
        let days = days_in_year(book, holidays, absence, input.year);
        match absence.status {
            AbsenceStatus::Approved => used_days += days,
            AbsenceStatus::Pending => pending_days += days,
            AbsenceStatus::Rejected => {}
        }
    }

    VacationBalance {
        employee_id: input.employee_id,
        year: input.year,
        allotted_days: input.allotted_days,
        carried_over_days: input.carried_over_days,
        used_days: round_half(used_days),
        pending_days: round_half(pending_days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{holiday::Holiday, schedule::WorkSchedule};
    use crate::reporting::fixtures::*;

    fn weekdays() -> (Vec<WorkSchedule>, Vec<crate::model::schedule::ScheduleAssignment>) {
        (
            vec![schedule(1, "Day", time(9, 0), time(17, 0))],
            weekly(1, 1, 1, &[0, 1, 2, 3, 4]),
        )
    }

    fn christmas() -> HolidayCalendar {
        HolidayCalendar::new(&[
            Holiday {
                id: 1,
                date: date(2025, 12, 25),
                name: "Christmas".into(),
            },
            Holiday {
                id: 2,
                date: date(2026, 1, 1),
                name: "New Year".into(),
            },
        ])
    }

    #[test]
    fn round_half_snaps_to_half_days() {
        assert_eq!(round_half(2.26), 2.5);
        assert_eq!(round_half(2.24), 2.0);
        assert_eq!(round_half(3.0), 3.0);
    }

    #[test]
    fn absence_days_skip_weekends_and_holidays() {
        let (schedules, assignments) = weekdays();
        let book = ScheduleBook::new(&schedules, &assignments);
        let holidays = christmas();

        // Mon 22 Dec 2025 .. Fri 2 Jan 2026: 10 weekdays minus 2 holidays
        let days = absence_days(
            &book,
            &holidays,
            1,
            date(2025, 12, 22),
            date(2026, 1, 2),
            false,
            false,
        );
        assert_eq!(days, 8.0);
    }

    #[test]
    fn half_day_edges() {
        let (schedules, assignments) = weekdays();
        let book = ScheduleBook::new(&schedules, &assignments);
        let none = HolidayCalendar::default();

        let monday = date(2026, 1, 5);
        let friday = date(2026, 1, 9);
        assert_eq!(absence_days(&book, &none, 1, monday, friday, true, true), 4.0);
        assert_eq!(absence_days(&book, &none, 1, monday, friday, false, true), 4.5);
        assert_eq!(absence_days(&book, &none, 1, monday, monday, true, true), 0.5);
        // half day on a Saturday edge does not discount anything
        let saturday = date(2026, 1, 10);
        assert_eq!(absence_days(&book, &none, 1, friday, saturday, false, true), 1.0);
        assert_eq!(absence_days(&book, &none, 1, saturday, saturday, true, false), 0.0);
    }

    #[test]
    fn absence_spanning_new_year_is_split() {
        let (schedules, assignments) = weekdays();
        let book = ScheduleBook::new(&schedules, &assignments);
        let holidays = christmas();

        let mut trip = absence(1, 1, date(2025, 12, 29), date(2026, 1, 7));
        trip.half_day_start = true;
        trip.half_day_end = true;

        // Dec 29-31: 3 days minus the half start
        assert_eq!(days_in_year(&book, &holidays, &trip, 2025), 2.5);
        // Jan 2, 5, 6, 7 minus the half end
        assert_eq!(days_in_year(&book, &holidays, &trip, 2026), 3.5);
        assert_eq!(days_in_year(&book, &holidays, &trip, 2027), 0.0);
    }

    #[test]
    fn rebuild_splits_used_and_pending() {
        let (schedules, assignments) = weekdays();
        let book = ScheduleBook::new(&schedules, &assignments);
        let none = HolidayCalendar::default();

        let approved = absence(1, 1, date(2026, 3, 2), date(2026, 3, 6));
        let mut pending = absence(2, 1, date(2026, 4, 6), date(2026, 4, 7));
        pending.status = AbsenceStatus::Pending;
        let mut rejected = absence(3, 1, date(2026, 5, 4), date(2026, 5, 8));
        rejected.status = AbsenceStatus::Rejected;
        let mut sick = absence(4, 1, date(2026, 6, 1), date(2026, 6, 2));
        sick.absence_type = AbsenceType::SickLeave;
        let other_employee = absence(5, 2, date(2026, 3, 2), date(2026, 3, 6));

        let absences = vec![approved, pending, rejected, sick, other_employee];
        let balance = rebuild_balance(
            &book,
            &none,
            BalanceInput {
                employee_id: 1,
                year: 2026,
                allotted_days: 22.0,
                carried_over_days: 3.0,
                absences: &absences,
            },
        );

        assert_eq!(balance.used_days, 5.0);
        assert_eq!(balance.pending_days, 2.0);
        assert_eq!(balance.available(), 18.0);
    }

    #[test]
    fn carry_over_is_capped_and_never_negative() {
        let policy = VacationPolicy {
            annual_days: 22.0,
            max_carry_over_days: 5.0,
        };
        let mut previous = VacationBalance {
            employee_id: 1,
            year: 2025,
            allotted_days: 22.0,
            carried_over_days: 0.0,
            used_days: 20.0,
            pending_days: 0.0,
        };
        assert_eq!(carry_over(&previous, &policy), 2.0);

        previous.used_days = 10.0;
        assert_eq!(carry_over(&previous, &policy), 5.0);

        previous.used_days = 25.0;
        assert_eq!(carry_over(&previous, &policy), 0.0);
    }

    #[test]
    fn allotment_is_prorated_in_hiring_year() {
        let policy = VacationPolicy::default();
        assert_eq!(allotment_for_year(&policy, 2026, date(2020, 5, 1)), 22.0);
        assert_eq!(allotment_for_year(&policy, 2026, date(2027, 1, 1)), 0.0);
        // hired in July: 6 of 12 months
        assert_eq!(allotment_for_year(&policy, 2026, date(2026, 7, 15)), 11.0);
        // hired in October: 22 * 3 / 12 = 5.5
        assert_eq!(allotment_for_year(&policy, 2026, date(2026, 10, 1)), 5.5);
    }
}
