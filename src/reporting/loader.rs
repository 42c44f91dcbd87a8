//! Fetches the rows a report needs in one pass per table.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::MySqlPool;
use tracing::debug;

use super::{DateRange, ReportDataset};
use crate::model::{
    absence::{Absence, AbsenceRow},
    break_type::BreakType,
    clock_event::{ClockEvent, ClockEventRow},
    company::Company,
    employee::Employee,
    holiday::Holiday,
    schedule::{ScheduleAssignment, WorkSchedule},
};

/// Widened UTC window around a local date range: offsets reach ±14h and
/// overnight shifts spill into the following day.
const EVENT_MARGIN_DAYS: i64 = 2;

fn decode_error(e: strum::ParseError) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(e))
}

fn start_of(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Schedules, assignments and holidays for working-day calculations.
pub struct CalendarData {
    pub schedules: Vec<WorkSchedule>,
    pub assignments: Vec<ScheduleAssignment>,
    pub holidays: Vec<Holiday>,
}

pub async fn load_calendar(
    pool: &MySqlPool,
    company_id: u64,
    employee_id: Option<u64>,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<CalendarData, sqlx::Error> {
    let schedules = sqlx::query_as::<_, WorkSchedule>(
        r#"
        SELECT id, name, start_time, end_time
        FROM work_schedules
        WHERE company_id = ?
        "#,
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    let mut assignment_sql = String::from(
        r#"
        SELECT id, employee_id, schedule_id, weekday, valid_from, valid_to, week_start
        FROM schedule_assignments
        WHERE company_id = ?
        "#,
    );
    if employee_id.is_some() {
        assignment_sql.push_str(" AND employee_id = ?");
    }
    let mut assignment_q = sqlx::query_as::<_, ScheduleAssignment>(&assignment_sql).bind(company_id);
    if let Some(id) = employee_id {
        assignment_q = assignment_q.bind(id);
    }
    let assignments = assignment_q.fetch_all(pool).await?;

    let holidays = sqlx::query_as::<_, Holiday>(
        r#"
        SELECT id, date, name
        FROM holidays
        WHERE company_id = ? AND date BETWEEN ? AND ?
        ORDER BY date
        "#,
    )
    .bind(company_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(CalendarData {
        schedules,
        assignments,
        holidays,
    })
}

/// Absences of any status overlapping `[from, to]`.
pub async fn load_absences(
    pool: &MySqlPool,
    company_id: u64,
    employee_id: Option<u64>,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Absence>, sqlx::Error> {
    let mut sql = String::from(
        r#"
        SELECT id, employee_id, absence_type, start_date, end_date,
               half_day_start, half_day_end, status, days, reason, created_at
        FROM absences
        WHERE company_id = ? AND start_date <= ? AND end_date >= ?
        "#,
    );
    if employee_id.is_some() {
        sql.push_str(" AND employee_id = ?");
    }

    let mut q = sqlx::query_as::<_, AbsenceRow>(&sql)
        .bind(company_id)
        .bind(to)
        .bind(from);
    if let Some(id) = employee_id {
        q = q.bind(id);
    }

    q.fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| Absence::try_from(row).map_err(decode_error))
        .collect()
}

pub async fn load_dataset(
    pool: &MySqlPool,
    company: Company,
    range: DateRange,
    employee_id: Option<u64>,
    as_of: NaiveDateTime,
) -> Result<ReportDataset, sqlx::Error> {
    let company_id = company.id;

    // a filtered report may target an inactive employee
    let employee_sql = match employee_id {
        Some(_) => {
            r#"
            SELECT id, employee_code, first_name, last_name, email, hire_date, active
            FROM employees
            WHERE company_id = ? AND id = ?
            "#
        }
        None => {
            r#"
            SELECT id, employee_code, first_name, last_name, email, hire_date, active
            FROM employees
            WHERE company_id = ? AND active = TRUE
            ORDER BY id
            "#
        }
    };
    let mut employee_q = sqlx::query_as::<_, Employee>(employee_sql).bind(company_id);
    if let Some(id) = employee_id {
        employee_q = employee_q.bind(id);
    }
    let employees = employee_q.fetch_all(pool).await?;

    let window_from = start_of(range.from - Duration::days(EVENT_MARGIN_DAYS));
    let window_to = start_of(range.to + Duration::days(EVENT_MARGIN_DAYS + 1));

    let mut event_sql = String::from(
        r#"
        SELECT id, employee_id, kind, occurred_at, break_type_id
        FROM clock_events
        WHERE company_id = ? AND occurred_at >= ? AND occurred_at < ?
        "#,
    );
    if employee_id.is_some() {
        event_sql.push_str(" AND employee_id = ?");
    }
    event_sql.push_str(" ORDER BY employee_id, occurred_at, id");

    let mut event_q = sqlx::query_as::<_, ClockEventRow>(&event_sql)
        .bind(company_id)
        .bind(window_from)
        .bind(window_to);
    if let Some(id) = employee_id {
        event_q = event_q.bind(id);
    }
    let events = event_q
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| ClockEvent::try_from(row).map_err(decode_error))
        .collect::<Result<Vec<_>, _>>()?;

    let calendar = load_calendar(pool, company_id, employee_id, range.from, range.to).await?;

    let absences = load_absences(pool, company_id, employee_id, range.from, range.to).await?;

    let break_types = sqlx::query_as::<_, BreakType>(
        r#"
        SELECT id, name, paid, max_minutes
        FROM break_types
        WHERE company_id = ?
        ORDER BY id
        "#,
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    debug!(
        company_id,
        employees = employees.len(),
        events = events.len(),
        absences = absences.len(),
        "Report dataset loaded"
    );

    Ok(ReportDataset {
        company,
        range,
        as_of,
        employees,
        events,
        schedules: calendar.schedules,
        assignments: calendar.assignments,
        absences,
        holidays: calendar.holidays,
        break_types,
    })
}
