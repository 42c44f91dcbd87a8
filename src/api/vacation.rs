use crate::{
    auth::auth::AuthUser,
    model::vacation::{VacationBalance, VacationPolicy},
    reporting::{
        loader::{load_absences, load_calendar},
        schedule::{HolidayCalendar, ScheduleBook},
        vacation::{BalanceInput, allotment_for_year, carry_over, rebuild_balance},
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::IntoParams;

#[derive(Deserialize, IntoParams)]
pub struct BalanceQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
    /// HR/Admin only; employees always see their own balance
    pub employee_id: Option<u64>,
}

#[derive(Deserialize, IntoParams)]
pub struct RecalculateQuery {
    pub employee_id: u64,
    /// Defaults to the current year
    pub year: Option<i32>,
}

fn internal(e: impl std::fmt::Display, context: &'static str) -> actix_web::Error {
    tracing::error!(error = %e, "{}", context);
    actix_web::error::ErrorInternalServerError("Internal Server Error")
}

pub async fn load_policy(pool: &MySqlPool, company_id: u64) -> Result<VacationPolicy, sqlx::Error> {
    let policy = sqlx::query_as::<_, VacationPolicy>(
        "SELECT annual_days, max_carry_over_days FROM vacation_policies WHERE company_id = ?",
    )
    .bind(company_id)
    .fetch_optional(pool)
    .await?;

    Ok(policy.unwrap_or_default())
}

pub async fn load_balance(
    pool: &MySqlPool,
    employee_id: u64,
    year: i32,
) -> Result<Option<VacationBalance>, sqlx::Error> {
    sqlx::query_as::<_, VacationBalance>(
        r#"
        SELECT employee_id, year, allotted_days, carried_over_days, used_days, pending_days
        FROM vacation_balances
        WHERE employee_id = ? AND year = ?
        "#,
    )
    .bind(employee_id)
    .bind(year)
    .fetch_optional(pool)
    .await
}

/// Rebuild one employee's balance for `year` from the policy, the previous
/// year's stored balance and the year's vacation absences. Reads only.
///
/// Returns `RowNotFound` when the employee does not belong to the company.
pub async fn compute_balance(
    pool: &MySqlPool,
    company_id: u64,
    employee_id: u64,
    year: i32,
) -> Result<VacationBalance, sqlx::Error> {
    let (Some(first), Some(last)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return Err(sqlx::Error::Protocol(format!("year {year} out of range")));
    };

    let hire_date: NaiveDate =
        sqlx::query_scalar("SELECT hire_date FROM employees WHERE id = ? AND company_id = ?")
            .bind(employee_id)
            .bind(company_id)
            .fetch_optional(pool)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

    let policy = load_policy(pool, company_id).await?;

    let carried_over_days = load_balance(pool, employee_id, year - 1)
        .await?
        .map(|previous| carry_over(&previous, &policy))
        .unwrap_or(0.0);

    let calendar = load_calendar(pool, company_id, Some(employee_id), first, last).await?;
    let absences = load_absences(pool, company_id, Some(employee_id), first, last).await?;

    let book = ScheduleBook::new(&calendar.schedules, &calendar.assignments);
    let holidays = HolidayCalendar::new(&calendar.holidays);

    Ok(rebuild_balance(
        &book,
        &holidays,
        BalanceInput {
            employee_id,
            year,
            allotted_days: allotment_for_year(&policy, year, hire_date),
            carried_over_days,
            absences: &absences,
        },
    ))
}

/// [`compute_balance`], then store the result.
pub async fn recalculate_balance(
    pool: &MySqlPool,
    company_id: u64,
    employee_id: u64,
    year: i32,
) -> Result<VacationBalance, sqlx::Error> {
    let balance = compute_balance(pool, company_id, employee_id, year).await?;

    sqlx::query(
        r#"
        INSERT INTO vacation_balances
            (company_id, employee_id, year, allotted_days, carried_over_days, used_days, pending_days)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            allotted_days = VALUES(allotted_days),
            carried_over_days = VALUES(carried_over_days),
            used_days = VALUES(used_days),
            pending_days = VALUES(pending_days)
        "#,
    )
    .bind(company_id)
    .bind(balance.employee_id)
    .bind(balance.year)
    .bind(balance.allotted_days)
    .bind(balance.carried_over_days)
    .bind(balance.used_days)
    .bind(balance.pending_days)
    .execute(pool)
    .await?;

    info!(
        employee_id,
        year,
        used = balance.used_days,
        pending = balance.pending_days,
        "Vacation balance recalculated"
    );

    Ok(balance)
}

#[utoipa::path(
    get,
    path = "/api/vacation/policy",
    responses(
        (status = 200, description = "Company vacation policy (defaults when unset)", body = VacationPolicy),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Vacation"
)]
pub async fn get_policy(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let policy = load_policy(pool.get_ref(), auth.company_id)
        .await
        .map_err(|e| internal(e, "Failed to fetch vacation policy"))?;

    Ok(HttpResponse::Ok().json(policy))
}

#[utoipa::path(
    put,
    path = "/api/vacation/policy",
    request_body = VacationPolicy,
    responses(
        (status = 200, description = "Policy stored", body = VacationPolicy),
        (status = 400, description = "Negative or fractional-below-half values"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Vacation"
)]
pub async fn put_policy(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<VacationPolicy>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let policy = payload.into_inner();

    let valid = |v: f64| v.is_finite() && v >= 0.0 && v <= 366.0;
    if !valid(policy.annual_days) || !valid(policy.max_carry_over_days) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Days must be between 0 and 366"
        })));
    }

    sqlx::query(
        r#"
        INSERT INTO vacation_policies (company_id, annual_days, max_carry_over_days)
        VALUES (?, ?, ?)
        ON DUPLICATE KEY UPDATE
            annual_days = VALUES(annual_days),
            max_carry_over_days = VALUES(max_carry_over_days)
        "#,
    )
    .bind(auth.company_id)
    .bind(policy.annual_days)
    .bind(policy.max_carry_over_days)
    .execute(pool.get_ref())
    .await
    .map_err(|e| internal(e, "Failed to store vacation policy"))?;

    info!(company_id = auth.company_id, "Vacation policy updated");

    Ok(HttpResponse::Ok().json(policy))
}

/// Stored balances for a year. Employees only see their own.
#[utoipa::path(
    get,
    path = "/api/vacation/balances",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Balances", body = [VacationBalance]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Vacation"
)]
pub async fn list_balances(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<BalanceQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_filter = auth.scope_filter(query.employee_id)?;
    let year = query.year.unwrap_or_else(|| Utc::now().year());

    let mut sql = String::from(
        r#"
        SELECT employee_id, year, allotted_days, carried_over_days, used_days, pending_days
        FROM vacation_balances
        WHERE company_id = ? AND year = ?
        "#,
    );
    if employee_filter.is_some() {
        sql.push_str(" AND employee_id = ?");
    }
    sql.push_str(" ORDER BY employee_id");

    let mut q = sqlx::query_as::<_, VacationBalance>(&sql)
        .bind(auth.company_id)
        .bind(year);
    if let Some(id) = employee_filter {
        q = q.bind(id);
    }

    let balances = q
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| internal(e, "Failed to fetch vacation balances"))?;

    Ok(HttpResponse::Ok().json(balances))
}

#[utoipa::path(
    post,
    path = "/api/vacation/balances/recalculate",
    params(RecalculateQuery),
    responses(
        (status = 200, description = "Rebuilt balance", body = VacationBalance),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Vacation"
)]
pub async fn recalculate(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<RecalculateQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let year = query.year.unwrap_or_else(|| Utc::now().year());

    match recalculate_balance(pool.get_ref(), auth.company_id, query.employee_id, year).await {
        Ok(balance) => Ok(HttpResponse::Ok().json(balance)),
        Err(sqlx::Error::RowNotFound) => Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        }))),
        Err(e) => {
            error!(error = %e, employee_id = query.employee_id, year, "Vacation recalculation failed");
            Err(actix_web::error::ErrorInternalServerError("Internal Server Error"))
        }
    }
}
