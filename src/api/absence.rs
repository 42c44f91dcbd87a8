use crate::{
    api::vacation::{compute_balance, recalculate_balance},
    auth::auth::AuthUser,
    model::absence::{Absence, AbsenceRow, AbsenceStatus, AbsenceType},
    reporting::{
        loader::load_calendar,
        schedule::{HolidayCalendar, ScheduleBook},
        vacation::{absence_days, days_in_year},
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateAbsence {
    /// HR/Admin may file for any employee; defaults to the caller
    #[schema(example = 1000, nullable = true)]
    pub employee_id: Option<u64>,
    #[schema(example = "vacation")]
    pub absence_type: AbsenceType,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-06", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    /// Only the afternoon of the first day is taken
    #[serde(default)]
    pub half_day_start: bool,
    /// Only the morning of the last day is taken
    #[serde(default)]
    pub half_day_end: bool,
    #[schema(example = "Family trip", nullable = true)]
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct AbsenceFilter {
    /// Filter by employee ID (HR/Admin only)
    pub employee_id: Option<u64>,
    /// pending | approved | rejected
    pub status: Option<String>,
    /// vacation | sick_leave | personal | unpaid | other
    pub absence_type: Option<String>,
    /// Absences ending on or after this date
    pub from: Option<NaiveDate>,
    /// Absences starting on or before this date
    pub to: Option<NaiveDate>,
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct AbsenceListResponse {
    pub data: Vec<Absence>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

// typed binding for dynamic filters
enum FilterValue {
    U64(u64),
    Str(String),
    Date(NaiveDate),
}

const SELECT_ABSENCE: &str = r#"
    SELECT id, employee_id, absence_type, start_date, end_date,
           half_day_start, half_day_end, status, days, reason, created_at
    FROM absences
"#;

fn internal(e: impl std::fmt::Display, context: &'static str) -> actix_web::Error {
    tracing::error!(error = %e, "{}", context);
    actix_web::error::ErrorInternalServerError("Internal Server Error")
}

fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({ "message": message.into() }))
}

fn years_of(absence: &Absence) -> std::ops::RangeInclusive<i32> {
    absence.start_date.year()..=absence.end_date.year()
}

async fn fetch_absence(
    pool: &MySqlPool,
    company_id: u64,
    absence_id: u64,
) -> actix_web::Result<Option<Absence>> {
    let sql = format!("{} WHERE id = ? AND company_id = ?", SELECT_ABSENCE);
    let row = sqlx::query_as::<_, AbsenceRow>(&sql)
        .bind(absence_id)
        .bind(company_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| internal(e, "Failed to fetch absence"))?;

    row.map(Absence::try_from)
        .transpose()
        .map_err(|e| internal(e, "Stored absence has an unknown type or status"))
}

/// Keep every touched year's vacation balance in step with the absences.
async fn refresh_balances(pool: &MySqlPool, company_id: u64, absence: &Absence) -> actix_web::Result<()> {
    if !absence.absence_type.uses_vacation_balance() {
        return Ok(());
    }
    for year in years_of(absence) {
        recalculate_balance(pool, company_id, absence.employee_id, year)
            .await
            .map_err(|e| internal(e, "Failed to recalculate vacation balance"))?;
    }
    Ok(())
}

/// Request an absence. It starts out pending.
#[utoipa::path(
    post,
    path = "/api/absences",
    request_body(
        content = CreateAbsence,
        description = "Absence request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Absence requested", body = Object, example = json!({
            "message": "Absence requested", "id": 7, "days": 4.5, "status": "pending"
        })),
        (status = 400, description = "Invalid dates, overlap, no working days or insufficient balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Absence"
)]
pub async fn create_absence(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateAbsence>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.target_employee(payload.employee_id)?;
    let pool = pool.get_ref();

    if payload.start_date > payload.end_date {
        return Ok(bad_request("start_date cannot be after end_date"));
    }
    if payload.reason.as_ref().is_some_and(|r| r.chars().count() > 255) {
        return Ok(bad_request("reason is limited to 255 characters"));
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| internal(e, "Failed to open transaction"))?;

    // row lock serialises concurrent requests for one employee
    let locked: Option<u64> = sqlx::query_scalar(
        "SELECT id FROM employees WHERE id = ? AND company_id = ? FOR UPDATE",
    )
    .bind(employee_id)
    .bind(auth.company_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| internal(e, "Failed to lock employee"))?;

    if locked.is_none() {
        return Ok(HttpResponse::NotFound().json(json!({"message": "Employee not found"})));
    }

    let overlapping: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM absences
        WHERE company_id = ? AND employee_id = ?
          AND status <> 'rejected'
          AND start_date <= ? AND end_date >= ?
        "#,
    )
    .bind(auth.company_id)
    .bind(employee_id)
    .bind(payload.end_date)
    .bind(payload.start_date)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| internal(e, "Failed to check overlapping absences"))?;

    if overlapping > 0 {
        return Ok(bad_request("Absence overlaps an existing request"));
    }

    let calendar = load_calendar(
        pool,
        auth.company_id,
        Some(employee_id),
        payload.start_date,
        payload.end_date,
    )
    .await
    .map_err(|e| internal(e, "Failed to load working calendar"))?;
    let book = ScheduleBook::new(&calendar.schedules, &calendar.assignments);
    let holidays = HolidayCalendar::new(&calendar.holidays);

    let days = absence_days(
        &book,
        &holidays,
        employee_id,
        payload.start_date,
        payload.end_date,
        payload.half_day_start,
        payload.half_day_end,
    );
    if days <= 0.0 {
        return Ok(bad_request("Absence contains no working days"));
    }

    let requested = Absence {
        id: 0,
        employee_id,
        absence_type: payload.absence_type,
        start_date: payload.start_date,
        end_date: payload.end_date,
        half_day_start: payload.half_day_start,
        half_day_end: payload.half_day_end,
        status: AbsenceStatus::Pending,
        days,
        reason: payload.reason.clone(),
        created_at: Utc::now(),
    };

    if requested.absence_type.uses_vacation_balance() {
        for year in years_of(&requested) {
            // read-only: storing a balance here would wait on the employee lock
            let balance = compute_balance(pool, auth.company_id, employee_id, year)
                .await
                .map_err(|e| internal(e, "Failed to compute vacation balance"))?;
            let needed = days_in_year(&book, &holidays, &requested, year);
            if needed > balance.available() {
                warn!(employee_id, year, needed, available = balance.available(), "Vacation balance exceeded");
                return Ok(bad_request(format!(
                    "Insufficient vacation balance for {}: {} requested, {} available",
                    year,
                    needed,
                    balance.available()
                )));
            }
        }
    }

    let result = sqlx::query(
        r#"
        INSERT INTO absences
            (company_id, employee_id, absence_type, start_date, end_date,
             half_day_start, half_day_end, status, days, reason)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.company_id)
    .bind(employee_id)
    .bind(requested.absence_type.as_ref())
    .bind(requested.start_date)
    .bind(requested.end_date)
    .bind(requested.half_day_start)
    .bind(requested.half_day_end)
    .bind(requested.status.as_ref())
    .bind(requested.days)
    .bind(&requested.reason)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, employee_id, "Failed to create absence");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    tx.commit()
        .await
        .map_err(|e| internal(e, "Failed to commit absence"))?;

    refresh_balances(pool, auth.company_id, &requested).await?;

    info!(absence_id = result.last_insert_id(), employee_id, days, "Absence requested");

    Ok(HttpResponse::Created().json(json!({
        "message": "Absence requested",
        "id": result.last_insert_id(),
        "days": days,
        "status": AbsenceStatus::Pending
    })))
}

#[utoipa::path(
    get,
    path = "/api/absences",
    params(AbsenceFilter),
    responses(
        (status = 200, description = "Paginated absence list", body = AbsenceListResponse),
        (status = 400, description = "Unknown status or type filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Absence"
)]
pub async fn list_absences(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AbsenceFilter>,
) -> actix_web::Result<impl Responder> {
    let employee_filter = auth.scope_filter(query.employee_id)?;

    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE company_id = ?");
    let mut args: Vec<FilterValue> = vec![FilterValue::U64(auth.company_id)];

    if let Some(emp_id) = employee_filter {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(emp_id));
    }

    if let Some(status) = query.status.as_deref() {
        let Ok(status) = status.parse::<AbsenceStatus>() else {
            return Ok(bad_request("Unknown status"));
        };
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status.to_string()));
    }

    if let Some(kind) = query.absence_type.as_deref() {
        let Ok(kind) = kind.parse::<AbsenceType>() else {
            return Ok(bad_request("Unknown absence type"));
        };
        where_sql.push_str(" AND absence_type = ?");
        args.push(FilterValue::Str(kind.to_string()));
    }

    if let Some(from) = query.from {
        where_sql.push_str(" AND end_date >= ?");
        args.push(FilterValue::Date(from));
    }

    if let Some(to) = query.to {
        where_sql.push_str(" AND start_date <= ?");
        args.push(FilterValue::Date(to));
    }

    let count_sql = format!("SELECT COUNT(*) FROM absences{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(s.as_str()),
            FilterValue::Date(d) => count_q.bind(*d),
        };
    }

    let total = count_q
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| internal(e, "Failed to count absences"))?;

    let data_sql = format!(
        "{}{} ORDER BY start_date DESC, id DESC LIMIT ? OFFSET ?",
        SELECT_ABSENCE, where_sql
    );

    let mut data_q = sqlx::query_as::<_, AbsenceRow>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
            FilterValue::Date(d) => data_q.bind(d),
        };
    }

    let data = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| internal(e, "Failed to fetch absence list"))?
        .into_iter()
        .map(Absence::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| internal(e, "Stored absence has an unknown type or status"))?;

    Ok(HttpResponse::Ok().json(AbsenceListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/absences/{absence_id}",
    params(
        ("absence_id" = u64, Path, description = "ID of the absence to fetch")
    ),
    responses(
        (status = 200, description = "Absence found", body = Absence),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Absence not found", body = Object, example = json!({
            "message": "Absence not found"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Absence"
)]
pub async fn get_absence(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let absence = fetch_absence(pool.get_ref(), auth.company_id, path.into_inner()).await?;

    match absence {
        // other employees' absences are reported as missing
        Some(a) if auth.is_hr_or_admin() || auth.employee_id == Some(a.employee_id) => {
            Ok(HttpResponse::Ok().json(a))
        }
        _ => Ok(HttpResponse::NotFound().json(json!({
            "message": "Absence not found"
        }))),
    }
}

/// Move a pending absence to `status` and rebuild the affected balances.
async fn decide(
    auth: &AuthUser,
    pool: &MySqlPool,
    absence_id: u64,
    status: AbsenceStatus,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let Some(absence) = fetch_absence(pool, auth.company_id, absence_id).await? else {
        return Ok(HttpResponse::NotFound().json(json!({"message": "Absence not found"})));
    };

    let result = sqlx::query(
        r#"
        UPDATE absences
        SET status = ?
        WHERE id = ? AND company_id = ? AND status = 'pending'
        "#,
    )
    .bind(status.as_ref())
    .bind(absence_id)
    .bind(auth.company_id)
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, absence_id, "Absence status update failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(bad_request("Absence already processed"));
    }

    refresh_balances(pool, auth.company_id, &absence).await?;

    info!(absence_id, status = %status, decided_by = auth.user_id, "Absence decided");

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Absence {}", status),
        "status": status
    })))
}

#[utoipa::path(
    put,
    path = "/api/absences/{absence_id}/approve",
    params(
        ("absence_id" = u64, Path, description = "ID of the absence to approve")
    ),
    responses(
        (status = 200, description = "Absence approved", body = Object, example = json!({
            "message": "Absence approved", "status": "approved"
        })),
        (status = 400, description = "Absence already processed"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Absence not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Absence"
)]
pub async fn approve_absence(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    decide(&auth, pool.get_ref(), path.into_inner(), AbsenceStatus::Approved).await
}

#[utoipa::path(
    put,
    path = "/api/absences/{absence_id}/reject",
    params(
        ("absence_id" = u64, Path, description = "ID of the absence to reject")
    ),
    responses(
        (status = 200, description = "Absence rejected", body = Object, example = json!({
            "message": "Absence rejected", "status": "rejected"
        })),
        (status = 400, description = "Absence already processed"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Absence not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Absence"
)]
pub async fn reject_absence(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    decide(&auth, pool.get_ref(), path.into_inner(), AbsenceStatus::Rejected).await
}

/// Withdraw one of the caller's own pending absences.
#[utoipa::path(
    delete,
    path = "/api/absences/{absence_id}",
    params(
        ("absence_id" = u64, Path, description = "ID of the absence to cancel")
    ),
    responses(
        (status = 200, description = "Absence cancelled", body = Object, example = json!({
            "message": "Absence cancelled"
        })),
        (status = 400, description = "Only pending absences can be cancelled"),
        (status = 404, description = "Absence not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Absence"
)]
pub async fn cancel_absence(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let absence_id = path.into_inner();
    let pool = pool.get_ref();

    let absence = match fetch_absence(pool, auth.company_id, absence_id).await? {
        Some(a) if auth.employee_id == Some(a.employee_id) => a,
        _ => return Ok(HttpResponse::NotFound().json(json!({"message": "Absence not found"}))),
    };

    let result = sqlx::query(
        "DELETE FROM absences WHERE id = ? AND company_id = ? AND status = 'pending'",
    )
    .bind(absence_id)
    .bind(auth.company_id)
    .execute(pool)
    .await
    .map_err(|e| internal(e, "Failed to cancel absence"))?;

    if result.rows_affected() == 0 {
        return Ok(bad_request("Only pending absences can be cancelled"));
    }

    refresh_balances(pool, auth.company_id, &absence).await?;

    info!(absence_id, employee_id = absence.employee_id, "Absence cancelled");

    Ok(HttpResponse::Ok().json(json!({"message": "Absence cancelled"})))
}
