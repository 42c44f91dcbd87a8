use crate::{
    api::employee::employee_exists,
    auth::auth::AuthUser,
    model::schedule::{ScheduleAssignment, WorkSchedule},
    reporting::schedule::monday_of,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateSchedule {
    #[schema(example = "Night shift")]
    pub name: String,
    #[schema(example = "22:00:00", value_type = String)]
    pub start_time: NaiveTime,
    /// At or before `start_time` means the shift ends the next day
    #[schema(example = "06:00:00", value_type = String)]
    pub end_time: NaiveTime,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateAssignment {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 1)]
    pub schedule_id: u64,
    /// 0 = Monday .. 6 = Sunday
    #[schema(example = 0)]
    pub weekday: u8,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub valid_from: NaiveDate,
    #[schema(example = "2026-12-31", value_type = String, format = "date", nullable = true)]
    pub valid_to: Option<NaiveDate>,
    /// Monday of the one week this assignment applies to
    #[schema(example = "2026-01-05", value_type = String, format = "date", nullable = true)]
    pub week_start: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams)]
pub struct AssignmentQuery {
    /// HR/Admin only; employees always see their own
    pub employee_id: Option<u64>,
}

fn internal(e: impl std::fmt::Display, context: &'static str) -> actix_web::Error {
    tracing::error!(error = %e, "{}", context);
    actix_web::error::ErrorInternalServerError("Internal Server Error")
}

/// Why an assignment payload cannot be stored.
pub fn validate_assignment(a: &CreateAssignment) -> Result<(), &'static str> {
    if a.weekday > 6 {
        return Err("weekday must be between 0 (Monday) and 6 (Sunday)");
    }
    if a.valid_to.is_some_and(|to| to < a.valid_from) {
        return Err("valid_to cannot be before valid_from");
    }
    if let Some(week) = a.week_start {
        if monday_of(week) != week {
            return Err("week_start must be a Monday");
        }
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/schedules",
    request_body = CreateSchedule,
    responses(
        (status = 201, description = "Schedule created", body = WorkSchedule),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn create_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateSchedule>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({"message": "name is required"})));
    }
    if payload.start_time == payload.end_time {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "start_time and end_time must differ"
        })));
    }

    let result = sqlx::query(
        "INSERT INTO work_schedules (company_id, name, start_time, end_time) VALUES (?, ?, ?, ?)",
    )
    .bind(auth.company_id)
    .bind(name)
    .bind(payload.start_time)
    .bind(payload.end_time)
    .execute(pool.get_ref())
    .await
    .map_err(|e| internal(e, "Failed to create schedule"))?;

    let schedule = WorkSchedule {
        id: result.last_insert_id(),
        name: name.to_string(),
        start_time: payload.start_time,
        end_time: payload.end_time,
    };

    info!(schedule_id = schedule.id, overnight = schedule.crosses_midnight(), "Schedule created");

    Ok(HttpResponse::Created().json(schedule))
}

#[utoipa::path(
    get,
    path = "/api/schedules",
    responses((status = 200, description = "Company schedules", body = [WorkSchedule])),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn list_schedules(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let schedules = sqlx::query_as::<_, WorkSchedule>(
        "SELECT id, name, start_time, end_time FROM work_schedules WHERE company_id = ? ORDER BY id",
    )
    .bind(auth.company_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| internal(e, "Failed to fetch schedules"))?;

    Ok(HttpResponse::Ok().json(schedules))
}

#[utoipa::path(
    post,
    path = "/api/schedules/assignments",
    request_body = CreateAssignment,
    responses(
        (status = 201, description = "Assignment created", body = ScheduleAssignment),
        (status = 400, description = "Invalid weekday, dates or week_start"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee or schedule not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn create_assignment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateAssignment>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if let Err(message) = validate_assignment(&payload) {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": message })));
    }

    if !employee_exists(pool.get_ref(), auth.company_id, payload.employee_id).await? {
        return Ok(HttpResponse::NotFound().json(json!({"message": "Employee not found"})));
    }

    let schedule_known: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM work_schedules WHERE id = ? AND company_id = ?")
            .bind(payload.schedule_id)
            .bind(auth.company_id)
            .fetch_one(pool.get_ref())
            .await
            .map_err(|e| internal(e, "Failed to check schedule"))?;
    if schedule_known == 0 {
        return Ok(HttpResponse::NotFound().json(json!({"message": "Schedule not found"})));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO schedule_assignments
            (company_id, employee_id, schedule_id, weekday, valid_from, valid_to, week_start)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.company_id)
    .bind(payload.employee_id)
    .bind(payload.schedule_id)
    .bind(payload.weekday)
    .bind(payload.valid_from)
    .bind(payload.valid_to)
    .bind(payload.week_start)
    .execute(pool.get_ref())
    .await
    .map_err(|e| internal(e, "Failed to create schedule assignment"))?;

    let assignment = ScheduleAssignment {
        id: result.last_insert_id(),
        employee_id: payload.employee_id,
        schedule_id: payload.schedule_id,
        weekday: payload.weekday,
        valid_from: payload.valid_from,
        valid_to: payload.valid_to,
        week_start: payload.week_start,
    };

    info!(
        assignment_id = assignment.id,
        employee_id = assignment.employee_id,
        weekday = assignment.weekday,
        "Schedule assigned"
    );

    Ok(HttpResponse::Created().json(assignment))
}

#[utoipa::path(
    get,
    path = "/api/schedules/assignments",
    params(AssignmentQuery),
    responses(
        (status = 200, description = "Assignments", body = [ScheduleAssignment]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn list_assignments(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AssignmentQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_filter = auth.scope_filter(query.employee_id)?;

    let mut sql = String::from(
        r#"
        SELECT id, employee_id, schedule_id, weekday, valid_from, valid_to, week_start
        FROM schedule_assignments
        WHERE company_id = ?
        "#,
    );
    if employee_filter.is_some() {
        sql.push_str(" AND employee_id = ?");
    }
    sql.push_str(" ORDER BY employee_id, weekday, valid_from");

    let mut q = sqlx::query_as::<_, ScheduleAssignment>(&sql).bind(auth.company_id);
    if let Some(id) = employee_filter {
        q = q.bind(id);
    }

    let assignments = q
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| internal(e, "Failed to fetch schedule assignments"))?;

    Ok(HttpResponse::Ok().json(assignments))
}

#[utoipa::path(
    delete,
    path = "/api/schedules/assignments/{assignment_id}",
    params(("assignment_id" = u64, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Deleted", body = Object, example = json!({
            "message": "Assignment deleted"
        })),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Assignment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn delete_assignment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let assignment_id = path.into_inner();

    let result = sqlx::query("DELETE FROM schedule_assignments WHERE id = ? AND company_id = ?")
        .bind(assignment_id)
        .bind(auth.company_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| internal(e, "Failed to delete schedule assignment"))?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({"message": "Assignment not found"})));
    }

    Ok(HttpResponse::Ok().json(json!({"message": "Assignment deleted"})))
}
