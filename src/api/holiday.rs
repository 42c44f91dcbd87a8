use crate::{auth::auth::AuthUser, model::holiday::Holiday, utils::db_utils::is_duplicate};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateHoliday {
    #[schema(example = "2026-12-25", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "Christmas Day")]
    pub name: String,
}

#[derive(Deserialize, IntoParams)]
pub struct HolidayQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
}

#[utoipa::path(
    post,
    path = "/api/holidays",
    request_body = CreateHoliday,
    responses(
        (status = 201, description = "Holiday created", body = Holiday),
        (status = 403, description = "HR/Admin only"),
        (status = 409, description = "A holiday already exists on that date")
    ),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn create_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateHoliday>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({"message": "name is required"})));
    }

    let result = sqlx::query("INSERT INTO holidays (company_id, date, name) VALUES (?, ?, ?)")
        .bind(auth.company_id)
        .bind(payload.date)
        .bind(name)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(r) => {
            info!(date = %payload.date, "Holiday created");
            Ok(HttpResponse::Created().json(Holiday {
                id: r.last_insert_id(),
                date: payload.date,
                name: name.to_string(),
            }))
        }
        Err(e) if is_duplicate(&e) => Ok(HttpResponse::Conflict().json(json!({
            "message": "A holiday already exists on that date"
        }))),
        Err(e) => {
            error!(error = %e, "Failed to create holiday");
            Err(actix_web::error::ErrorInternalServerError("Internal Server Error"))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/holidays",
    params(HolidayQuery),
    responses((status = 200, description = "Holidays of the year", body = [Holiday])),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn list_holidays(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<HolidayQuery>,
) -> actix_web::Result<impl Responder> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let (Some(first), Some(last)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return Ok(HttpResponse::BadRequest().json(json!({"message": "Invalid year"})));
    };

    let holidays = sqlx::query_as::<_, Holiday>(
        r#"
        SELECT id, date, name
        FROM holidays
        WHERE company_id = ? AND date BETWEEN ? AND ?
        ORDER BY date
        "#,
    )
    .bind(auth.company_id)
    .bind(first)
    .bind(last)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, year, "Failed to fetch holidays");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(holidays))
}

#[utoipa::path(
    delete,
    path = "/api/holidays/{holiday_id}",
    params(("holiday_id" = u64, Path, description = "Holiday ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Holiday not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn delete_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let holiday_id = path.into_inner();

    let result = sqlx::query("DELETE FROM holidays WHERE id = ? AND company_id = ?")
        .bind(holiday_id)
        .bind(auth.company_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, holiday_id, "Failed to delete holiday");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({"message": "Holiday not found"})));
    }

    Ok(HttpResponse::Ok().json(json!({"message": "Holiday deleted"})))
}
