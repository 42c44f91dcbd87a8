use crate::{auth::auth::AuthUser, model::break_type::BreakType};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateBreakType {
    #[schema(example = "Lunch")]
    pub name: String,
    #[serde(default)]
    #[schema(example = false)]
    pub paid: bool,
    #[schema(example = 60, nullable = true)]
    pub max_minutes: Option<u32>,
}

#[utoipa::path(
    post,
    path = "/api/break-types",
    request_body = CreateBreakType,
    responses(
        (status = 201, description = "Break type created", body = BreakType),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Break type"
)]
pub async fn create_break_type(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateBreakType>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let name = payload.name.trim();
    if name.is_empty() || payload.max_minutes == Some(0) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "name is required and max_minutes must be positive"
        })));
    }

    let result = sqlx::query(
        "INSERT INTO break_types (company_id, name, paid, max_minutes) VALUES (?, ?, ?, ?)",
    )
    .bind(auth.company_id)
    .bind(name)
    .bind(payload.paid)
    .bind(payload.max_minutes)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create break type");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let break_type = BreakType {
        id: result.last_insert_id(),
        name: name.to_string(),
        paid: payload.paid,
        max_minutes: payload.max_minutes,
    };

    info!(break_type_id = break_type.id, "Break type created");

    Ok(HttpResponse::Created().json(break_type))
}

#[utoipa::path(
    get,
    path = "/api/break-types",
    responses((status = 200, description = "Company break types", body = [BreakType])),
    security(("bearer_auth" = [])),
    tag = "Break type"
)]
pub async fn list_break_types(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let types = sqlx::query_as::<_, BreakType>(
        "SELECT id, name, paid, max_minutes FROM break_types WHERE company_id = ? ORDER BY id",
    )
    .bind(auth.company_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch break types");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(types))
}
