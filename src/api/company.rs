use crate::{auth::auth::AuthUser, model::company::Company, utils::company_cache};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

/// UTC-12:00 .. UTC+14:00
const OFFSET_RANGE: std::ops::RangeInclusive<i32> = -720..=840;
const MAX_GRACE_MINUTES: u32 = 240;
const MAX_EARLY_MINUTES: u32 = 720;

#[derive(Deserialize, ToSchema, Default)]
pub struct UpdateCompany {
    #[schema(example = "Acme Logistics", nullable = true)]
    pub name: Option<String>,
    #[schema(example = 60, nullable = true)]
    pub utc_offset_minutes: Option<i32>,
    #[schema(example = 5, nullable = true)]
    pub delay_grace_minutes: Option<u32>,
    #[schema(example = 120, nullable = true)]
    pub early_checkin_minutes: Option<u32>,
}

impl UpdateCompany {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err("name cannot be empty".into());
        }
        if let Some(offset) = self.utc_offset_minutes {
            if !OFFSET_RANGE.contains(&offset) {
                return Err(format!(
                    "utc_offset_minutes must be between {} and {}",
                    OFFSET_RANGE.start(),
                    OFFSET_RANGE.end()
                ));
            }
        }
        if self.delay_grace_minutes.is_some_and(|m| m > MAX_GRACE_MINUTES) {
            return Err(format!("delay_grace_minutes cannot exceed {MAX_GRACE_MINUTES}"));
        }
        if self.early_checkin_minutes.is_some_and(|m| m > MAX_EARLY_MINUTES) {
            return Err(format!("early_checkin_minutes cannot exceed {MAX_EARLY_MINUTES}"));
        }
        Ok(())
    }
}

async fn current(pool: &MySqlPool, company_id: u64) -> actix_web::Result<HttpResponse> {
    match company_cache::get_company(pool, company_id).await {
        Ok(Some(company)) => Ok(HttpResponse::Ok().json(company)),
        Ok(None) => Ok(HttpResponse::NotFound().json(json!({"message": "Company not found"}))),
        Err(e) => {
            error!(error = %e, company_id, "Failed to fetch company");
            Err(actix_web::error::ErrorInternalServerError("Internal Server Error"))
        }
    }
}

/// The caller's company settings.
#[utoipa::path(
    get,
    path = "/api/company",
    responses(
        (status = 200, description = "Company settings", body = Company),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Company"
)]
pub async fn get_company(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    current(pool.get_ref(), auth.company_id).await
}

#[utoipa::path(
    put,
    path = "/api/company",
    request_body = UpdateCompany,
    responses(
        (status = 200, description = "Updated settings", body = Company),
        (status = 400, description = "Out-of-range value"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Company"
)]
pub async fn update_company(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<UpdateCompany>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    if let Err(message) = payload.validate() {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": message })));
    }

    sqlx::query(
        r#"
        UPDATE companies
        SET name = COALESCE(?, name),
            utc_offset_minutes = COALESCE(?, utc_offset_minutes),
            delay_grace_minutes = COALESCE(?, delay_grace_minutes),
            early_checkin_minutes = COALESCE(?, early_checkin_minutes)
        WHERE id = ?
        "#,
    )
    .bind(payload.name.as_deref().map(str::trim))
    .bind(payload.utc_offset_minutes)
    .bind(payload.delay_grace_minutes)
    .bind(payload.early_checkin_minutes)
    .bind(auth.company_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, company_id = auth.company_id, "Failed to update company");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    company_cache::invalidate(auth.company_id).await;
    info!(company_id = auth.company_id, "Company settings updated");

    current(pool.get_ref(), auth.company_id).await
}
