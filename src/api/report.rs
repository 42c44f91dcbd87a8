use crate::{
    auth::auth::AuthUser,
    config::Config,
    reporting::{DateRange, ReportError, ReportKind, generate, loader::load_dataset},
    utils::company_cache,
};
use actix_web::{HttpResponse, Responder, ResponseError, http::StatusCode, web};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::IntoParams;

impl ResponseError for ReportError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "message": self.to_string() }))
    }
}

#[derive(Deserialize, IntoParams)]
pub struct ReportQuery {
    /// First local date, inclusive
    pub from: NaiveDate,
    /// Last local date, inclusive
    pub to: NaiveDate,
    /// Restrict to one employee (employees are always restricted to themselves)
    pub employee_id: Option<u64>,
}

/// Generate a report over a date range in the company's local time.
#[utoipa::path(
    get,
    path = "/api/reports/{kind}",
    params(
        ("kind" = String, Path, description = "time | attendance | summary | monthly | breaks | delays"),
        ReportQuery
    ),
    responses(
        (status = 200, description = "Report body; shape depends on kind", body = Object),
        (status = 400, description = "Inverted or too long range", body = Object, example = json!({
            "message": "report range spans 400 days, the limit is 366"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employees may only report on themselves"),
        (status = 404, description = "Unknown report kind or employee")
    ),
    security(("bearer_auth" = [])),
    tag = "Report"
)]
pub async fn get_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<String>,
    query: web::Query<ReportQuery>,
) -> actix_web::Result<impl Responder> {
    let Ok(kind) = path.parse::<ReportKind>() else {
        return Ok(HttpResponse::NotFound().json(json!({"message": "Unknown report kind"})));
    };

    let range = DateRange::new(query.from, query.to, config.report_max_days)?;
    let employee_filter = auth.scope_filter(query.employee_id)?;

    let company = match company_cache::get_company(pool.get_ref(), auth.company_id).await {
        Ok(Some(company)) => company,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(json!({"message": "Company not found"})));
        }
        Err(e) => {
            error!(error = %e, company_id = auth.company_id, "Failed to fetch company");
            return Err(actix_web::error::ErrorInternalServerError("Internal Server Error"));
        }
    };

    let dataset = load_dataset(
        pool.get_ref(),
        company,
        range,
        employee_filter,
        Utc::now().naive_utc(),
    )
    .await
    .map_err(|e| {
        error!(error = %e, company_id = auth.company_id, kind = %kind, "Failed to load report data");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if employee_filter.is_some() && dataset.employees.is_empty() {
        return Ok(HttpResponse::NotFound().json(json!({"message": "Employee not found"})));
    }

    let report = generate(kind, &dataset);

    info!(
        company_id = auth.company_id,
        kind = %kind,
        days = range.len_days(),
        employees = dataset.employees.len(),
        "Report generated"
    );

    Ok(HttpResponse::Ok().json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fixtures::*;
    use crate::auth::middleware::auth_middleware;
    use actix_web::{App, middleware::from_fn, test};

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(lazy_pool()))
                    .app_data(web::Data::new(Config::for_tests()))
                    .service(
                        web::scope("/api")
                            .wrap(from_fn(auth_middleware))
                            .route("/reports/{kind}", web::get().to(get_report)),
                    ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn missing_token_is_unauthorized() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/reports/time?from=2026-01-01&to=2026-01-31")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn unknown_kind_is_not_found() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/reports/payroll?from=2026-01-01&to=2026-01-31")
            .insert_header(("Authorization", bearer(ADMIN, None)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn inverted_and_oversized_ranges_are_bad_requests() {
        let app = app!();

        let req = test::TestRequest::get()
            .uri("/api/reports/delays?from=2026-02-01&to=2026-01-01")
            .insert_header(("Authorization", bearer(ADMIN, None)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // test config caps ranges at 31 days
        let req = test::TestRequest::get()
            .uri("/api/reports/delays?from=2026-01-01&to=2026-03-01")
            .insert_header(("Authorization", bearer(ADMIN, None)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["message"].as_str().unwrap().contains("limit is 31"));
    }

    #[actix_web::test]
    async fn employees_cannot_report_on_colleagues() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/reports/time?from=2026-01-01&to=2026-01-31&employee_id=99")
            .insert_header(("Authorization", bearer(EMPLOYEE, Some(10))))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
