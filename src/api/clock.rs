use crate::auth::auth::AuthUser;
use crate::model::clock_event::{ClockEvent, ClockEventRow, EventKind};
use crate::reporting::timeline::check_transition;
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema, Default)]
pub struct BreakStartReq {
    #[schema(example = 1, nullable = true)]
    /// Break type, e.g. lunch or smoking break
    pub break_type_id: Option<u64>,
}

#[derive(Deserialize, IntoParams)]
pub struct EventQuery {
    /// Filter by employee (HR/Admin only)
    pub employee_id: Option<u64>,
    /// First UTC date, inclusive
    pub from: Option<NaiveDate>,
    /// Last UTC date, inclusive
    pub to: Option<NaiveDate>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct EventListResponse {
    pub data: Vec<ClockEvent>,
    pub page: u64,
    pub per_page: u64,
}

fn internal(e: impl std::fmt::Display, context: &'static str) -> actix_web::Error {
    tracing::error!(error = %e, "{}", context);
    actix_web::error::ErrorInternalServerError("Internal Server Error")
}

/// Validate against the latest event and append `kind` for the caller.
async fn record_event(
    auth: &AuthUser,
    pool: &MySqlPool,
    kind: EventKind,
    break_type_id: Option<u64>,
) -> actix_web::Result<HttpResponse> {
    let employee_id = auth.own_employee_id()?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| internal(e, "Failed to open transaction"))?;

    // row lock serialises concurrent clock requests for one employee
    let last: Option<String> = sqlx::query_scalar(
        r#"
        SELECT kind
        FROM clock_events
        WHERE employee_id = ?
        ORDER BY occurred_at DESC, id DESC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(employee_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| internal(e, "Failed to read last clock event"))?;

    let last = last
        .map(|k| k.parse::<EventKind>())
        .transpose()
        .map_err(|e| internal(e, "Stored clock event has an unknown kind"))?;

    if let Err(e) = check_transition(last, kind) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": e.to_string()
        })));
    }

    if let Some(type_id) = break_type_id {
        let known: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM break_types WHERE id = ? AND company_id = ?",
        )
        .bind(type_id)
        .bind(auth.company_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| internal(e, "Failed to check break type"))?;

        if known == 0 {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Unknown break type"
            })));
        }
    }

    let occurred_at = Utc::now().naive_utc();

    sqlx::query(
        r#"
        INSERT INTO clock_events (company_id, employee_id, kind, occurred_at, break_type_id)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.company_id)
    .bind(employee_id)
    .bind(kind.as_ref())
    .bind(occurred_at)
    .bind(break_type_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, employee_id, kind = %kind, "Clock event insert failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    tx.commit()
        .await
        .map_err(|e| internal(e, "Failed to commit clock event"))?;

    tracing::info!(employee_id, kind = %kind, "Clock event recorded");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Recorded",
        "kind": kind,
        "occurred_at": occurred_at,
    })))
}

/// Clock-in endpoint
#[utoipa::path(
    post,
    path = "/api/clock/in",
    responses(
        (status = 200, description = "Clocked in", body = Object, example = json!({
            "message": "Recorded", "kind": "clock_in", "occurred_at": "2026-01-05T08:01:12"
        })),
        (status = 400, description = "Already clocked in", body = Object, example = json!({
            "message": "Already clocked in"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Clock"
)]
pub async fn clock_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    record_event(&auth, pool.get_ref(), EventKind::ClockIn, None).await
}

/// Clock-out endpoint
#[utoipa::path(
    post,
    path = "/api/clock/out",
    responses(
        (status = 200, description = "Clocked out", body = Object),
        (status = 400, description = "Not clocked in or on a break", body = Object, example = json!({
            "message": "Not clocked in"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Clock"
)]
pub async fn clock_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    record_event(&auth, pool.get_ref(), EventKind::ClockOut, None).await
}

#[utoipa::path(
    post,
    path = "/api/clock/break-start",
    request_body(content = BreakStartReq, description = "Optional break type"),
    responses(
        (status = 200, description = "Break started", body = Object),
        (status = 400, description = "Not clocked in, already on a break or unknown break type"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Clock"
)]
pub async fn break_start(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: Option<web::Json<BreakStartReq>>,
) -> actix_web::Result<impl Responder> {
    let break_type_id = payload.and_then(|p| p.into_inner().break_type_id);
    record_event(&auth, pool.get_ref(), EventKind::BreakStart, break_type_id).await
}

#[utoipa::path(
    post,
    path = "/api/clock/break-end",
    responses(
        (status = 200, description = "Break ended", body = Object),
        (status = 400, description = "No break in progress"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Clock"
)]
pub async fn break_end(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    record_event(&auth, pool.get_ref(), EventKind::BreakEnd, None).await
}

/// Raw clock events, newest first
#[utoipa::path(
    get,
    path = "/api/clock/events",
    params(EventQuery),
    responses(
        (status = 200, description = "Paginated clock events", body = EventListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Clock"
)]
pub async fn list_events(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EventQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_filter = auth.scope_filter(query.employee_id)?;

    let per_page = query.per_page.unwrap_or(50).clamp(1, 500);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let mut sql = String::from(
        r#"
        SELECT id, employee_id, kind, occurred_at, break_type_id
        FROM clock_events
        WHERE company_id = ?
        "#,
    );
    if employee_filter.is_some() {
        sql.push_str(" AND employee_id = ?");
    }
    if query.from.is_some() {
        sql.push_str(" AND occurred_at >= ?");
    }
    if query.to.is_some() {
        sql.push_str(" AND occurred_at < ?");
    }
    sql.push_str(" ORDER BY occurred_at DESC, id DESC LIMIT ? OFFSET ?");

    let mut q = sqlx::query_as::<_, ClockEventRow>(&sql).bind(auth.company_id);
    if let Some(id) = employee_filter {
        q = q.bind(id);
    }
    if let Some(from) = query.from {
        q = q.bind(from.and_time(chrono::NaiveTime::MIN));
    }
    if let Some(to) = query.to.and_then(|d| d.succ_opt()) {
        q = q.bind(to.and_time(chrono::NaiveTime::MIN));
    }

    let rows = q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| internal(e, "Failed to fetch clock events"))?;

    let data = rows
        .into_iter()
        .map(ClockEvent::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| internal(e, "Stored clock event has an unknown kind"))?;

    Ok(HttpResponse::Ok().json(EventListResponse {
        data,
        page,
        per_page,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fixtures::*;
    use crate::auth::middleware::auth_middleware;
    use crate::config::Config;
    use actix_web::{App, http::StatusCode, middleware::from_fn, test};

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(lazy_pool()))
                    .app_data(web::Data::new(Config::for_tests()))
                    .service(
                        web::scope("/api/clock")
                            .wrap(from_fn(auth_middleware))
                            .route("/in", web::post().to(clock_in))
                            .route("/out", web::post().to(clock_out))
                            .route("/break-start", web::post().to(break_start))
                            .route("/break-end", web::post().to(break_end))
                            .route("/events", web::get().to(list_events)),
                    ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn clocking_requires_an_employee_profile() {
        let app = app!();
        for action in ["in", "out", "break-start", "break-end"] {
            let req = test::TestRequest::post()
                .uri(&format!("/api/clock/{action}"))
                .insert_header(("Authorization", bearer(ADMIN, None)))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{action}");
        }
    }

    #[actix_web::test]
    async fn clocking_without_token_is_unauthorized() {
        let app = app!();
        let req = test::TestRequest::post().uri("/api/clock/in").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn employees_only_list_their_own_events() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/clock/events?employee_id=11")
            .insert_header(("Authorization", bearer(EMPLOYEE, Some(10))))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
