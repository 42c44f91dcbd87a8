use crate::{
    auth::auth::AuthUser,
    model::employee::Employee,
    utils::db_utils::{build_update_sql, execute_update, is_duplicate},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

/// Columns a partial update may touch.
const UPDATABLE: &[&str] = &[
    "employee_code",
    "first_name",
    "last_name",
    "email",
    "hire_date",
    "active",
];

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP-001", value_type = String)]
    pub employee_code: String,
    #[schema(example = "John", value_type = String)]
    pub first_name: String,
    #[schema(example = "Doe", value_type = String)]
    pub last_name: String,
    #[schema(example = "john@email.com", format = "email", value_type = String)]
    pub email: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub hire_date: NaiveDate,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Include deactivated employees
    pub include_inactive: Option<bool>,
    /// Search by code, name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

/// Partial update body; any subset of fields.
#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployee {
    pub employee_code: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub hire_date: Option<NaiveDate>,
    pub active: Option<bool>,
}

const SELECT_EMPLOYEE: &str = r#"
    SELECT id, employee_code, first_name, last_name, email, hire_date, active
    FROM employees
"#;

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created successfully", body = Object, example = json!({
            "message": "Employee created", "id": 1000
        })),
        (status = 403, description = "HR/Admin only"),
        (status = 409, description = "Employee code already used", body = Object, example = json!({
            "message": "Employee code already exists"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if payload.employee_code.trim().is_empty() || payload.first_name.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "employee_code and first_name are required"
        })));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO employees
        (company_id, employee_code, first_name, last_name, email, hire_date)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.company_id)
    .bind(payload.employee_code.trim())
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(payload.email.trim())
    .bind(payload.hire_date)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(r) => {
            info!(employee_id = r.last_insert_id(), company_id = auth.company_id, "Employee created");
            Ok(HttpResponse::Created().json(json!({
                "message": "Employee created",
                "id": r.last_insert_id()
            })))
        }
        Err(e) if is_duplicate(&e) => Ok(HttpResponse::Conflict().json(json!({
            "message": "Employee code already exists"
        }))),
        Err(e) => {
            error!(error = %e, "Failed to Create Employee");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message":"Something went wrong, Contact with system admin"
            })))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut conditions = vec!["company_id = ?"];
    let mut search_bindings: Vec<String> = Vec::new();

    if !query.include_inactive.unwrap_or(false) {
        conditions.push("active = TRUE");
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push(
            "(employee_code LIKE ? OR first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)",
        );
        let like = format!("%{}%", search);
        search_bindings.extend(std::iter::repeat_n(like, 4));
    }

    let where_clause = format!("WHERE {}", conditions.join(" AND "));

    let count_sql = format!("SELECT COUNT(*) as total FROM employees {}", where_clause);
    debug!(sql = %count_sql, bindings = ?search_bindings, "Counting employees");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(auth.company_id);
    for b in &search_bindings {
        count_query = count_query.bind(b);
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %count_sql, "Failed to count employees");
        ErrorInternalServerError("Database error")
    })?;

    let data_sql = format!(
        "{} {} ORDER BY id DESC LIMIT ? OFFSET ?",
        SELECT_EMPLOYEE, where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

    let mut data_query = sqlx::query_as::<_, Employee>(&data_sql).bind(auth.company_id);
    for b in &search_bindings {
        data_query = data_query.bind(b);
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let employees = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %data_sql, "Failed to fetch employees");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated successfully", body = Object, example = json!({
            "message": "Employee updated successfully"
        })),
        (status = 400, description = "Unknown or non-updatable field"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    let update = build_update_sql("employees", &body, UPDATABLE, employee_id, auth.company_id)?;

    let affected = execute_update(pool.get_ref(), update).await.map_err(|e| {
        if is_duplicate(&e) {
            return actix_web::error::ErrorConflict("Employee code already exists");
        }
        error!(error = %e, employee_id, "Failed to update employee");
        ErrorInternalServerError("Internal Server Error")
    })?;

    // MySQL reports 0 affected rows when nothing changed, so check existence
    if affected == 0 && !employee_exists(pool.get_ref(), auth.company_id, employee_id).await? {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee updated successfully"
    })))
}

pub async fn employee_exists(
    pool: &MySqlPool,
    company_id: u64,
    employee_id: u64,
) -> actix_web::Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE id = ? AND company_id = ?")
            .bind(employee_id)
            .bind(company_id)
            .fetch_one(pool)
            .await
            .map_err(|e| {
                error!(error = %e, employee_id, "Failed to check employee");
                ErrorInternalServerError("Internal Server Error")
            })?;
    Ok(count > 0)
}

/// Deactivate Employee. History is kept; the employee drops out of reports.
#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Deactivated", body = Object, example = json!({
            "message": "Employee deactivated"
        })),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error", body = Object)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn deactivate_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    if !employee_exists(pool.get_ref(), auth.company_id, employee_id).await? {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    }

    let result = sqlx::query("UPDATE employees SET active = FALSE WHERE id = ? AND company_id = ?")
        .bind(employee_id)
        .bind(auth.company_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(_) => {
            info!(employee_id, "Employee deactivated");
            Ok(HttpResponse::Ok().json(json!({
                "message": "Employee deactivated"
            })))
        }

        Err(e) => {
            error!(error = %e, employee_id, "Failed to deactivate employee");

            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 403, description = "Employees may only read their own profile"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.target_employee(Some(path.into_inner()))?;

    let sql = format!("{} WHERE id = ? AND company_id = ?", SELECT_EMPLOYEE);
    let employee = sqlx::query_as::<_, Employee>(&sql)
        .bind(employee_id)
        .bind(auth.company_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, employee_id, "Failed to fetch employee");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match employee {
        Some(emp) => Ok(HttpResponse::Ok().json(emp)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        }))),
    }
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
                        web::scope("/api/employees")
                            .wrap(from_fn(auth_middleware))
                            .route("", web::post().to(create_employee))
                            .route("", web::get().to(list_employees))
                            .route("/{id}", web::get().to(get_employee))
                            .route("/{id}", web::put().to(update_employee))
                            .route("/{id}", web::delete().to(deactivate_employee)),
                    ),
            )
            .await
        };
    }

    fn new_employee(code: &str, first_name: &str) -> serde_json::Value {
        json!({
            "employee_code": code,
            "first_name": first_name,
            "last_name": "Doe",
            "email": "john@acme.test",
            "hire_date": "2026-01-01"
        })
    }

    #[actix_web::test]
    async fn blank_code_or_name_is_rejected() {
        let app = app!();
        for payload in [new_employee("  ", "John"), new_employee("EMP-1", "")] {
            let req = test::TestRequest::post()
                .uri("/api/employees")
                .insert_header(("Authorization", bearer(HR, None)))
                .set_json(payload)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[actix_web::test]
    async fn employees_cannot_manage_employees() {
        let app = app!();
        let requests = [
            test::TestRequest::post()
                .uri("/api/employees")
                .set_json(new_employee("EMP-1", "John")),
            test::TestRequest::get().uri("/api/employees"),
            test::TestRequest::put()
                .uri("/api/employees/10")
                .set_json(json!({"first_name": "Jo"})),
            test::TestRequest::delete().uri("/api/employees/10"),
            test::TestRequest::get().uri("/api/employees/11"),
        ];
        for req in requests {
            let req = req
                .insert_header(("Authorization", bearer(EMPLOYEE, Some(10))))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        }
    }

    #[actix_web::test]
    async fn update_rejects_fields_outside_the_allow_list() {
        let app = app!();
        let req = test::TestRequest::put()
            .uri("/api/employees/10")
            .insert_header(("Authorization", bearer(ADMIN, None)))
            .set_json(json!({"company_id": 2}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
