use crate::api::absence::{AbsenceListResponse, CreateAbsence};
use crate::api::break_type::CreateBreakType;
use crate::api::clock::{BreakStartReq, EventListResponse};
use crate::api::company::UpdateCompany;
use crate::api::employee::{CreateEmployee, EmployeeListResponse, UpdateEmployee};
use crate::api::holiday::CreateHoliday;
use crate::api::schedule::{CreateAssignment, CreateSchedule};
use crate::auth::handlers::LoginResponse;
use crate::model::absence::{Absence, AbsenceStatus, AbsenceType};
use crate::model::break_type::BreakType;
use crate::model::clock_event::{ClockEvent, EventKind};
use crate::model::company::Company;
use crate::model::employee::Employee;
use crate::model::holiday::Holiday;
use crate::model::schedule::{ScheduleAssignment, WorkSchedule};
use crate::model::vacation::{VacationBalance, VacationPolicy};
use crate::models::{CreateUserReq, LoginReqDto};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Timecore API",
        version = "1.0.0",
        description = r#"
## Time tracking and attendance reporting

Multi-tenant back office for recording working time and reporting on it.

### 🔹 Key Features
- **Clock** in/out and breaks, validated against the employee's last event
- **Schedules** with weekly and week-specific assignments, overnight shifts included
- **Absences** with half days, approval flow and a yearly vacation ledger
- **Reports**: time, attendance, summary, monthly, breaks and delays, computed in the company's timezone

### 🔐 Security
All `/api` endpoints require a **JWT Bearer** access token.
HR and Admin act on any employee of their company; employees only on themselves.

### 📦 Response Format
- JSON bodies; errors are `{"message": "..."}`
- Pagination on list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::create_user,

        crate::api::clock::clock_in,
        crate::api::clock::clock_out,
        crate::api::clock::break_start,
        crate::api::clock::break_end,
        crate::api::clock::list_events,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::deactivate_employee,

        crate::api::absence::create_absence,
        crate::api::absence::list_absences,
        crate::api::absence::get_absence,
        crate::api::absence::approve_absence,
        crate::api::absence::reject_absence,
        crate::api::absence::cancel_absence,

        crate::api::schedule::create_schedule,
        crate::api::schedule::list_schedules,
        crate::api::schedule::create_assignment,
        crate::api::schedule::list_assignments,
        crate::api::schedule::delete_assignment,

        crate::api::holiday::create_holiday,
        crate::api::holiday::list_holidays,
        crate::api::holiday::delete_holiday,

        crate::api::break_type::create_break_type,
        crate::api::break_type::list_break_types,

        crate::api::vacation::get_policy,
        crate::api::vacation::put_policy,
        crate::api::vacation::list_balances,
        crate::api::vacation::recalculate,

        crate::api::company::get_company,
        crate::api::company::update_company,

        crate::api::report::get_report
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            CreateUserReq,
            BreakStartReq,
            ClockEvent,
            EventKind,
            EventListResponse,
            CreateEmployee,
            UpdateEmployee,
            Employee,
            EmployeeListResponse,
            CreateAbsence,
            Absence,
            AbsenceType,
            AbsenceStatus,
            AbsenceListResponse,
            CreateSchedule,
            WorkSchedule,
            CreateAssignment,
            ScheduleAssignment,
            CreateHoliday,
            Holiday,
            CreateBreakType,
            BreakType,
            VacationPolicy,
            VacationBalance,
            Company,
            UpdateCompany
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token rotation and user creation"),
        (name = "Clock", description = "Clock and break events"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Absence", description = "Absence requests and approvals"),
        (name = "Schedule", description = "Work schedules and weekly assignments"),
        (name = "Holiday", description = "Company holidays"),
        (name = "Break type", description = "Break categories"),
        (name = "Vacation", description = "Vacation policy and balances"),
        (name = "Company", description = "Company settings"),
        (name = "Report", description = "Time and attendance reports"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_report_and_clock_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/reports/{kind}"));
        assert!(doc.paths.paths.contains_key("/api/clock/in"));
        assert!(doc.paths.paths.contains_key("/auth/login"));
    }
}
