use crate::config::Config;
use crate::{model::role::Role, auth::jwt::verify_token, models::TokenType};
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorForbidden,
    error::ErrorUnauthorized, web::Data,
};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
    pub company_id: u64,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

fn decode_bearer(req: &HttpRequest) -> actix_web::Result<AuthUser> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| ErrorUnauthorized("Missing token"))?;

    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Config missing"))?;

    let claims =
        verify_token(token, &config.jwt_secret).map_err(|_| ErrorUnauthorized("Invalid token"))?;

    if claims.token_type != TokenType::Access {
        return Err(ErrorUnauthorized("Access token required"));
    }

    let role = Role::from_id(claims.role).ok_or_else(|| ErrorUnauthorized("Invalid role"))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
        company_id: claims.company_id,
        employee_id: claims.employee_id,
    })
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on the protected scope
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        ready(decode_bearer(req))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ErrorForbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if self.is_hr_or_admin() {
            Ok(())
        } else {
            Err(ErrorForbidden("HR/Admin only"))
        }
    }

    pub fn is_hr_or_admin(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Hr)
    }

    /// The caller's own employee id.
    pub fn own_employee_id(&self) -> actix_web::Result<u64> {
        self.employee_id
            .ok_or_else(|| ErrorForbidden("No employee profile"))
    }

    /// Resolve which employee a request acts on: HR/Admin may name anyone
    /// (defaulting to themselves), employees only themselves.
    pub fn target_employee(&self, requested: Option<u64>) -> actix_web::Result<u64> {
        match requested {
            Some(id) if self.is_hr_or_admin() => Ok(id),
            Some(id) if Some(id) == self.employee_id => Ok(id),
            Some(_) => Err(ErrorForbidden("Employees may only act on their own records")),
            None => self.own_employee_id(),
        }
    }

    /// Employee filter for list/report endpoints: HR/Admin see everything
    /// unless they filter, employees are pinned to themselves.
    pub fn scope_filter(&self, requested: Option<u64>) -> actix_web::Result<Option<u64>> {
        if self.is_hr_or_admin() {
            Ok(requested)
        } else {
            self.target_employee(requested).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "u".into(),
            role,
            company_id: 1,
            employee_id,
        }
    }

    #[test]
    fn employees_are_pinned_to_themselves() {
        let employee = user(Role::Employee, Some(10));
        assert_eq!(employee.scope_filter(None).unwrap(), Some(10));
        assert_eq!(employee.scope_filter(Some(10)).unwrap(), Some(10));
        assert!(employee.scope_filter(Some(11)).is_err());
        assert!(employee.require_hr_or_admin().is_err());
    }

    #[test]
    fn hr_may_target_anyone() {
        let hr = user(Role::Hr, None);
        assert_eq!(hr.scope_filter(None).unwrap(), None);
        assert_eq!(hr.target_employee(Some(77)).unwrap(), 77);
        assert!(hr.target_employee(None).is_err());
        assert!(hr.require_admin().is_err());
    }
}
