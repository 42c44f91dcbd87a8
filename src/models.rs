use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateUserReq {
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
    /// 1 = admin, 2 = hr, 3 = employee
    #[schema(example = 3)]
    pub role_id: u8,
    #[schema(example = 1000, nullable = true)]
    pub employee_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
}

#[derive(FromRow)]
pub struct UserSql {
    pub id: u64,
    pub company_id: u64,
    pub username: String,
    pub password: String,
    pub role_id: u8,
    pub employee_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8, // role id
    pub company_id: u64,
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
