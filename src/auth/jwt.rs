use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::models::{Claims, TokenType};

/// Identity carried inside every token.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: u64,
    pub username: String,
    pub role: u8,
    pub company_id: u64,
    pub employee_id: Option<u64>,
}

impl From<&Claims> for TokenSubject {
    fn from(c: &Claims) -> Self {
        Self {
            user_id: c.user_id,
            username: c.sub.clone(),
            role: c.role,
            company_id: c.company_id,
            employee_id: c.employee_id,
        }
    }
}

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

fn issue(
    subject: &TokenSubject,
    token_type: TokenType,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = Claims {
        user_id: subject.user_id,
        sub: subject.username.clone(),
        role: subject.role,
        company_id: subject.company_id,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
        employee_id: subject.employee_id,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn generate_access_token(
    subject: &TokenSubject,
    secret: &str,
    ttl: usize,
) -> Result<String, Error> {
    issue(subject, TokenType::Access, secret, ttl).map(|(token, _)| token)
}

pub fn generate_refresh_token(
    subject: &TokenSubject,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    issue(subject, TokenType::Refresh, secret, ttl)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: 5,
            username: "hr.lead".into(),
            role: 2,
            company_id: 11,
            employee_id: Some(40),
        }
    }

    #[test]
    fn access_token_carries_tenant_and_type() {
        let token = generate_access_token(&subject(), "secret", 900).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.company_id, 11);
        assert_eq!(claims.employee_id, Some(40));
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn refresh_tokens_get_unique_jti() {
        let (_, first) = generate_refresh_token(&subject(), "secret", 60).unwrap();
        let (_, second) = generate_refresh_token(&subject(), "secret", 60).unwrap();
        assert_eq!(first.token_type, TokenType::Refresh);
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token(&subject(), "secret", 900).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }
}
