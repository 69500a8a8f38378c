//! HS256 session tokens issued at sign-in.
//!
//! A token only carries the identity; the role is always read from the
//! profile when the session is established, so a role change takes effect
//! on the next request.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Profile id.
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is invalid or expired")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl_mins: i64,
}

pub fn issue_token(
    config: &TokenConfig,
    user_id: Uuid,
    email: &str,
) -> Result<String, TokenError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::minutes(config.ttl_mins)).timestamp(),
        jti: Uuid::new_v4().to_string(),
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?)
}

pub fn validate_token(config: &TokenConfig, token: &str) -> Result<Claims, TokenError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TokenConfig {
        TokenConfig {
            secret: "test-secret".into(),
            ttl_mins: 15,
        }
    }

    #[test]
    fn issue_and_validate() {
        let id = Uuid::new_v4();
        let token = issue_token(&config(), id, "a@b.co").unwrap();
        let claims = validate_token(&config(), &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.email, "a@b.co");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(&config(), Uuid::new_v4(), "a@b.co").unwrap();
        let other = TokenConfig {
            secret: "other".into(),
            ttl_mins: 15,
        };
        assert!(validate_token(&other, &token).is_err());
    }

    #[test]
    fn expired_is_rejected() {
        let expired = TokenConfig {
            secret: "test-secret".into(),
            ttl_mins: -10,
        };
        let token = issue_token(&expired, Uuid::new_v4(), "a@b.co").unwrap();
        assert!(validate_token(&config(), &token).is_err());
    }
}
