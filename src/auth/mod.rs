use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;

pub mod password;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub role_name: String,
    pub organization_id: Option<Uuid>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        email: String,
        username: String,
        role_name: String,
        organization_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            user_id,
            email,
            username,
            role_name,
            organization_id,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
        }
    }
}

impl std::error::Error for JwtError {}

pub fn generate_jwt(claims: Claims) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, &claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    fn sample_claims() -> Claims {
        Claims::new(
            Uuid::new_v4(),
            "admin@example.com".to_string(),
            "admin".to_string(),
            "superadmin".to_string(),
            None,
        )
    }

    #[test]
    fn claims_expire_after_configured_window() {
        let claims = sample_claims();
        let window = config::config().security.jwt_expiry_hours as i64 * 3600;
        assert_eq!(claims.exp - claims.iat, window);
    }

    #[test]
    fn generated_token_round_trips() {
        let claims = sample_claims();
        let user_id = claims.user_id;
        let token = generate_jwt(claims).expect("token");

        let secret = &config::config().security.jwt_secret;
        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .expect("decode");

        assert_eq!(decoded.claims.user_id, user_id);
        assert_eq!(decoded.claims.role_name, "superadmin");
        assert_eq!(decoded.claims.organization_id, None);
    }
}
