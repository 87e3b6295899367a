use axum::{extract::State, response::Json, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::services::auth_service::AuthService;
use crate::state::AppState;

use super::is_valid_email;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    fn validate(&self) -> Result<&str, ApiError> {
        let password = match self.password.as_deref() {
            Some(p) if !p.is_empty() => p,
            _ => {
                return Err(ApiError::bad_request(
                    "Password and either username or email are required",
                ))
            }
        };
        if self.email.is_none() && self.username.is_none() {
            return Err(ApiError::bad_request(
                "Password and either username or email are required",
            ));
        }
        if let Some(email) = self.email.as_deref() {
            if !is_valid_email(email) {
                return Err(ApiError::bad_request("Invalid email format"));
            }
        }
        Ok(password)
    }
}

/// POST /api/auth/login - Verify credentials and issue a session token
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let password = req.validate()?;

    let outcome = AuthService::new(state.pool.clone())
        .login(req.email.as_deref(), req.username.as_deref(), password)
        .await?;

    Ok(Json(json!({
        "message": "Login successful",
        "token": outcome.token,
        "user": outcome.user,
    })))
}

/// GET /api/auth/whoami - Echo the verified token claims
pub async fn whoami(Extension(user): Extension<AuthUser>) -> Json<Value> {
    Json(json!({
        "user": {
            "user_id": user.user_id,
            "email": user.email,
            "username": user.username,
            "role_name": user.role_name,
            "organization_id": user.organization_id,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_requires_password_and_identifier() {
        let req = LoginRequest {
            email: None,
            username: None,
            password: Some("secret123".into()),
        };
        assert!(req.validate().is_err());

        let req = LoginRequest {
            email: Some("a@example.com".into()),
            username: None,
            password: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn login_rejects_malformed_email() {
        let req = LoginRequest {
            email: Some("nope".into()),
            username: None,
            password: Some("secret123".into()),
        };
        let err = req.validate().unwrap_err();
        assert_eq!(err.message(), "Invalid email format");
    }

    #[test]
    fn login_accepts_username_only() {
        let req = LoginRequest {
            email: None,
            username: Some("admin".into()),
            password: Some("secret123".into()),
        };
        assert_eq!(req.validate().unwrap(), "secret123");
    }
}
