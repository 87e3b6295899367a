use sqlx::PgPool;
use thiserror::Error;

use crate::auth::password::{verify_password, PasswordError};
use crate::auth::{generate_jwt, Claims, JwtError};
use crate::database::models::{UserAccount, UserProfile};

#[derive(Debug, Error)]
pub enum AuthServiceError {
    // One message for unknown identifier and wrong password, so login
    // responses cannot be used to enumerate accounts.
    #[error("Invalid username/email or password")]
    InvalidCredentials,
    #[error("Account is inactive")]
    AccountInactive,
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Successful login: a signed token plus the profile echoed to the
/// client.
#[derive(Debug)]
pub struct LoginOutcome {
    pub token: String,
    pub user: UserProfile,
}

/// Credential verification and session token issuance.
pub struct AuthService {
    pool: PgPool,
}

impl AuthService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verify a principal's credentials and issue a one-hour JWT carrying
    /// its identity and role claims.
    pub async fn login(
        &self,
        email: Option<&str>,
        username: Option<&str>,
        password: &str,
    ) -> Result<LoginOutcome, AuthServiceError> {
        let account = sqlx::query_as::<_, UserAccount>(
            "SELECT u.user_id, u.email, u.username, u.password_hash, u.first_name,
                    u.last_name, u.organization_id, u.is_active, r.name AS role_name
             FROM users u
             JOIN roles r ON u.role_id = r.role_id
             WHERE u.email = $1 OR u.username = $2",
        )
        .bind(email.unwrap_or(""))
        .bind(username.unwrap_or(""))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AuthServiceError::InvalidCredentials)?;

        if !account.is_active {
            return Err(AuthServiceError::AccountInactive);
        }

        if !verify_password(password, &account.password_hash)? {
            return Err(AuthServiceError::InvalidCredentials);
        }

        let claims = Claims::new(
            account.user_id,
            account.email.clone(),
            account.username.clone(),
            account.role_name.clone(),
            account.organization_id,
        );
        let token = generate_jwt(claims)?;

        Ok(LoginOutcome {
            token,
            user: UserProfile::from(&account),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    #[test]
    fn invalid_credentials_map_to_401() {
        let err: ApiError = AuthServiceError::InvalidCredentials.into();
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.message(), "Invalid username/email or password");
    }

    #[test]
    fn inactive_account_maps_to_403() {
        let err: ApiError = AuthServiceError::AccountInactive.into();
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.message(), "Account is inactive");
    }
}
