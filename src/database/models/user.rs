use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Full account row with its role name joined in. Carries the credential
/// hash, so it is never serialized; responses go through [`UserProfile`].
#[derive(Debug, Clone, FromRow)]
pub struct UserAccount {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub organization_id: Option<Uuid>,
    pub is_active: bool,
    pub role_name: String,
}

/// Client-facing view of an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role_name: String,
    pub organization_id: Option<Uuid>,
}

impl From<&UserAccount> for UserProfile {
    fn from(account: &UserAccount) -> Self {
        Self {
            user_id: account.user_id,
            email: account.email.clone(),
            username: account.username.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            role_name: account.role_name.clone(),
            organization_id: account.organization_id,
        }
    }
}

/// Row shape returned by the account-creation INSERTs.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreatedAccount {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub organization_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Orguser row as listed for a pod.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PodMember {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub organization_name: String,
}
