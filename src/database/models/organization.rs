use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub org_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub max_users_per_batch: i32,
    pub max_users_per_pod: i32,
    pub created_at: DateTime<Utc>,
}
