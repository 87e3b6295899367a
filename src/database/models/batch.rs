use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Batch {
    pub batch_id: Uuid,
    pub batch_name: String,
    pub org_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Batch row joined with its organization name, as returned by list
/// endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    pub batch_name: String,
    pub org_id: Uuid,
    pub organization_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
