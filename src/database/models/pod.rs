use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pod {
    pub pod_id: Uuid,
    pub pod_name: String,
    pub batch_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pod row joined up through its batch and organization, as returned by
/// list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PodSummary {
    pub pod_id: Uuid,
    pub pod_name: String,
    pub batch_id: Uuid,
    pub batch_name: String,
    pub org_id: Uuid,
    pub organization_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
