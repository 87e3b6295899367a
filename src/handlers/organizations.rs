use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::is_unique_violation;
use crate::database::models::Organization;
use crate::error::ApiError;
use crate::state::AppState;

fn default_max_users_per_batch() -> i32 {
    10
}

fn default_max_users_per_pod() -> i32 {
    6
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default = "default_max_users_per_batch")]
    pub max_users_per_batch: i32,
    #[serde(default = "default_max_users_per_pod")]
    pub max_users_per_pod: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// POST /api/organizations - Create an organization with its capacity
/// ceilings. Ceilings are immutable after creation.
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let name = req
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::bad_request("Name is required"))?;

    if req.max_users_per_batch <= 0 {
        return Err(ApiError::bad_request(
            "max_users_per_batch must be a positive number",
        ));
    }
    if req.max_users_per_pod <= 0 {
        return Err(ApiError::bad_request(
            "max_users_per_pod must be a positive number",
        ));
    }

    let organization = sqlx::query_as::<_, Organization>(
        "INSERT INTO organizations (name, description, is_active, max_users_per_batch, max_users_per_pod)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING org_id, name, description, is_active, max_users_per_batch, max_users_per_pod, created_at",
    )
    .bind(&name)
    .bind(&req.description)
    .bind(req.is_active)
    .bind(req.max_users_per_batch)
    .bind(req.max_users_per_pod)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("Organization name already exists")
        } else {
            e.into()
        }
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Organization created successfully",
            "organization": organization,
        })),
    ))
}

/// GET /api/organizations - List all organizations
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let organizations = sqlx::query_as::<_, Organization>(
        "SELECT org_id, name, description, is_active, max_users_per_batch, max_users_per_pod, created_at
         FROM organizations
         ORDER BY name ASC",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(json!({
        "message": "Organizations retrieved successfully",
        "organizations": organizations,
    })))
}
