use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::database::is_unique_violation;
use crate::database::models::{Batch, BatchSummary};
use crate::database::update_builder::{UpdateBuilder, UpdateSpec};
use crate::error::ApiError;
use crate::state::AppState;

static BATCH_UPDATE: UpdateSpec = UpdateSpec {
    table: "batches",
    key_column: "batch_id",
    fields: &[("batch_name", "batch_name"), ("is_active", "is_active")],
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreateBatchRequest {
    pub batch_name: Option<String>,
    pub organization_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct BatchListQuery {
    pub organization_name: Option<String>,
}

/// POST /api/batches - Create a batch within an organization
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateBatchRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (batch_name, organization_name) = match (req.batch_name, req.organization_name) {
        (Some(b), Some(o)) if !b.is_empty() && !o.is_empty() => (b, o),
        _ => {
            return Err(ApiError::bad_request(
                "Batch name and organization name are required",
            ))
        }
    };

    let org: Option<(Uuid,)> = sqlx::query_as("SELECT org_id FROM organizations WHERE name = $1")
        .bind(&organization_name)
        .fetch_optional(&state.pool)
        .await?;
    let (org_id,) = org.ok_or_else(|| ApiError::not_found("Organization not found"))?;

    let batch = sqlx::query_as::<_, Batch>(
        "INSERT INTO batches (batch_name, org_id, is_active)
         VALUES ($1, $2, $3)
         RETURNING batch_id, batch_name, org_id, is_active, created_at, updated_at",
    )
    .bind(&batch_name)
    .bind(org_id)
    .bind(req.is_active)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("Batch name already exists for this organization")
        } else {
            e.into()
        }
    })?;

    let batch = BatchSummary {
        batch_id: batch.batch_id,
        batch_name: batch.batch_name,
        org_id: batch.org_id,
        organization_name,
        is_active: batch.is_active,
        created_at: batch.created_at,
        updated_at: batch.updated_at,
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Batch created", "batch": batch })),
    ))
}

/// GET /api/batches - List batches, optionally filtered by organization
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<BatchListQuery>,
) -> Result<Json<Value>, ApiError> {
    let batches = match query.organization_name {
        Some(organization_name) => {
            sqlx::query_as::<_, BatchSummary>(
                "SELECT b.batch_id, b.batch_name, b.org_id, o.name AS organization_name,
                        b.is_active, b.created_at, b.updated_at
                 FROM batches b
                 JOIN organizations o ON b.org_id = o.org_id
                 WHERE o.name = $1
                 ORDER BY b.batch_name",
            )
            .bind(organization_name)
            .fetch_all(&state.pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, BatchSummary>(
                "SELECT b.batch_id, b.batch_name, b.org_id, o.name AS organization_name,
                        b.is_active, b.created_at, b.updated_at
                 FROM batches b
                 JOIN organizations o ON b.org_id = o.org_id
                 ORDER BY b.batch_name",
            )
            .fetch_all(&state.pool)
            .await?
        }
    };

    Ok(Json(json!({ "batches": batches })))
}

/// PUT /api/batches/:batch_id - Partial update of declared batch fields
pub async fn update(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let builder = UpdateBuilder::from_payload(&BATCH_UPDATE, &payload)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let batch = builder
        .fetch_optional::<Batch>(batch_id, &state.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::conflict("Batch name already exists for this organization")
            } else {
                e.into()
            }
        })?
        .ok_or_else(|| ApiError::not_found("Batch not found"))?;

    Ok(Json(json!({ "message": "Batch updated", "batch": batch })))
}
