use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::database::is_unique_violation;
use crate::database::models::{Pod, PodSummary};
use crate::database::update_builder::{UpdateBuilder, UpdateSpec};
use crate::error::ApiError;
use crate::state::AppState;

static POD_UPDATE: UpdateSpec = UpdateSpec {
    table: "pods",
    key_column: "pod_id",
    fields: &[("pod_name", "pod_name"), ("is_active", "is_active")],
};

const POD_SUMMARY_SELECT: &str =
    "SELECT p.pod_id, p.pod_name, p.batch_id, b.batch_name, b.org_id,
            o.name AS organization_name, p.is_active, p.created_at, p.updated_at
     FROM pods p
     JOIN batches b ON p.batch_id = b.batch_id
     JOIN organizations o ON b.org_id = o.org_id";

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreatePodRequest {
    pub pod_name: Option<String>,
    pub batch_name: Option<String>,
    pub organization_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct PodListQuery {
    pub organization_name: Option<String>,
    pub batch_name: Option<String>,
}

/// POST /api/pods - Create a pod within a batch
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreatePodRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (pod_name, batch_name, organization_name) =
        match (req.pod_name, req.batch_name, req.organization_name) {
            (Some(p), Some(b), Some(o)) if !p.is_empty() && !b.is_empty() && !o.is_empty() => {
                (p, b, o)
            }
            _ => {
                return Err(ApiError::bad_request(
                    "Pod name, batch name, and organization name are required",
                ))
            }
        };

    let org: Option<(Uuid,)> = sqlx::query_as("SELECT org_id FROM organizations WHERE name = $1")
        .bind(&organization_name)
        .fetch_optional(&state.pool)
        .await?;
    let (org_id,) = org.ok_or_else(|| ApiError::not_found("Organization not found"))?;

    let batch: Option<(Uuid,)> =
        sqlx::query_as("SELECT batch_id FROM batches WHERE batch_name = $1 AND org_id = $2")
            .bind(&batch_name)
            .bind(org_id)
            .fetch_optional(&state.pool)
            .await?;
    let (batch_id,) =
        batch.ok_or_else(|| ApiError::not_found("Batch not found for this organization"))?;

    let pod = sqlx::query_as::<_, Pod>(
        "INSERT INTO pods (pod_name, batch_id, is_active)
         VALUES ($1, $2, $3)
         RETURNING pod_id, pod_name, batch_id, is_active, created_at, updated_at",
    )
    .bind(&pod_name)
    .bind(batch_id)
    .bind(req.is_active)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("Pod name already exists for this batch")
        } else {
            e.into()
        }
    })?;

    let pod = PodSummary {
        pod_id: pod.pod_id,
        pod_name: pod.pod_name,
        batch_id: pod.batch_id,
        batch_name,
        org_id,
        organization_name,
        is_active: pod.is_active,
        created_at: pod.created_at,
        updated_at: pod.updated_at,
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Pod created", "pod": pod })),
    ))
}

/// GET /api/pods - List pods, optionally filtered by organization and
/// batch name
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PodListQuery>,
) -> Result<Json<Value>, ApiError> {
    let pods = match (query.organization_name, query.batch_name) {
        (Some(org), Some(batch)) => {
            let sql = format!(
                "{POD_SUMMARY_SELECT} WHERE o.name = $1 AND b.batch_name = $2 ORDER BY p.pod_name"
            );
            sqlx::query_as::<_, PodSummary>(&sql)
                .bind(org)
                .bind(batch)
                .fetch_all(&state.pool)
                .await?
        }
        (Some(org), None) => {
            let sql = format!("{POD_SUMMARY_SELECT} WHERE o.name = $1 ORDER BY p.pod_name");
            sqlx::query_as::<_, PodSummary>(&sql)
                .bind(org)
                .fetch_all(&state.pool)
                .await?
        }
        (None, Some(batch)) => {
            let sql = format!("{POD_SUMMARY_SELECT} WHERE b.batch_name = $1 ORDER BY p.pod_name");
            sqlx::query_as::<_, PodSummary>(&sql)
                .bind(batch)
                .fetch_all(&state.pool)
                .await?
        }
        (None, None) => {
            let sql = format!("{POD_SUMMARY_SELECT} ORDER BY p.pod_name");
            sqlx::query_as::<_, PodSummary>(&sql)
                .fetch_all(&state.pool)
                .await?
        }
    };

    Ok(Json(json!({ "pods": pods })))
}

/// PUT /api/pods/:pod_id - Partial update of declared pod fields
pub async fn update(
    State(state): State<AppState>,
    Path(pod_id): Path<Uuid>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let builder = UpdateBuilder::from_payload(&POD_UPDATE, &payload)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let pod = builder
        .fetch_optional::<Pod>(pod_id, &state.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::conflict("Pod name already exists for this batch")
            } else {
                e.into()
            }
        })?
        .ok_or_else(|| ApiError::not_found("Pod not found"))?;

    Ok(Json(json!({ "message": "Pod updated", "pod": pod })))
}
