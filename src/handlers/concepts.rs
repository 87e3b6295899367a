use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::database::is_unique_violation;
use crate::database::models::Concept;
use crate::database::update_builder::{UpdateBuilder, UpdateSpec};
use crate::error::ApiError;
use crate::state::AppState;

static CONCEPT_UPDATE: UpdateSpec = UpdateSpec {
    table: "concepts",
    key_column: "concept_id",
    fields: &[("concept_name", "concept_name"), ("is_active", "is_active")],
};

#[derive(Debug, Deserialize)]
pub struct CreateConceptRequest {
    pub concept_name: Option<String>,
}

/// POST /api/concepts - Create a concept
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateConceptRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let concept_name = req
        .concept_name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::bad_request("Concept name is required"))?;

    let concept = sqlx::query_as::<_, Concept>(
        "INSERT INTO concepts (concept_name)
         VALUES ($1)
         RETURNING concept_id, concept_name, is_active, created_at, updated_at",
    )
    .bind(&concept_name)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("Concept name already exists")
        } else {
            e.into()
        }
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Concept created", "concept": concept })),
    ))
}

/// GET /api/concepts - List all concepts
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let concepts = sqlx::query_as::<_, Concept>(
        "SELECT concept_id, concept_name, is_active, created_at, updated_at
         FROM concepts
         ORDER BY concept_name",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(json!({ "concepts": concepts })))
}

/// PUT /api/concepts/:concept_id - Partial update of declared concept fields
pub async fn update(
    State(state): State<AppState>,
    Path(concept_id): Path<Uuid>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let builder = UpdateBuilder::from_payload(&CONCEPT_UPDATE, &payload)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let concept = builder
        .fetch_optional::<Concept>(concept_id, &state.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::conflict("Concept name already exists")
            } else {
                e.into()
            }
        })?
        .ok_or_else(|| ApiError::not_found("Concept not found"))?;

    Ok(Json(json!({ "message": "Concept updated", "concept": concept })))
}
