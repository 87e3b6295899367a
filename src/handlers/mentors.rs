use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::database::is_unique_violation;
use crate::database::models::Mentor;
use crate::database::update_builder::{UpdateBuilder, UpdateSpec};
use crate::error::ApiError;
use crate::state::AppState;

static MENTOR_UPDATE: UpdateSpec = UpdateSpec {
    table: "mentors",
    key_column: "mentor_id",
    fields: &[
        ("mentor_name", "mentor_name"),
        ("mentor_email", "mentor_email"),
        ("is_active", "is_active"),
    ],
};

#[derive(Debug, Deserialize)]
pub struct CreateMentorRequest {
    pub mentor_name: Option<String>,
    pub mentor_email: Option<String>,
}

/// POST /api/mentors - Create a mentor
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateMentorRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (mentor_name, mentor_email) = match (req.mentor_name, req.mentor_email) {
        (Some(n), Some(e)) if !n.is_empty() && !e.is_empty() => (n, e),
        _ => return Err(ApiError::bad_request("Mentor name and email are required")),
    };

    let mentor = sqlx::query_as::<_, Mentor>(
        "INSERT INTO mentors (mentor_name, mentor_email)
         VALUES ($1, $2)
         RETURNING mentor_id, mentor_name, mentor_email, is_active, created_at, updated_at",
    )
    .bind(&mentor_name)
    .bind(&mentor_email)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("Mentor email already exists")
        } else {
            e.into()
        }
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Mentor created", "mentor": mentor })),
    ))
}

/// GET /api/mentors - List all mentors
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let mentors = sqlx::query_as::<_, Mentor>(
        "SELECT mentor_id, mentor_name, mentor_email, is_active, created_at, updated_at
         FROM mentors
         ORDER BY mentor_name",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(json!({ "mentors": mentors })))
}

/// PUT /api/mentors/:mentor_id - Partial update of declared mentor fields
pub async fn update(
    State(state): State<AppState>,
    Path(mentor_id): Path<Uuid>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let builder = UpdateBuilder::from_payload(&MENTOR_UPDATE, &payload)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let mentor = builder
        .fetch_optional::<Mentor>(mentor_id, &state.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::conflict("Mentor email already exists")
            } else {
                e.into()
            }
        })?
        .ok_or_else(|| ApiError::not_found("Mentor not found"))?;

    Ok(Json(json!({ "message": "Mentor updated", "mentor": mentor })))
}

/// DELETE /api/mentors/:mentor_id - Delete a mentor
pub async fn delete(
    State(state): State<AppState>,
    Path(mentor_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let result = sqlx::query("DELETE FROM mentors WHERE mentor_id = $1")
        .bind(mentor_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Mentor not found"));
    }

    Ok(Json(json!({ "message": "Mentor deleted" })))
}
