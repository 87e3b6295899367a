use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::database::models::Role;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/roles - List the role catalog
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let roles = sqlx::query_as::<_, Role>("SELECT role_id, name FROM roles ORDER BY name")
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(json!({ "roles": roles })))
}
