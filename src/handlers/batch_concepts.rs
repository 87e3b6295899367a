use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::assignment_service::{AssignmentService, ConceptAssignment};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BatchConceptRequest {
    pub batch_name: Option<String>,
    pub organization_name: Option<String>,
    pub concept_name: Option<String>,
}

impl BatchConceptRequest {
    fn into_assignment(self) -> Result<ConceptAssignment, ApiError> {
        match (self.batch_name, self.organization_name, self.concept_name) {
            (Some(batch_name), Some(organization_name), Some(concept_name))
                if !batch_name.is_empty()
                    && !organization_name.is_empty()
                    && !concept_name.is_empty() =>
            {
                Ok(ConceptAssignment {
                    organization_name,
                    batch_name,
                    concept_name,
                })
            }
            _ => Err(ApiError::bad_request(
                "Batch name, organization name, and concept name are required",
            )),
        }
    }
}

fn assignment_json(assignment: &ConceptAssignment) -> Value {
    json!({
        "batch_name": assignment.batch_name,
        "concept_name": assignment.concept_name,
        "organization_name": assignment.organization_name,
    })
}

/// POST /api/batch-concepts - Assign a concept to a batch
pub async fn assign(
    State(state): State<AppState>,
    Json(req): Json<BatchConceptRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let assignment = req.into_assignment()?;

    AssignmentService::new(state.pool.clone())
        .assign_concept_to_batch(&assignment)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Concept assigned to batch",
            "assignment": assignment_json(&assignment),
        })),
    ))
}

/// DELETE /api/batch-concepts - Remove a concept from a batch
pub async fn remove(
    State(state): State<AppState>,
    Json(req): Json<BatchConceptRequest>,
) -> Result<Json<Value>, ApiError> {
    let assignment = req.into_assignment()?;

    AssignmentService::new(state.pool.clone())
        .remove_concept_from_batch(&assignment)
        .await?;

    Ok(Json(json!({
        "message": "Concept removed from batch",
        "assignment": assignment_json(&assignment),
    })))
}

/// GET /api/pods/:pod_id/concepts - List active concepts assigned to the
/// pod's batch
pub async fn list_for_pod(
    State(state): State<AppState>,
    Path(pod_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let concepts = AssignmentService::new(state.pool.clone())
        .list_pod_concepts(pod_id)
        .await?;

    Ok(Json(json!({ "concepts": concepts })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_all_three_fields() {
        let req = BatchConceptRequest {
            batch_name: Some("B1".into()),
            organization_name: Some("Acme".into()),
            concept_name: None,
        };
        assert!(req.into_assignment().is_err());
    }

    #[test]
    fn builds_assignment_from_complete_request() {
        let req = BatchConceptRequest {
            batch_name: Some("B1".into()),
            organization_name: Some("Acme".into()),
            concept_name: Some("Fractions".into()),
        };
        let assignment = req.into_assignment().unwrap();
        assert_eq!(assignment.concept_name, "Fractions");
    }
}
