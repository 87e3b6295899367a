use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::assignment_service::{AssignmentService, PodAssignment};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PodUserRequest {
    pub pod_name: Option<String>,
    pub batch_name: Option<String>,
    pub organization_name: Option<String>,
    pub email: Option<String>,
}

impl PodUserRequest {
    fn into_assignment(self) -> Result<PodAssignment, ApiError> {
        match (self.pod_name, self.batch_name, self.organization_name, self.email) {
            (Some(pod_name), Some(batch_name), Some(organization_name), Some(email))
                if !pod_name.is_empty()
                    && !batch_name.is_empty()
                    && !organization_name.is_empty()
                    && !email.is_empty() =>
            {
                Ok(PodAssignment {
                    organization_name,
                    batch_name,
                    pod_name,
                    member_identifier: email,
                })
            }
            _ => Err(ApiError::bad_request(
                "Pod name, batch name, organization name, and email are required",
            )),
        }
    }
}

fn assignment_json(assignment: &PodAssignment) -> Value {
    json!({
        "pod_name": assignment.pod_name,
        "batch_name": assignment.batch_name,
        "organization_name": assignment.organization_name,
        "email": assignment.member_identifier,
    })
}

/// POST /api/pod-users - Assign an orguser to a pod under the
/// organization's capacity ceilings
pub async fn assign(
    State(state): State<AppState>,
    Json(req): Json<PodUserRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let assignment = req.into_assignment()?;

    AssignmentService::new(state.pool.clone())
        .assign_user_to_pod(&assignment)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Orguser assigned to pod",
            "assignment": assignment_json(&assignment),
        })),
    ))
}

/// DELETE /api/pod-users - Remove an orguser from a pod
pub async fn remove(
    State(state): State<AppState>,
    Json(req): Json<PodUserRequest>,
) -> Result<Json<Value>, ApiError> {
    let assignment = req.into_assignment()?;

    AssignmentService::new(state.pool.clone())
        .remove_user_from_pod(&assignment)
        .await?;

    Ok(Json(json!({
        "message": "Orguser removed from pod",
        "assignment": assignment_json(&assignment),
    })))
}

/// GET /api/pods/:pod_id/users - List orgusers assigned to a pod
pub async fn list(
    State(state): State<AppState>,
    Path(pod_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let users = AssignmentService::new(state.pool.clone())
        .list_pod_users(pod_id)
        .await?;

    Ok(Json(json!({ "users": users })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_all_four_fields() {
        let req = PodUserRequest {
            pod_name: Some("P1".into()),
            batch_name: Some("B1".into()),
            organization_name: None,
            email: Some("u@example.com".into()),
        };
        assert!(req.into_assignment().is_err());
    }

    #[test]
    fn rejects_empty_strings() {
        let req = PodUserRequest {
            pod_name: Some("".into()),
            batch_name: Some("B1".into()),
            organization_name: Some("Acme".into()),
            email: Some("u@example.com".into()),
        };
        assert!(req.into_assignment().is_err());
    }

    #[test]
    fn builds_assignment_from_complete_request() {
        let req = PodUserRequest {
            pod_name: Some("P1".into()),
            batch_name: Some("B1".into()),
            organization_name: Some("Acme".into()),
            email: Some("u@example.com".into()),
        };
        let assignment = req.into_assignment().unwrap();
        assert_eq!(assignment.pod_name, "P1");
        assert_eq!(assignment.member_identifier, "u@example.com");
    }
}
