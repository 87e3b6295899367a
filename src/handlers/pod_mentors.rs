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
pub struct PodMentorRequest {
    pub pod_name: Option<String>,
    pub batch_name: Option<String>,
    pub organization_name: Option<String>,
    pub mentor_email: Option<String>,
}

impl PodMentorRequest {
    fn into_assignment(self) -> Result<PodAssignment, ApiError> {
        match (
            self.pod_name,
            self.batch_name,
            self.organization_name,
            self.mentor_email,
        ) {
            (Some(pod_name), Some(batch_name), Some(organization_name), Some(mentor_email))
                if !pod_name.is_empty()
                    && !batch_name.is_empty()
                    && !organization_name.is_empty()
                    && !mentor_email.is_empty() =>
            {
                Ok(PodAssignment {
                    organization_name,
                    batch_name,
                    pod_name,
                    member_identifier: mentor_email,
                })
            }
            _ => Err(ApiError::bad_request(
                "Pod name, batch name, organization name, and mentor email are required",
            )),
        }
    }
}

fn assignment_json(assignment: &PodAssignment) -> Value {
    json!({
        "pod_name": assignment.pod_name,
        "batch_name": assignment.batch_name,
        "organization_name": assignment.organization_name,
        "mentor_email": assignment.member_identifier,
    })
}

/// POST /api/pod-mentors - Assign a mentor to a pod
pub async fn assign(
    State(state): State<AppState>,
    Json(req): Json<PodMentorRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let assignment = req.into_assignment()?;

    AssignmentService::new(state.pool.clone())
        .assign_mentor_to_pod(&assignment)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Mentor assigned to pod",
            "assignment": assignment_json(&assignment),
        })),
    ))
}

/// DELETE /api/pod-mentors - Remove a mentor from a pod
pub async fn remove(
    State(state): State<AppState>,
    Json(req): Json<PodMentorRequest>,
) -> Result<Json<Value>, ApiError> {
    let assignment = req.into_assignment()?;

    AssignmentService::new(state.pool.clone())
        .remove_mentor_from_pod(&assignment)
        .await?;

    Ok(Json(json!({
        "message": "Mentor removed from pod",
        "assignment": assignment_json(&assignment),
    })))
}

/// GET /api/pods/:pod_id/mentors - List mentors assigned to a pod
pub async fn list(
    State(state): State<AppState>,
    Path(pod_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let mentors = AssignmentService::new(state.pool.clone())
        .list_pod_mentors(pod_id)
        .await?;

    Ok(Json(json!({ "mentors": mentors })))
}
