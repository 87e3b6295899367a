use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::database::is_unique_violation;
use crate::database::models::{Concept, Mentor, PodMember};

#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("Organization not found")]
    OrganizationNotFound,
    #[error("Active batch not found for this organization")]
    BatchNotFound,
    #[error("Active pod not found")]
    PodNotFound,
    #[error("Active orguser not found for this organization")]
    OrguserNotFound,
    #[error("Active mentor not found")]
    MentorNotFound,
    #[error("Active concept not found")]
    ConceptNotFound,
    #[error("Pod has reached maximum user limit of {0}")]
    PodCapacityReached(i32),
    #[error("Batch has reached maximum user limit of {0}")]
    BatchCapacityReached(i32),
    #[error("{member} already assigned to this {target}")]
    AlreadyAssigned {
        member: &'static str,
        target: &'static str,
    },
    #[error("{member} not assigned to this {target}")]
    NotAssigned {
        member: &'static str,
        target: &'static str,
    },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Human-readable keys identifying one pod-member assignment.
#[derive(Debug, Clone)]
pub struct PodAssignment {
    pub organization_name: String,
    pub batch_name: String,
    pub pod_name: String,
    pub member_identifier: String,
}

/// Human-readable keys identifying one batch-concept assignment.
#[derive(Debug, Clone)]
pub struct ConceptAssignment {
    pub organization_name: String,
    pub batch_name: String,
    pub concept_name: String,
}

struct OrgRef {
    org_id: Uuid,
    max_users_per_batch: i32,
    max_users_per_pod: i32,
}

/// Membership assignment flows. Each mutation resolves its
/// human-readable keys, re-checks active status, enforces capacity
/// ceilings where they apply, and inserts or deletes the join row, all
/// within a single transaction. Any failure drops the transaction,
/// which rolls back.
pub struct AssignmentService {
    pool: PgPool,
}

impl AssignmentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Assign an orguser to a pod, enforcing the organization's per-pod
    /// and per-batch ceilings. The batch and pod rows are locked FOR
    /// UPDATE before counting, so two concurrent assignments against the
    /// same batch serialize and cannot jointly overshoot a ceiling.
    pub async fn assign_user_to_pod(
        &self,
        assignment: &PodAssignment,
    ) -> Result<(), AssignmentError> {
        let mut tx = self.pool.begin().await?;

        let org = resolve_organization(&mut tx, &assignment.organization_name).await?;
        let batch_id =
            resolve_active_batch(&mut tx, &assignment.batch_name, org.org_id, true).await?;
        let pod_id = resolve_active_pod(&mut tx, &assignment.pod_name, batch_id, true).await?;
        let user_id = resolve_orguser(&mut tx, &assignment.member_identifier, org.org_id).await?;

        // Pod ceiling is checked before the batch ceiling; when both are
        // at capacity the pod error surfaces.
        let (pod_count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM pod_users WHERE pod_id = $1")
                .bind(pod_id)
                .fetch_one(&mut *tx)
                .await?;
        if pod_count >= org.max_users_per_pod as i64 {
            return Err(AssignmentError::PodCapacityReached(org.max_users_per_pod));
        }

        let (batch_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(DISTINCT pu.user_id)
             FROM pod_users pu
             JOIN pods p ON pu.pod_id = p.pod_id
             WHERE p.batch_id = $1",
        )
        .bind(batch_id)
        .fetch_one(&mut *tx)
        .await?;
        if batch_count >= org.max_users_per_batch as i64 {
            return Err(AssignmentError::BatchCapacityReached(
                org.max_users_per_batch,
            ));
        }

        // The primary key on (pod_id, user_id) is the authoritative
        // duplicate check.
        sqlx::query("INSERT INTO pod_users (pod_id, user_id) VALUES ($1, $2)")
            .bind(pod_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AssignmentError::AlreadyAssigned {
                        member: "Orguser",
                        target: "pod",
                    }
                } else {
                    AssignmentError::Database(e)
                }
            })?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove an orguser from a pod.
    pub async fn remove_user_from_pod(
        &self,
        assignment: &PodAssignment,
    ) -> Result<(), AssignmentError> {
        let mut tx = self.pool.begin().await?;

        let org = resolve_organization(&mut tx, &assignment.organization_name).await?;
        let batch_id =
            resolve_active_batch(&mut tx, &assignment.batch_name, org.org_id, false).await?;
        let pod_id = resolve_active_pod(&mut tx, &assignment.pod_name, batch_id, false).await?;
        let user_id = resolve_orguser(&mut tx, &assignment.member_identifier, org.org_id).await?;

        let result = sqlx::query("DELETE FROM pod_users WHERE pod_id = $1 AND user_id = $2")
            .bind(pod_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AssignmentError::NotAssigned {
                member: "Orguser",
                target: "pod",
            });
        }

        tx.commit().await?;
        Ok(())
    }

    /// Assign a mentor to a pod. No capacity ceiling applies; active
    /// status and uniqueness are still enforced.
    pub async fn assign_mentor_to_pod(
        &self,
        assignment: &PodAssignment,
    ) -> Result<(), AssignmentError> {
        let mut tx = self.pool.begin().await?;

        let org = resolve_organization(&mut tx, &assignment.organization_name).await?;
        let batch_id =
            resolve_active_batch(&mut tx, &assignment.batch_name, org.org_id, false).await?;
        let pod_id = resolve_active_pod(&mut tx, &assignment.pod_name, batch_id, false).await?;

        let mentor: Option<(Uuid,)> = sqlx::query_as(
            "SELECT mentor_id FROM mentors WHERE mentor_email = $1 AND is_active = TRUE",
        )
        .bind(&assignment.member_identifier)
        .fetch_optional(&mut *tx)
        .await?;
        let (mentor_id,) = mentor.ok_or(AssignmentError::MentorNotFound)?;

        sqlx::query("INSERT INTO pod_mentors (pod_id, mentor_id) VALUES ($1, $2)")
            .bind(pod_id)
            .bind(mentor_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AssignmentError::AlreadyAssigned {
                        member: "Mentor",
                        target: "pod",
                    }
                } else {
                    AssignmentError::Database(e)
                }
            })?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove a mentor from a pod. An inactive mentor can still be
    /// removed; only assignment requires the mentor to be active.
    pub async fn remove_mentor_from_pod(
        &self,
        assignment: &PodAssignment,
    ) -> Result<(), AssignmentError> {
        let mut tx = self.pool.begin().await?;

        let org = resolve_organization(&mut tx, &assignment.organization_name).await?;
        let batch_id =
            resolve_active_batch(&mut tx, &assignment.batch_name, org.org_id, false).await?;
        let pod_id = resolve_active_pod(&mut tx, &assignment.pod_name, batch_id, false).await?;

        let mentor: Option<(Uuid,)> =
            sqlx::query_as("SELECT mentor_id FROM mentors WHERE mentor_email = $1")
                .bind(&assignment.member_identifier)
                .fetch_optional(&mut *tx)
                .await?;
        let (mentor_id,) = mentor.ok_or(AssignmentError::MentorNotFound)?;

        let result = sqlx::query("DELETE FROM pod_mentors WHERE pod_id = $1 AND mentor_id = $2")
            .bind(pod_id)
            .bind(mentor_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AssignmentError::NotAssigned {
                member: "Mentor",
                target: "pod",
            });
        }

        tx.commit().await?;
        Ok(())
    }

    /// Assign a concept to a batch.
    pub async fn assign_concept_to_batch(
        &self,
        assignment: &ConceptAssignment,
    ) -> Result<(), AssignmentError> {
        let mut tx = self.pool.begin().await?;

        let org = resolve_organization(&mut tx, &assignment.organization_name).await?;
        let batch_id =
            resolve_active_batch(&mut tx, &assignment.batch_name, org.org_id, false).await?;
        let concept_id = resolve_active_concept(&mut tx, &assignment.concept_name).await?;

        sqlx::query("INSERT INTO batch_concepts (batch_id, concept_id) VALUES ($1, $2)")
            .bind(batch_id)
            .bind(concept_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AssignmentError::AlreadyAssigned {
                        member: "Concept",
                        target: "batch",
                    }
                } else {
                    AssignmentError::Database(e)
                }
            })?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove a concept from a batch.
    pub async fn remove_concept_from_batch(
        &self,
        assignment: &ConceptAssignment,
    ) -> Result<(), AssignmentError> {
        let mut tx = self.pool.begin().await?;

        let org = resolve_organization(&mut tx, &assignment.organization_name).await?;
        let batch_id =
            resolve_active_batch(&mut tx, &assignment.batch_name, org.org_id, false).await?;
        let concept_id = resolve_active_concept(&mut tx, &assignment.concept_name).await?;

        let result =
            sqlx::query("DELETE FROM batch_concepts WHERE batch_id = $1 AND concept_id = $2")
                .bind(batch_id)
                .bind(concept_id)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AssignmentError::NotAssigned {
                member: "Concept",
                target: "batch",
            });
        }

        tx.commit().await?;
        Ok(())
    }

    /// Orgusers assigned to an active pod.
    pub async fn list_pod_users(&self, pod_id: Uuid) -> Result<Vec<PodMember>, AssignmentError> {
        self.require_active_pod(pod_id).await?;

        let users = sqlx::query_as::<_, PodMember>(
            "SELECT u.user_id, u.email, u.username, u.first_name, u.last_name,
                    o.name AS organization_name
             FROM users u
             JOIN pod_users pu ON u.user_id = pu.user_id
             JOIN organizations o ON u.organization_id = o.org_id
             WHERE pu.pod_id = $1
             ORDER BY u.email",
        )
        .bind(pod_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Mentors assigned to an active pod.
    pub async fn list_pod_mentors(&self, pod_id: Uuid) -> Result<Vec<Mentor>, AssignmentError> {
        self.require_active_pod(pod_id).await?;

        let mentors = sqlx::query_as::<_, Mentor>(
            "SELECT m.mentor_id, m.mentor_name, m.mentor_email, m.is_active,
                    m.created_at, m.updated_at
             FROM mentors m
             JOIN pod_mentors pm ON m.mentor_id = pm.mentor_id
             WHERE pm.pod_id = $1
             ORDER BY m.mentor_name",
        )
        .bind(pod_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(mentors)
    }

    /// Active concepts assigned to the batch an active pod belongs to.
    pub async fn list_pod_concepts(&self, pod_id: Uuid) -> Result<Vec<Concept>, AssignmentError> {
        let pod: Option<(Uuid,)> =
            sqlx::query_as("SELECT batch_id FROM pods WHERE pod_id = $1 AND is_active = TRUE")
                .bind(pod_id)
                .fetch_optional(&self.pool)
                .await?;
        let (batch_id,) = pod.ok_or(AssignmentError::PodNotFound)?;

        let batch: Option<(Uuid,)> =
            sqlx::query_as("SELECT batch_id FROM batches WHERE batch_id = $1 AND is_active = TRUE")
                .bind(batch_id)
                .fetch_optional(&self.pool)
                .await?;
        batch.ok_or(AssignmentError::BatchNotFound)?;

        let concepts = sqlx::query_as::<_, Concept>(
            "SELECT c.concept_id, c.concept_name, c.is_active, c.created_at, c.updated_at
             FROM concepts c
             JOIN batch_concepts bc ON c.concept_id = bc.concept_id
             WHERE bc.batch_id = $1 AND c.is_active = TRUE
             ORDER BY c.concept_name",
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(concepts)
    }

    async fn require_active_pod(&self, pod_id: Uuid) -> Result<(), AssignmentError> {
        let pod: Option<(Uuid,)> =
            sqlx::query_as("SELECT pod_id FROM pods WHERE pod_id = $1 AND is_active = TRUE")
                .bind(pod_id)
                .fetch_optional(&self.pool)
                .await?;
        pod.map(|_| ()).ok_or(AssignmentError::PodNotFound)
    }
}

async fn resolve_organization(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
) -> Result<OrgRef, AssignmentError> {
    let org: Option<(Uuid, i32, i32)> = sqlx::query_as(
        "SELECT org_id, max_users_per_batch, max_users_per_pod
         FROM organizations WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(&mut **tx)
    .await?;

    org.map(|(org_id, max_users_per_batch, max_users_per_pod)| OrgRef {
        org_id,
        max_users_per_batch,
        max_users_per_pod,
    })
    .ok_or(AssignmentError::OrganizationNotFound)
}

async fn resolve_active_batch(
    tx: &mut Transaction<'_, Postgres>,
    batch_name: &str,
    org_id: Uuid,
    lock: bool,
) -> Result<Uuid, AssignmentError> {
    // The locked variant serializes capacity-guarded assignments per
    // batch: the count-then-insert sequence cannot interleave.
    let sql = if lock {
        "SELECT batch_id FROM batches
         WHERE batch_name = $1 AND org_id = $2 AND is_active = TRUE FOR UPDATE"
    } else {
        "SELECT batch_id FROM batches
         WHERE batch_name = $1 AND org_id = $2 AND is_active = TRUE"
    };

    let batch: Option<(Uuid,)> = sqlx::query_as(sql)
        .bind(batch_name)
        .bind(org_id)
        .fetch_optional(&mut **tx)
        .await?;

    batch
        .map(|(batch_id,)| batch_id)
        .ok_or(AssignmentError::BatchNotFound)
}

async fn resolve_active_pod(
    tx: &mut Transaction<'_, Postgres>,
    pod_name: &str,
    batch_id: Uuid,
    lock: bool,
) -> Result<Uuid, AssignmentError> {
    let sql = if lock {
        "SELECT pod_id FROM pods
         WHERE pod_name = $1 AND batch_id = $2 AND is_active = TRUE FOR UPDATE"
    } else {
        "SELECT pod_id FROM pods
         WHERE pod_name = $1 AND batch_id = $2 AND is_active = TRUE"
    };

    let pod: Option<(Uuid,)> = sqlx::query_as(sql)
        .bind(pod_name)
        .bind(batch_id)
        .fetch_optional(&mut **tx)
        .await?;

    pod.map(|(pod_id,)| pod_id)
        .ok_or(AssignmentError::PodNotFound)
}

async fn resolve_active_concept(
    tx: &mut Transaction<'_, Postgres>,
    concept_name: &str,
) -> Result<Uuid, AssignmentError> {
    let concept: Option<(Uuid,)> = sqlx::query_as(
        "SELECT concept_id FROM concepts
         WHERE concept_name = $1 AND is_active = TRUE",
    )
    .bind(concept_name)
    .fetch_optional(&mut **tx)
    .await?;

    concept
        .map(|(concept_id,)| concept_id)
        .ok_or(AssignmentError::ConceptNotFound)
}

async fn resolve_orguser(
    tx: &mut Transaction<'_, Postgres>,
    email: &str,
    org_id: Uuid,
) -> Result<Uuid, AssignmentError> {
    let user: Option<(Uuid,)> = sqlx::query_as(
        "SELECT u.user_id
         FROM users u
         JOIN roles r ON u.role_id = r.role_id
         WHERE u.email = $1 AND r.name = 'orguser'
           AND u.organization_id = $2 AND u.is_active = TRUE",
    )
    .bind(email)
    .bind(org_id)
    .fetch_optional(&mut **tx)
    .await?;

    user.map(|(user_id,)| user_id)
        .ok_or(AssignmentError::OrguserNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    #[test]
    fn capacity_errors_map_to_400() {
        let err: ApiError = AssignmentError::PodCapacityReached(6).into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.message(), "Pod has reached maximum user limit of 6");

        let err: ApiError = AssignmentError::BatchCapacityReached(10).into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.message(), "Batch has reached maximum user limit of 10");
    }

    #[test]
    fn duplicate_assignment_maps_to_conflict() {
        let err: ApiError = AssignmentError::AlreadyAssigned {
            member: "Orguser",
            target: "pod",
        }
        .into();
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.message(), "Orguser already assigned to this pod");
    }

    #[test]
    fn missing_entities_map_to_404() {
        for err in [
            AssignmentError::OrganizationNotFound,
            AssignmentError::BatchNotFound,
            AssignmentError::PodNotFound,
            AssignmentError::OrguserNotFound,
            AssignmentError::MentorNotFound,
            AssignmentError::ConceptNotFound,
            AssignmentError::NotAssigned {
                member: "Mentor",
                target: "pod",
            },
        ] {
            let api: ApiError = err.into();
            assert_eq!(api.status_code(), 404);
        }
    }
}
