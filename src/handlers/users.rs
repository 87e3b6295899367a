use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::database::is_unique_violation;
use crate::database::models::{Concept, CreatedAccount, Mentor};
use crate::error::ApiError;
use crate::state::AppState;

use super::is_valid_email;

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub orgname: Option<String>,
}

#[derive(Debug)]
struct ValidAccount {
    email: String,
    username: String,
    password: String,
    first_name: String,
    last_name: String,
    orgname: Option<String>,
}

fn validate_account(req: CreateAccountRequest, needs_org: bool) -> Result<ValidAccount, ApiError> {
    let missing_message = if needs_org {
        "All fields (email, username, password, first_name, last_name, orgname) are required"
    } else {
        "All fields (email, username, password, first_name, last_name) are required"
    };

    let present = |v: Option<String>| v.filter(|s| !s.is_empty());

    let email = present(req.email).ok_or_else(|| ApiError::bad_request(missing_message))?;
    let username = present(req.username).ok_or_else(|| ApiError::bad_request(missing_message))?;
    let password = present(req.password).ok_or_else(|| ApiError::bad_request(missing_message))?;
    let first_name =
        present(req.first_name).ok_or_else(|| ApiError::bad_request(missing_message))?;
    let last_name = present(req.last_name).ok_or_else(|| ApiError::bad_request(missing_message))?;
    let orgname = present(req.orgname);
    if needs_org && orgname.is_none() {
        return Err(ApiError::bad_request(missing_message));
    }

    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email format"));
    }
    if password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters long",
        ));
    }

    Ok(ValidAccount {
        email,
        username,
        password,
        first_name,
        last_name,
        orgname,
    })
}

async fn create_account(
    pool: &PgPool,
    role_name: &str,
    account: ValidAccount,
) -> Result<CreatedAccount, ApiError> {
    let role: Option<(Uuid,)> = sqlx::query_as("SELECT role_id FROM roles WHERE name = $1")
        .bind(role_name)
        .fetch_optional(pool)
        .await?;
    let (role_id,) = role.ok_or_else(|| {
        tracing::error!("Role '{}' missing from roles table", role_name);
        ApiError::internal_server_error(format!("{} role not found", capitalize(role_name)))
    })?;

    let organization_id = match &account.orgname {
        Some(orgname) => {
            let org: Option<(Uuid,)> =
                sqlx::query_as("SELECT org_id FROM organizations WHERE name = $1")
                    .bind(orgname)
                    .fetch_optional(pool)
                    .await?;
            let (org_id,) = org.ok_or_else(|| ApiError::not_found("Organization not found"))?;
            Some(org_id)
        }
        None => None,
    };

    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT user_id FROM users WHERE email = $1 OR username = $2")
            .bind(&account.email)
            .bind(&account.username)
            .fetch_optional(pool)
            .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("Email or username already exists"));
    }

    let password_hash = hash_password(&account.password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        ApiError::internal_server_error("Internal server error")
    })?;

    let created = sqlx::query_as::<_, CreatedAccount>(
        "INSERT INTO users (role_id, organization_id, email, username, password_hash,
                            first_name, last_name, is_active)
         VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
         RETURNING user_id, email, username, first_name, last_name, organization_id,
                   is_active, created_at",
    )
    .bind(role_id)
    .bind(organization_id)
    .bind(&account.email)
    .bind(&account.username)
    .bind(&password_hash)
    .bind(&account.first_name)
    .bind(&account.last_name)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        // The unique constraints close the race the pre-check leaves open
        if is_unique_violation(&e) {
            ApiError::conflict("Email or username already exists")
        } else {
            e.into()
        }
    })?;

    Ok(created)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// POST /api/superadmin - Create a superadmin (no organization)
pub async fn create_superadmin(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let account = validate_account(req, false)?;
    let created = create_account(&state.pool, "superadmin", account).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Superadmin created successfully",
            "superadmin": created,
        })),
    ))
}

/// POST /api/orgadmin - Create an orgadmin within an organization
pub async fn create_orgadmin(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let account = validate_account(req, true)?;
    let created = create_account(&state.pool, "orgadmin", account).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Orgadmin created successfully",
            "orgadmin": created,
        })),
    ))
}

/// POST /api/orguser - Create an orguser within an organization
pub async fn create_orguser(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let account = validate_account(req, true)?;
    let created = create_account(&state.pool, "orguser", account).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Orguser created successfully",
            "orguser": created,
        })),
    ))
}

#[derive(Debug, FromRow)]
struct OrguserRow {
    user_id: Uuid,
    email: String,
    organization_name: String,
}

#[derive(Debug, FromRow)]
struct UserPodRow {
    pod_id: Uuid,
    pod_name: String,
    batch_id: Uuid,
    batch_name: String,
}

/// GET /api/orgusers/:email - Aggregate an active orguser's pods with
/// their batches, mentors, and batch concepts
pub async fn orguser_details(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user: Option<OrguserRow> = sqlx::query_as(
        "SELECT u.user_id, u.email, o.name AS organization_name
         FROM users u
         JOIN roles r ON u.role_id = r.role_id
         JOIN organizations o ON u.organization_id = o.org_id
         WHERE u.email = $1 AND r.name = 'orguser' AND u.is_active = TRUE",
    )
    .bind(&email)
    .fetch_optional(&state.pool)
    .await?;
    let user = user.ok_or_else(|| ApiError::not_found("Active orguser not found"))?;

    let pods: Vec<UserPodRow> = sqlx::query_as(
        "SELECT p.pod_id, p.pod_name, b.batch_id, b.batch_name
         FROM pod_users pu
         JOIN pods p ON pu.pod_id = p.pod_id
         JOIN batches b ON p.batch_id = b.batch_id
         WHERE pu.user_id = $1 AND p.is_active = TRUE AND b.is_active = TRUE
         ORDER BY p.pod_name",
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    let mut pod_details = Vec::with_capacity(pods.len());
    for pod in pods {
        let mentors: Vec<Mentor> = sqlx::query_as(
            "SELECT m.mentor_id, m.mentor_name, m.mentor_email, m.is_active,
                    m.created_at, m.updated_at
             FROM pod_mentors pm
             JOIN mentors m ON pm.mentor_id = m.mentor_id
             WHERE pm.pod_id = $1 AND m.is_active = TRUE",
        )
        .bind(pod.pod_id)
        .fetch_all(&state.pool)
        .await?;

        let concepts: Vec<Concept> = sqlx::query_as(
            "SELECT c.concept_id, c.concept_name, c.is_active, c.created_at, c.updated_at
             FROM batch_concepts bc
             JOIN concepts c ON bc.concept_id = c.concept_id
             WHERE bc.batch_id = $1 AND c.is_active = TRUE",
        )
        .bind(pod.batch_id)
        .fetch_all(&state.pool)
        .await?;

        pod_details.push(json!({
            "pod_id": pod.pod_id,
            "pod_name": pod.pod_name,
            "batch_id": pod.batch_id,
            "batch_name": pod.batch_name,
            "mentors": mentors,
            "concepts": concepts,
        }));
    }

    Ok(Json(json!({
        "user": {
            "email": user.email,
            "organization_name": user.organization_name,
            "pods": pod_details,
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateAccountRequest {
        CreateAccountRequest {
            email: Some("user@example.com".into()),
            username: Some("user".into()),
            password: Some("longenough".into()),
            first_name: Some("First".into()),
            last_name: Some("Last".into()),
            orgname: Some("Acme".into()),
        }
    }

    #[test]
    fn accepts_complete_request() {
        let account = validate_account(request(), true).unwrap();
        assert_eq!(account.email, "user@example.com");
        assert_eq!(account.orgname.as_deref(), Some("Acme"));
    }

    #[test]
    fn requires_orgname_for_org_roles_only() {
        let mut req = request();
        req.orgname = None;
        assert!(validate_account(req, true).is_err());

        let mut req = request();
        req.orgname = None;
        assert!(validate_account(req, false).is_ok());
    }

    #[test]
    fn rejects_short_password() {
        let mut req = request();
        req.password = Some("short".into());
        let err = validate_account(req, true).unwrap_err();
        assert_eq!(err.message(), "Password must be at least 8 characters long");
    }

    #[test]
    fn rejects_malformed_email() {
        let mut req = request();
        req.email = Some("not-an-email".into());
        let err = validate_account(req, true).unwrap_err();
        assert_eq!(err.message(), "Invalid email format");
    }

    #[test]
    fn capitalizes_role_names() {
        assert_eq!(capitalize("orguser"), "Orguser");
        assert_eq!(capitalize(""), "");
    }
}
