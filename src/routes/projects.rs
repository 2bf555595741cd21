//! Project and project member routes.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::services::auth as auth_svc;
use crate::services::member::{self, MemberRole, MemberView, ProjectMember};
use crate::services::project::{self, NewProject, Project, ProjectPatch, ProjectStatus, ProjectSummary};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListProjectsQuery {
    pub status: Option<ProjectStatus>,
}

#[derive(Deserialize)]
pub struct SetStatusBody {
    pub status: ProjectStatus,
}

#[derive(Deserialize)]
pub struct UpsertMemberBody {
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub role: MemberRole,
}

#[derive(Deserialize)]
pub struct UpdateMemberBody {
    pub role: MemberRole,
}

// =============================================================================
// PROJECTS
// =============================================================================

/// `GET /api/projects` — the caller's projects, optionally by status.
pub async fn list_projects(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListProjectsQuery>,
) -> Json<Vec<Project>> {
    Json(project::list_projects(&state, &auth.user, query.status).await)
}

/// `POST /api/projects` — create a project led by the caller.
pub async fn create_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewProject>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let created = project::create_project(&state, &auth.user, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/projects/:id`
pub async fn get_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(project::get_project(&state, &auth.user, project_id).await?))
}

/// `PATCH /api/projects/:id`
pub async fn update_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
    Json(patch): Json<ProjectPatch>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(project::update_project(&state, &auth.user, project_id, patch).await?))
}

/// `DELETE /api/projects/:id` — delete with all members, actions, and modules.
pub async fn delete_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    project::delete_project(&state, &auth.user, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/projects/:id/advance` — next PDCA phase.
pub async fn advance_phase(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(project::advance_phase(&state, &auth.user, project_id).await?))
}

/// `PUT /api/projects/:id/status`
pub async fn set_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
    Json(body): Json<SetStatusBody>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(project::set_status(&state, &auth.user, project_id, body.status).await?))
}

/// `GET /api/projects/:id/summary` — dashboard card.
pub async fn project_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectSummary>, ApiError> {
    Ok(Json(project::project_summary(&state, &auth.user, project_id, super::today()).await?))
}

// =============================================================================
// MEMBERS
// =============================================================================

/// `GET /api/projects/:id/members`
pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<MemberView>>, ApiError> {
    Ok(Json(member::list_members(&state, &auth.user, project_id).await?))
}

/// `POST /api/projects/:id/members` — add or re-role a member by id or email.
pub async fn upsert_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
    Json(body): Json<UpsertMemberBody>,
) -> Result<Json<ProjectMember>, ApiError> {
    let target_user_id = match (body.user_id, body.email.as_deref()) {
        (Some(user_id), _) => user_id,
        (None, Some(email)) => auth_svc::find_user_by_email(&state, email)
            .await
            .map(|u| u.id)
            .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "E_USER_NOT_FOUND", format!("no user with email {email}")))?,
        (None, None) => {
            return Err(ApiError::new(StatusCode::BAD_REQUEST, "E_MEMBER_TARGET", "user_id or email is required"));
        }
    };

    Ok(Json(member::upsert_member(&state, &auth.user, project_id, target_user_id, body.role).await?))
}

/// `PATCH /api/projects/:id/members/:user_id` — change a member's role.
pub async fn update_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project_id, member_user_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateMemberBody>,
) -> Result<Json<ProjectMember>, ApiError> {
    Ok(Json(member::update_member(&state, &auth.user, project_id, member_user_id, body.role).await?))
}

/// `DELETE /api/projects/:id/members/:user_id`
pub async fn delete_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project_id, member_user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    member::remove_member(&state, &auth.user, project_id, member_user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "projects_test.rs"]
mod tests;
