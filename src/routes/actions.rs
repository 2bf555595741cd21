//! Action plan routes.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::services::action::{self, Action, ActionFilter, ActionPatch, ActionPlanSummary, NewAction};
use crate::state::AppState;

/// `GET /api/projects/:id/actions?status=&assignee_id=`
pub async fn list_actions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
    Query(filter): Query<ActionFilter>,
) -> Result<Json<Vec<Action>>, ApiError> {
    Ok(Json(action::list_actions(&state, &auth.user, project_id, filter).await?))
}

/// `POST /api/projects/:id/actions`
pub async fn create_action(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
    Json(body): Json<NewAction>,
) -> Result<(StatusCode, Json<Action>), ApiError> {
    let created = action::create_action(&state, &auth.user, project_id, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/projects/:id/actions/summary`
pub async fn action_plan_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ActionPlanSummary>, ApiError> {
    Ok(Json(action::action_plan_summary(&state, &auth.user, project_id, super::today()).await?))
}

/// `PATCH /api/actions/:id`
pub async fn update_action(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(action_id): Path<Uuid>,
    Json(patch): Json<ActionPatch>,
) -> Result<Json<Action>, ApiError> {
    Ok(Json(action::update_action(&state, &auth.user, action_id, patch).await?))
}

/// `DELETE /api/actions/:id`
pub async fn delete_action(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(action_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    action::delete_action(&state, &auth.user, action_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
