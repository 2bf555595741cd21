//! A3 module routes — metadata CRUD, editor commands, and analysis.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use time::Date;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::services::module::{
    self, A3Module, CommandOutcome, ModuleAnalysis, ModuleCommand, ModulePatch, NewModule, PhaseModules,
};
use crate::services::project::PdcaPhase;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListModulesQuery {
    pub phase: Option<PdcaPhase>,
}

#[derive(Deserialize)]
pub struct AnalysisQuery {
    /// Reference date for overdue checks; defaults to today (UTC).
    pub as_of: Option<Date>,
}

/// `GET /api/projects/:id/modules?phase=`
pub async fn list_modules(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ListModulesQuery>,
) -> Result<Json<Vec<A3Module>>, ApiError> {
    Ok(Json(module::list_modules(&state, &auth.user, project_id, query.phase).await?))
}

/// `POST /api/projects/:id/modules`
pub async fn create_module(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
    Json(body): Json<NewModule>,
) -> Result<(StatusCode, Json<A3Module>), ApiError> {
    let created = module::create_module(&state, &auth.user, project_id, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/projects/:id/a3` — modules grouped by PDCA phase.
pub async fn a3_overview(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<PhaseModules>>, ApiError> {
    Ok(Json(module::a3_overview(&state, &auth.user, project_id).await?))
}

/// `GET /api/modules/:id`
pub async fn get_module(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(module_id): Path<Uuid>,
) -> Result<Json<A3Module>, ApiError> {
    Ok(Json(module::get_module(&state, &auth.user, module_id).await?))
}

/// `PATCH /api/modules/:id`
pub async fn update_module(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(module_id): Path<Uuid>,
    Json(patch): Json<ModulePatch>,
) -> Result<Json<A3Module>, ApiError> {
    Ok(Json(module::update_module(&state, &auth.user, module_id, patch).await?))
}

/// `DELETE /api/modules/:id`
pub async fn delete_module(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(module_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    module::delete_module(&state, &auth.user, module_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/modules/:id/commands` — apply one editor command.
pub async fn apply_command(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(module_id): Path<Uuid>,
    Json(command): Json<ModuleCommand>,
) -> Result<Json<CommandOutcome>, ApiError> {
    Ok(Json(module::apply_command(&state, &auth.user, module_id, command).await?))
}

/// `GET /api/modules/:id/analysis?as_of=YYYY-MM-DD`
pub async fn analyze_module(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(module_id): Path<Uuid>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<ModuleAnalysis>, ApiError> {
    let today = query.as_of.unwrap_or_else(super::today);
    Ok(Json(module::analyze_module(&state, &auth.user, module_id, today).await?))
}

#[cfg(test)]
#[path = "modules_test.rs"]
mod tests;
