//! Project service — Kaizen project CRUD, PDCA progression, dashboard summary.
//!
//! DESIGN
//! ======
//! A project is the root of every other entity. Deleting one cascades to its
//! members, actions, and A3 modules in the same critical section, so no
//! dangling foreign key survives the call.
//!
//! PDCA
//! ====
//! Phases move Plan → Do → Check → Act and back to Plan, which starts a new
//! cycle. Leaving Plan for the first time activates a draft project. Closed
//! projects (completed or cancelled) cannot move.

use std::collections::HashMap;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::editors::indicators::Trend;
use crate::editors::nullable;
use crate::error::ErrorCode;
use crate::services::action::{self, ActionPlanSummary};
use crate::services::auth::SessionUser;
use crate::services::member::{MemberRole, Permission, ProjectMember, ensure_permission};
use crate::services::module::ModuleContent;
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdcaPhase {
    #[default]
    Plan,
    Do,
    Check,
    Act,
}

impl PdcaPhase {
    pub const ALL: [Self; 4] = [Self::Plan, Self::Do, Self::Check, Self::Act];

    /// The following phase; `Act` wraps to `Plan`.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Plan => Self::Do,
            Self::Do => Self::Check,
            Self::Check => Self::Act,
            Self::Act => Self::Plan,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Draft,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    #[must_use]
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Workshop, line, or department the improvement targets.
    pub area: String,
    pub status: ProjectStatus,
    pub phase: PdcaPhase,
    pub cycle: u32,
    pub owner_id: Uuid,
    pub start_date: Option<Date>,
    pub target_date: Option<Date>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProject {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub area: String,
    pub start_date: Option<Date>,
    pub target_date: Option<Date>,
}

/// Partial update; `null` clears a date, a missing key keeps it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub area: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub start_date: Option<Option<Date>>,
    #[serde(default, deserialize_with = "nullable")]
    pub target_date: Option<Option<Date>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("project not found: {0}")]
    NotFound(Uuid),
    #[error("not permitted on project: {0}")]
    Forbidden(Uuid),
    #[error("project title must not be blank")]
    TitleRequired,
    #[error("target date {target} is before start date {start}")]
    InvalidDates { start: Date, target: Date },
    #[error("project is {0:?}; its phase cannot change")]
    Closed(ProjectStatus),
    #[error("user not found: {0}")]
    UserNotFound(Uuid),
    #[error("user is not a project member: {0}")]
    NotMember(Uuid),
    #[error("a project must keep at least one leader")]
    LastLeader,
}

impl ErrorCode for ProjectError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_PROJECT_NOT_FOUND",
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::TitleRequired => "E_TITLE_REQUIRED",
            Self::InvalidDates { .. } => "E_INVALID_DATES",
            Self::Closed(_) => "E_PROJECT_CLOSED",
            Self::UserNotFound(_) => "E_USER_NOT_FOUND",
            Self::NotMember(_) => "E_NOT_MEMBER",
            Self::LastLeader => "E_LAST_LEADER",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) | Self::UserNotFound(_) | Self::NotMember(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::TitleRequired | Self::InvalidDates { .. } => StatusCode::BAD_REQUEST,
            Self::Closed(_) | Self::LastLeader => StatusCode::CONFLICT,
        }
    }
}

fn require_title(title: &str) -> Result<String, ProjectError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ProjectError::TitleRequired);
    }
    Ok(title.to_owned())
}

fn check_dates(start: Option<Date>, target: Option<Date>) -> Result<(), ProjectError> {
    match (start, target) {
        (Some(start), Some(target)) if target < start => Err(ProjectError::InvalidDates { start, target }),
        _ => Ok(()),
    }
}

// =============================================================================
// CRUD
// =============================================================================

/// Create a project. The creator becomes its first leader.
///
/// # Errors
///
/// `TitleRequired` for a blank title, `InvalidDates` when the target date
/// precedes the start date.
pub async fn create_project(state: &AppState, owner: &SessionUser, new: NewProject) -> Result<Project, ProjectError> {
    let title = require_title(&new.title)?;
    check_dates(new.start_date, new.target_date)?;

    let now = OffsetDateTime::now_utc();
    let project = Project {
        id: Uuid::new_v4(),
        title,
        description: new.description.trim().to_owned(),
        area: new.area.trim().to_owned(),
        status: ProjectStatus::Draft,
        phase: PdcaPhase::Plan,
        cycle: 1,
        owner_id: owner.id,
        start_date: new.start_date,
        target_date: new.target_date,
        created_at: now,
        updated_at: now,
    };

    let mut store = state.store.write().await;
    store.projects.insert(project.id, project.clone());
    store
        .members
        .push(ProjectMember { project_id: project.id, user_id: owner.id, role: MemberRole::Leader, joined_at: now });
    info!(project_id = %project.id, owner_id = %owner.id, "project created");
    Ok(project)
}

/// Projects the user belongs to, newest first.
pub async fn list_projects(state: &AppState, user: &SessionUser, status: Option<ProjectStatus>) -> Vec<Project> {
    let store = state.store.read().await;
    let mut projects: Vec<Project> = store
        .members
        .iter()
        .filter(|m| m.user_id == user.id)
        .filter_map(|m| store.projects.get(&m.project_id))
        .filter(|p| status.is_none_or(|s| p.status == s))
        .cloned()
        .collect();
    projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.title.cmp(&b.title)));
    projects
}

/// Fetch one project.
///
/// # Errors
///
/// `NotFound` if missing or not visible to `user`.
pub async fn get_project(state: &AppState, user: &SessionUser, project_id: Uuid) -> Result<Project, ProjectError> {
    let store = state.store.read().await;
    ensure_permission(&store, project_id, user.id, Permission::View)?;
    store
        .projects
        .get(&project_id)
        .cloned()
        .ok_or(ProjectError::NotFound(project_id))
}

/// Patch project metadata.
///
/// # Errors
///
/// `TitleRequired`, `InvalidDates`, plus permission errors.
pub async fn update_project(
    state: &AppState,
    user: &SessionUser,
    project_id: Uuid,
    patch: ProjectPatch,
) -> Result<Project, ProjectError> {
    let title = patch.title.as_deref().map(require_title).transpose()?;
    let mut store = state.store.write().await;
    ensure_permission(&store, project_id, user.id, Permission::Edit)?;

    let project = store
        .projects
        .get_mut(&project_id)
        .ok_or(ProjectError::NotFound(project_id))?;
    let start = patch.start_date.unwrap_or(project.start_date);
    let target = patch.target_date.unwrap_or(project.target_date);
    check_dates(start, target)?;

    if let Some(title) = title {
        project.title = title;
    }
    if let Some(description) = patch.description {
        project.description = description.trim().to_owned();
    }
    if let Some(area) = patch.area {
        project.area = area.trim().to_owned();
    }
    project.start_date = start;
    project.target_date = target;
    project.updated_at = OffsetDateTime::now_utc();
    info!(%project_id, "project updated");
    Ok(project.clone())
}

/// Delete a project together with its members, actions, and modules.
///
/// # Errors
///
/// Permission errors only; requires the leader role.
pub async fn delete_project(state: &AppState, user: &SessionUser, project_id: Uuid) -> Result<(), ProjectError> {
    let mut store = state.store.write().await;
    ensure_permission(&store, project_id, user.id, Permission::Admin)?;

    store.projects.remove(&project_id);
    store.members.retain(|m| m.project_id != project_id);
    store.actions.retain(|_, a| a.project_id != project_id);
    let modules_before = store.modules.len();
    store.modules.retain(|_, m| m.project_id != project_id);
    info!(%project_id, modules = modules_before - store.modules.len(), "project deleted");
    Ok(())
}

// =============================================================================
// PDCA
// =============================================================================

/// Move the project to its next PDCA phase.
///
/// # Errors
///
/// `Closed` for completed or cancelled projects, plus permission errors.
pub async fn advance_phase(state: &AppState, user: &SessionUser, project_id: Uuid) -> Result<Project, ProjectError> {
    let mut store = state.store.write().await;
    ensure_permission(&store, project_id, user.id, Permission::Edit)?;

    let project = store
        .projects
        .get_mut(&project_id)
        .ok_or(ProjectError::NotFound(project_id))?;
    if project.status.is_closed() {
        return Err(ProjectError::Closed(project.status));
    }

    let next = project.phase.next();
    if next == PdcaPhase::Plan {
        project.cycle += 1;
    }
    if project.phase == PdcaPhase::Plan && project.status == ProjectStatus::Draft {
        project.status = ProjectStatus::Active;
    }
    project.phase = next;
    project.updated_at = OffsetDateTime::now_utc();
    info!(%project_id, phase = ?project.phase, cycle = project.cycle, "project phase advanced");
    Ok(project.clone())
}

/// Set the lifecycle status.
///
/// # Errors
///
/// Permission errors only; requires the leader role.
pub async fn set_status(
    state: &AppState,
    user: &SessionUser,
    project_id: Uuid,
    status: ProjectStatus,
) -> Result<Project, ProjectError> {
    let mut store = state.store.write().await;
    ensure_permission(&store, project_id, user.id, Permission::Admin)?;

    let project = store
        .projects
        .get_mut(&project_id)
        .ok_or(ProjectError::NotFound(project_id))?;
    project.status = status;
    project.updated_at = OffsetDateTime::now_utc();
    info!(%project_id, ?status, "project status set");
    Ok(project.clone())
}

// =============================================================================
// SUMMARY
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseCount {
    pub phase: PdcaPhase,
    pub modules: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorRollup {
    pub total: usize,
    pub target_met: usize,
    pub improving: usize,
    pub degrading: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub project: Project,
    pub member_count: usize,
    pub actions: ActionPlanSummary,
    pub modules_by_phase: Vec<PhaseCount>,
    pub indicators: IndicatorRollup,
}

/// Dashboard card for one project as of `today`.
///
/// # Errors
///
/// `NotFound` if missing or not visible to `user`.
pub async fn project_summary(
    state: &AppState,
    user: &SessionUser,
    project_id: Uuid,
    today: Date,
) -> Result<ProjectSummary, ProjectError> {
    let store = state.store.read().await;
    ensure_permission(&store, project_id, user.id, Permission::View)?;
    let project = store
        .projects
        .get(&project_id)
        .cloned()
        .ok_or(ProjectError::NotFound(project_id))?;

    let mut per_phase: HashMap<PdcaPhase, usize> = HashMap::new();
    let mut indicators = IndicatorRollup::default();
    for module in store.project_modules(project_id) {
        *per_phase.entry(module.phase).or_default() += 1;
        if let ModuleContent::Indicators(board) = &module.content {
            for stats in board.analyze() {
                indicators.total += 1;
                indicators.target_met += usize::from(stats.target_met);
                match stats.trend {
                    Trend::Improving => indicators.improving += 1,
                    Trend::Degrading => indicators.degrading += 1,
                    Trend::Stable | Trend::InsufficientData => {}
                }
            }
        }
    }

    Ok(ProjectSummary {
        member_count: store.project_members(project_id).count(),
        actions: action::summarize(store.project_actions(project_id), today),
        modules_by_phase: PdcaPhase::ALL
            .iter()
            .map(|phase| PhaseCount { phase: *phase, modules: per_phase.get(phase).copied().unwrap_or(0) })
            .collect(),
        indicators,
        project,
    })
}

#[cfg(test)]
#[path = "project_test.rs"]
mod tests;
