//! Action plan service — the project's countermeasures and their progress.
//!
//! DESIGN
//! ======
//! Actions belong to a project (not to a module), so the action-plan module
//! is a view over the project's actions. Assignees must be project members;
//! removing a member unassigns their open actions (see `member`).

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::editors::nullable;
use crate::error::ErrorCode;
use crate::services::auth::SessionUser;
use crate::services::member::{Permission, ensure_permission};
use crate::services::project::{PdcaPhase, ProjectError};
use crate::state::{AppState, EntityStore};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Todo,
    InProgress,
    Done,
    Cancelled,
}

impl ActionStatus {
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Todo | Self::InProgress)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<Date>,
    pub status: ActionStatus,
    pub priority: Priority,
    pub phase: PdcaPhase,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAction {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<Date>,
    pub priority: Option<Priority>,
    pub phase: Option<PdcaPhase>,
}

/// Partial update. `assignee_id: null` unassigns, `due_date: null` clears.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub assignee_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<Date>>,
    pub status: Option<ActionStatus>,
    pub priority: Option<Priority>,
    pub phase: Option<PdcaPhase>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ActionFilter {
    pub status: Option<ActionStatus>,
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionPlanSummary {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
    pub cancelled: usize,
    /// Done share of non-cancelled actions, 0 when there are none.
    pub progress: f64,
    pub overdue: Vec<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("action not found: {0}")]
    NotFound(Uuid),
    #[error("action title must not be blank")]
    TitleRequired,
    #[error("assignee is not a project member: {0}")]
    AssigneeNotMember(Uuid),
    #[error(transparent)]
    Project(#[from] ProjectError),
}

impl ErrorCode for ActionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_ACTION_NOT_FOUND",
            Self::TitleRequired => "E_TITLE_REQUIRED",
            Self::AssigneeNotMember(_) => "E_ASSIGNEE_NOT_MEMBER",
            Self::Project(e) => e.error_code(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::TitleRequired | Self::AssigneeNotMember(_) => StatusCode::BAD_REQUEST,
            Self::Project(e) => e.status(),
        }
    }
}

// =============================================================================
// SUMMARY
// =============================================================================

/// Roll up a set of actions as of `today`. Overdue ids are ordered by due
/// date, then creation time.
#[must_use]
pub fn summarize<'a>(actions: impl IntoIterator<Item = &'a Action>, today: Date) -> ActionPlanSummary {
    let mut summary =
        ActionPlanSummary { total: 0, todo: 0, in_progress: 0, done: 0, cancelled: 0, progress: 0.0, overdue: Vec::new() };
    let mut overdue = Vec::new();
    for action in actions {
        summary.total += 1;
        match action.status {
            ActionStatus::Todo => summary.todo += 1,
            ActionStatus::InProgress => summary.in_progress += 1,
            ActionStatus::Done => summary.done += 1,
            ActionStatus::Cancelled => summary.cancelled += 1,
        }
        if let Some(due) = action.due_date.filter(|&due| action.status.is_open() && due < today) {
            overdue.push((due, action.created_at, action.id));
        }
    }
    overdue.sort_unstable();
    summary.overdue = overdue.into_iter().map(|(_, _, id)| id).collect();
    let countable = summary.total - summary.cancelled;
    if countable > 0 {
        #[allow(clippy::cast_precision_loss)]
        let progress = summary.done as f64 / countable as f64;
        summary.progress = progress;
    }
    summary
}

// =============================================================================
// OPERATIONS
// =============================================================================

fn require_title(title: &str) -> Result<String, ActionError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ActionError::TitleRequired);
    }
    Ok(title.to_owned())
}

fn check_assignee(store: &EntityStore, project_id: Uuid, assignee: Option<Uuid>) -> Result<(), ActionError> {
    match assignee {
        Some(user_id) if store.member(project_id, user_id).is_none() => Err(ActionError::AssigneeNotMember(user_id)),
        _ => Ok(()),
    }
}

/// Create an action on a project.
///
/// # Errors
///
/// `TitleRequired`, `AssigneeNotMember`, plus permission errors.
pub async fn create_action(
    state: &AppState,
    user: &SessionUser,
    project_id: Uuid,
    new: NewAction,
) -> Result<Action, ActionError> {
    let title = require_title(&new.title)?;
    let mut store = state.store.write().await;
    ensure_permission(&store, project_id, user.id, Permission::Edit)?;
    check_assignee(&store, project_id, new.assignee_id)?;

    let phase = match (new.phase, store.projects.get(&project_id)) {
        (Some(phase), _) => phase,
        (None, Some(project)) => project.phase,
        (None, None) => PdcaPhase::Plan,
    };
    let now = OffsetDateTime::now_utc();
    let action = Action {
        id: Uuid::new_v4(),
        project_id,
        title,
        description: new.description.trim().to_owned(),
        assignee_id: new.assignee_id,
        due_date: new.due_date,
        status: ActionStatus::Todo,
        priority: new.priority.unwrap_or_default(),
        phase,
        created_at: now,
        updated_at: now,
        completed_at: None,
    };
    store.actions.insert(action.id, action.clone());
    info!(%project_id, action_id = %action.id, "action created");
    Ok(action)
}

/// List a project's actions: dated ones by due date, undated last, then by
/// creation time.
///
/// # Errors
///
/// Permission errors only.
pub async fn list_actions(
    state: &AppState,
    user: &SessionUser,
    project_id: Uuid,
    filter: ActionFilter,
) -> Result<Vec<Action>, ActionError> {
    let store = state.store.read().await;
    ensure_permission(&store, project_id, user.id, Permission::View)?;

    let mut actions: Vec<Action> = store
        .project_actions(project_id)
        .filter(|a| filter.status.is_none_or(|s| a.status == s))
        .filter(|a| filter.assignee_id.is_none_or(|u| a.assignee_id == Some(u)))
        .cloned()
        .collect();
    actions.sort_by(|a, b| {
        let due = match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        };
        due.then(a.created_at.cmp(&b.created_at)).then(a.id.cmp(&b.id))
    });
    Ok(actions)
}

/// Action plan summary for a project.
///
/// # Errors
///
/// Permission errors only.
pub async fn action_plan_summary(
    state: &AppState,
    user: &SessionUser,
    project_id: Uuid,
    today: Date,
) -> Result<ActionPlanSummary, ActionError> {
    let store = state.store.read().await;
    ensure_permission(&store, project_id, user.id, Permission::View)?;
    Ok(summarize(store.project_actions(project_id), today))
}

/// Owning project of `action_id` once `user_id` holds `permission` on it. Callers
/// outside the project see the same `NotFound` as for an unknown id.
fn authorize(store: &EntityStore, action_id: Uuid, user_id: Uuid, permission: Permission) -> Result<Uuid, ActionError> {
    let project_id = store
        .actions
        .get(&action_id)
        .map(|a| a.project_id)
        .ok_or(ActionError::NotFound(action_id))?;
    match ensure_permission(store, project_id, user_id, permission) {
        Ok(_) => Ok(project_id),
        Err(ProjectError::NotFound(_)) => Err(ActionError::NotFound(action_id)),
        Err(err) => Err(err.into()),
    }
}

/// Apply a patch to an action. Entering `done` stamps `completed_at`;
/// leaving it clears the stamp.
///
/// # Errors
///
/// `NotFound`, `TitleRequired`, `AssigneeNotMember`, plus permission errors.
pub async fn update_action(
    state: &AppState,
    user: &SessionUser,
    action_id: Uuid,
    patch: ActionPatch,
) -> Result<Action, ActionError> {
    let title = patch.title.as_deref().map(require_title).transpose()?;
    let mut store = state.store.write().await;
    let project_id = authorize(&store, action_id, user.id, Permission::Edit)?;
    if let Some(assignee) = patch.assignee_id {
        check_assignee(&store, project_id, assignee)?;
    }

    let action = store
        .actions
        .get_mut(&action_id)
        .ok_or(ActionError::NotFound(action_id))?;
    let now = OffsetDateTime::now_utc();
    if let Some(title) = title {
        action.title = title;
    }
    if let Some(description) = patch.description {
        action.description = description.trim().to_owned();
    }
    if let Some(assignee) = patch.assignee_id {
        action.assignee_id = assignee;
    }
    if let Some(due) = patch.due_date {
        action.due_date = due;
    }
    if let Some(priority) = patch.priority {
        action.priority = priority;
    }
    if let Some(phase) = patch.phase {
        action.phase = phase;
    }
    if let Some(status) = patch.status {
        if status == ActionStatus::Done && action.status != ActionStatus::Done {
            action.completed_at = Some(now);
        } else if status != ActionStatus::Done {
            action.completed_at = None;
        }
        action.status = status;
    }
    action.updated_at = now;
    info!(%project_id, %action_id, status = ?action.status, "action updated");
    Ok(action.clone())
}

/// Delete an action.
///
/// # Errors
///
/// `NotFound` plus permission errors.
pub async fn delete_action(state: &AppState, user: &SessionUser, action_id: Uuid) -> Result<(), ActionError> {
    let mut store = state.store.write().await;
    let project_id = authorize(&store, action_id, user.id, Permission::Edit)?;
    store.actions.remove(&action_id);
    info!(%project_id, %action_id, "action deleted");
    Ok(())
}

#[cfg(test)]
#[path = "action_test.rs"]
mod tests;
