//! Project membership — roles, permission checks, and member management.
//!
//! DESIGN
//! ======
//! Every project access goes through `ensure_permission`. Users who are not
//! members see `NotFound` rather than `Forbidden`, so project ids do not
//! leak. A project always keeps at least one leader.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::services::action::ActionStatus;
use crate::services::auth::SessionUser;
use crate::services::project::ProjectError;
use crate::state::{AppState, EntityStore};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Leader,
    Facilitator,
    Member,
    Expert,
    Sponsor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    View,
    Edit,
    Admin,
}

impl MemberRole {
    #[must_use]
    pub fn allows(self, permission: Permission) -> bool {
        match permission {
            Permission::View => true,
            Permission::Edit => !matches!(self, Self::Sponsor),
            Permission::Admin => matches!(self, Self::Leader),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

/// A member joined with the user's directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberView {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: MemberRole,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

// =============================================================================
// PERMISSIONS
// =============================================================================

/// Check that `user_id` may act on `project_id` with `permission`.
///
/// # Errors
///
/// `NotFound` if the project does not exist or the user is not a member,
/// `Forbidden` if the member's role lacks the permission.
pub(crate) fn ensure_permission(
    store: &EntityStore,
    project_id: Uuid,
    user_id: Uuid,
    permission: Permission,
) -> Result<MemberRole, ProjectError> {
    if !store.projects.contains_key(&project_id) {
        return Err(ProjectError::NotFound(project_id));
    }
    let member = store
        .member(project_id, user_id)
        .ok_or(ProjectError::NotFound(project_id))?;
    if !member.role.allows(permission) {
        return Err(ProjectError::Forbidden(project_id));
    }
    Ok(member.role)
}

fn leader_count(store: &EntityStore, project_id: Uuid) -> usize {
    store
        .project_members(project_id)
        .filter(|m| m.role == MemberRole::Leader)
        .count()
}

/// Would taking `user_id` out of the leader role leave the project leaderless?
fn is_last_leader(store: &EntityStore, project_id: Uuid, user_id: Uuid) -> bool {
    store
        .member(project_id, user_id)
        .is_some_and(|m| m.role == MemberRole::Leader)
        && leader_count(store, project_id) == 1
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// List a project's members, leaders first, then by name.
///
/// # Errors
///
/// `NotFound` when the project is missing or not visible to `user`.
pub async fn list_members(state: &AppState, user: &SessionUser, project_id: Uuid) -> Result<Vec<MemberView>, ProjectError> {
    let auth = state.auth.read().await;
    let store = state.store.read().await;
    ensure_permission(&store, project_id, user.id, Permission::View)?;

    let mut members: Vec<MemberView> = store
        .project_members(project_id)
        .map(|m| {
            let (name, email) = auth
                .users
                .get(&m.user_id)
                .map(|u| (u.name.clone(), u.email.clone()))
                .unwrap_or_default();
            MemberView { user_id: m.user_id, name, email, role: m.role, joined_at: m.joined_at }
        })
        .collect();
    members.sort_by(|a, b| a.role.cmp(&b.role).then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase())));
    Ok(members)
}

/// Add a member or change an existing member's role.
///
/// # Errors
///
/// `UserNotFound` for an unknown target user, `LastLeader` when the change
/// would demote the only leader, plus permission errors.
pub async fn upsert_member(
    state: &AppState,
    user: &SessionUser,
    project_id: Uuid,
    target_user_id: Uuid,
    role: MemberRole,
) -> Result<ProjectMember, ProjectError> {
    let auth = state.auth.read().await;
    let mut store = state.store.write().await;
    ensure_permission(&store, project_id, user.id, Permission::Admin)?;
    if !auth.users.contains_key(&target_user_id) {
        return Err(ProjectError::UserNotFound(target_user_id));
    }
    if role != MemberRole::Leader && is_last_leader(&store, project_id, target_user_id) {
        return Err(ProjectError::LastLeader);
    }

    let existing = store
        .members
        .iter()
        .position(|m| m.project_id == project_id && m.user_id == target_user_id);
    let member = match existing {
        Some(pos) => {
            store.members[pos].role = role;
            store.members[pos].clone()
        }
        None => {
            let member =
                ProjectMember { project_id, user_id: target_user_id, role, joined_at: OffsetDateTime::now_utc() };
            store.members.push(member.clone());
            member
        }
    };
    info!(%project_id, user_id = %target_user_id, ?role, "project member upserted");
    Ok(member)
}

/// Change the role of an existing member.
///
/// # Errors
///
/// `NotMember` if the target is not on the project; otherwise as `upsert_member`.
pub async fn update_member(
    state: &AppState,
    user: &SessionUser,
    project_id: Uuid,
    target_user_id: Uuid,
    role: MemberRole,
) -> Result<ProjectMember, ProjectError> {
    {
        let store = state.store.read().await;
        ensure_permission(&store, project_id, user.id, Permission::Admin)?;
        if store.member(project_id, target_user_id).is_none() {
            return Err(ProjectError::NotMember(target_user_id));
        }
    }
    upsert_member(state, user, project_id, target_user_id, role).await
}

/// Remove a member. Leaders may remove anyone; members may remove themselves.
/// Open actions assigned to the removed member become unassigned.
///
/// # Errors
///
/// `NotMember`, `LastLeader`, plus permission errors.
pub async fn remove_member(
    state: &AppState,
    user: &SessionUser,
    project_id: Uuid,
    target_user_id: Uuid,
) -> Result<(), ProjectError> {
    let mut store = state.store.write().await;
    let permission = if target_user_id == user.id { Permission::View } else { Permission::Admin };
    ensure_permission(&store, project_id, user.id, permission)?;
    if store.member(project_id, target_user_id).is_none() {
        return Err(ProjectError::NotMember(target_user_id));
    }
    if is_last_leader(&store, project_id, target_user_id) {
        return Err(ProjectError::LastLeader);
    }

    store
        .members
        .retain(|m| !(m.project_id == project_id && m.user_id == target_user_id));
    let now = OffsetDateTime::now_utc();
    let mut unassigned = 0usize;
    for action in store.actions.values_mut() {
        if action.project_id == project_id
            && action.assignee_id == Some(target_user_id)
            && !matches!(action.status, ActionStatus::Done | ActionStatus::Cancelled)
        {
            action.assignee_id = None;
            action.updated_at = now;
            unassigned += 1;
        }
    }
    info!(%project_id, user_id = %target_user_id, unassigned, "project member removed");
    Ok(())
}

#[cfg(test)]
#[path = "member_test.rs"]
mod tests;
