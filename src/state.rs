//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the two in-memory stores that stand in for a database: the auth
//! store (users, credentials, sessions) and the entity store (projects,
//! members, actions, A3 modules). Nothing survives a restart.
//!
//! LOCK ORDER
//! ==========
//! When an operation needs both stores, it takes `auth` before `store`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::Config;
use crate::services::action::Action;
use crate::services::auth::{Credential, User};
use crate::services::member::ProjectMember;
use crate::services::module::A3Module;
use crate::services::project::Project;
use crate::services::session::Session;

// =============================================================================
// AUTH STORE
// =============================================================================

#[derive(Debug, Default)]
pub struct AuthStore {
    pub users: HashMap<Uuid, User>,
    pub credentials: HashMap<Uuid, Credential>,
    /// Session token -> session.
    pub sessions: HashMap<String, Session>,
}

impl AuthStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn find_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| u.email.eq_ignore_ascii_case(email))
    }
}

// =============================================================================
// ENTITY STORE
// =============================================================================

#[derive(Debug, Default)]
pub struct EntityStore {
    pub projects: HashMap<Uuid, Project>,
    pub members: Vec<ProjectMember>,
    pub actions: HashMap<Uuid, Action>,
    pub modules: HashMap<Uuid, A3Module>,
}

impl EntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn member(&self, project_id: Uuid, user_id: Uuid) -> Option<&ProjectMember> {
        self.members
            .iter()
            .find(|m| m.project_id == project_id && m.user_id == user_id)
    }

    pub fn project_members(&self, project_id: Uuid) -> impl Iterator<Item = &ProjectMember> {
        self.members.iter().filter(move |m| m.project_id == project_id)
    }

    pub fn project_actions(&self, project_id: Uuid) -> impl Iterator<Item = &Action> {
        self.actions.values().filter(move |a| a.project_id == project_id)
    }

    pub fn project_modules(&self, project_id: Uuid) -> impl Iterator<Item = &A3Module> {
        self.modules.values().filter(move |m| m.project_id == project_id)
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<RwLock<AuthStore>>,
    pub store: Arc<RwLock<EntityStore>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            auth: Arc::new(RwLock::new(AuthStore::new())),
            store: Arc::new(RwLock::new(EntityStore::new())),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use crate::services::auth::{self, SessionUser};
    use crate::services::project::{self, NewProject};

    /// Create a test `AppState` with default config and empty stores.
    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::new(Config::default())
    }

    /// Register a user and return it as the session view handlers receive.
    pub async fn seed_user(state: &AppState, name: &str) -> SessionUser {
        let email = format!("{}@example.test", name.to_ascii_lowercase().replace(' ', "."));
        let user = auth::register(state, &email, name, "correct-horse")
            .await
            .expect("seed user should register");
        SessionUser::from(&user)
    }

    /// Create a project owned by `owner` and return its ID.
    pub async fn seed_project(state: &AppState, owner: &SessionUser, title: &str) -> Uuid {
        project::create_project(state, owner, NewProject { title: title.to_owned(), ..NewProject::default() })
            .await
            .expect("seed project should be created")
            .id
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
