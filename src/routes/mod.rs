//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API under `/api` plus a health probe under a
//! single Axum router. Handlers translate HTTP into service calls; every
//! service error becomes an `ApiError` through `?`.

pub mod actions;
pub mod auth;
pub mod modules;
pub mod projects;
pub mod users;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full HTTP application.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/users", get(users::list_users))
        .route("/api/projects", get(projects::list_projects).post(projects::create_project))
        .route(
            "/api/projects/{id}",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/api/projects/{id}/advance", post(projects::advance_phase))
        .route("/api/projects/{id}/status", put(projects::set_status))
        .route("/api/projects/{id}/summary", get(projects::project_summary))
        .route(
            "/api/projects/{id}/members",
            get(projects::list_members).post(projects::upsert_member),
        )
        .route(
            "/api/projects/{id}/members/{user_id}",
            patch(projects::update_member).delete(projects::delete_member),
        )
        .route(
            "/api/projects/{id}/actions",
            get(actions::list_actions).post(actions::create_action),
        )
        .route("/api/projects/{id}/actions/summary", get(actions::action_plan_summary))
        .route("/api/actions/{id}", patch(actions::update_action).delete(actions::delete_action))
        .route(
            "/api/projects/{id}/modules",
            get(modules::list_modules).post(modules::create_module),
        )
        .route("/api/projects/{id}/a3", get(modules::a3_overview))
        .route(
            "/api/modules/{id}",
            get(modules::get_module)
                .patch(modules::update_module)
                .delete(modules::delete_module),
        )
        .route("/api/modules/{id}/commands", post(modules::apply_command))
        .route("/api/modules/{id}/analysis", get(modules::analyze_module))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Today's date in UTC, the reference for overdue and trend calculations.
pub(crate) fn today() -> time::Date {
    time::OffsetDateTime::now_utc().date()
}


#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
