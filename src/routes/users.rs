//! User directory routes.

use axum::Json;
use axum::extract::State;

use super::auth::AuthUser;
use crate::services::auth::{self as auth_svc, User};
use crate::state::AppState;

/// `GET /api/users` — every registered user, for member pickers.
pub async fn list_users(State(state): State<AppState>, _auth: AuthUser) -> Json<Vec<User>> {
    Json(auth_svc::list_users(&state).await)
}
