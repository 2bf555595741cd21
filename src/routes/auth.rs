//! Auth routes — registration, password login, session cookie.

use axum::Json;
use axum::extract::{FromRef, FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use crate::config::Config;
use crate::error::ApiError;
use crate::services::auth::{self as auth_svc, SessionUser, User};
use crate::services::session;
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "kaizen_session";

fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(config.session_ttl())
        .build()
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated user extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: SessionUser,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(COOKIE_NAME).map(Cookie::value).unwrap_or_default();
        if token.is_empty() {
            return Err(ApiError::unauthorized());
        }

        let app_state = AppState::from_ref(state);
        let user = session::validate_session(&app_state, token)
            .await
            .ok_or_else(ApiError::unauthorized)?;

        Ok(Self { user })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct RegisterBody {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

/// `POST /api/auth/register` — create an account and log it in.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError> {
    let user = auth_svc::register(&state, &body.email, &body.name, &body.password).await?;
    let token = session::create_session(&state, user.id).await;
    let jar = jar.add(session_cookie(&state.config, token));
    Ok((StatusCode::CREATED, jar, Json(user)))
}

/// `POST /api/auth/login` — check the password and set the session cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginBody>,
) -> Result<(CookieJar, Json<User>), ApiError> {
    let (user, token) = auth_svc::login(&state, &body.email, &body.password).await?;
    tracing::info!(user_id = %user.id, "user logged in");
    Ok((jar.add(session_cookie(&state.config, token)), Json(user)))
}

/// `POST /api/auth/logout` — drop the session and clear the cookie.
/// Succeeds without a session too.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(token) = jar.get(COOKIE_NAME).map(|c| c.value().to_owned()) {
        session::delete_session(&state, &token).await;
    }
    let jar = jar.remove(Cookie::build(COOKIE_NAME).path("/"));
    (StatusCode::NO_CONTENT, jar)
}

/// `GET /api/auth/me` — the current user.
pub async fn me(auth: AuthUser) -> Json<SessionUser> {
    Json(auth.user)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
