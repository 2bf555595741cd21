//! Auth service — registration, password login, user directory.
//!
//! DESIGN
//! ======
//! Users and their credentials live in the in-memory auth store. Passwords
//! are stored as a hex SHA-256 over a random per-user salt and the password.
//! Login failures never reveal whether the email exists.

use axum::http::StatusCode;
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::services::session::{self, bytes_to_hex};
use crate::state::AppState;

pub const MIN_PASSWORD_LEN: usize = 8;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub user_id: Uuid,
    pub salt: String,
    pub hash: String,
}

/// The authenticated user as seen by route handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self { id: user.id, email: user.email.clone(), name: user.name.clone() }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("email address is not valid")]
    InvalidEmail,
    #[error("name must not be blank")]
    NameRequired,
    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },
    #[error("email already registered: {0}")]
    EmailTaken(String),
    #[error("invalid email or password")]
    InvalidCredentials,
}

impl ErrorCode for AuthError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "E_INVALID_EMAIL",
            Self::NameRequired => "E_NAME_REQUIRED",
            Self::WeakPassword { .. } => "E_WEAK_PASSWORD",
            Self::EmailTaken(_) => "E_EMAIL_TAKEN",
            Self::InvalidCredentials => "E_INVALID_CREDENTIALS",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::EmailTaken(_) => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

// =============================================================================
// PASSWORDS
// =============================================================================

pub(crate) fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    bytes_to_hex(&hasher.finalize())
}

fn new_credential(user_id: Uuid, password: &str) -> Credential {
    let salt_bytes: [u8; 16] = rand::rng().random();
    let salt = bytes_to_hex(&salt_bytes);
    let hash = hash_password(&salt, password);
    Credential { user_id, salt, hash }
}

fn normalize_email(raw: &str) -> Result<String, AuthError> {
    let email = raw.trim().to_ascii_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace));
    if !valid {
        return Err(AuthError::InvalidEmail);
    }
    Ok(email)
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Register a new user.
///
/// # Errors
///
/// Validation errors for email, name, or password, and `EmailTaken` when the
/// address (case-insensitive) is already registered.
pub async fn register(state: &AppState, email: &str, name: &str, password: &str) -> Result<User, AuthError> {
    let email = normalize_email(email)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::NameRequired);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword { min: MIN_PASSWORD_LEN });
    }

    let mut auth = state.auth.write().await;
    if auth.find_by_email(&email).is_some() {
        return Err(AuthError::EmailTaken(email));
    }

    let user = User { id: Uuid::new_v4(), email, name: name.to_owned(), created_at: OffsetDateTime::now_utc() };
    auth.credentials.insert(user.id, new_credential(user.id, password));
    auth.users.insert(user.id, user.clone());
    info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// Check a password and open a session. Returns the user and session token.
///
/// # Errors
///
/// `InvalidCredentials` for an unknown email or a wrong password.
pub async fn login(state: &AppState, email: &str, password: &str) -> Result<(User, String), AuthError> {
    let email = email.trim();
    let user = {
        let auth = state.auth.read().await;
        let user = auth.find_by_email(email).ok_or(AuthError::InvalidCredentials)?;
        let credential = auth.credentials.get(&user.id).ok_or(AuthError::InvalidCredentials)?;
        if hash_password(&credential.salt, password) != credential.hash {
            tracing::debug!(user_id = %user.id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }
        user.clone()
    };

    let token = session::create_session(state, user.id).await;
    Ok((user, token))
}

/// All users, sorted by name.
pub async fn list_users(state: &AppState) -> Vec<User> {
    let auth = state.auth.read().await;
    let mut users: Vec<User> = auth.users.values().cloned().collect();
    users.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()).then(a.email.cmp(&b.email)));
    users
}

/// Look up a user by email, case-insensitive.
pub async fn find_user_by_email(state: &AppState, email: &str) -> Option<User> {
    state.auth.read().await.find_by_email(email.trim()).cloned()
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
