//! Session management over the in-memory auth store.
//!
//! ARCHITECTURE
//! ============
//! HTTP auth uses opaque session tokens carried in an HttpOnly cookie. A
//! session expires `SESSION_TTL_HOURS` after login; expired entries are
//! dropped lazily when they are next presented.

use std::fmt::Write;

use rand::Rng;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::services::auth::SessionUser;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
}

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Create a session for a user. Returns the token.
pub async fn create_session(state: &AppState, user_id: Uuid) -> String {
    let token = generate_token();
    let expires_at = OffsetDateTime::now_utc() + state.config.session_ttl();
    let mut auth = state.auth.write().await;
    auth.sessions
        .insert(token.clone(), Session { token: token.clone(), user_id, expires_at });
    info!(%user_id, "session created");
    token
}

/// Resolve a token to its user. Expired sessions are removed.
pub async fn validate_session(state: &AppState, token: &str) -> Option<SessionUser> {
    let now = OffsetDateTime::now_utc();
    {
        let auth = state.auth.read().await;
        let session = auth.sessions.get(token)?;
        if session.expires_at > now {
            return auth.users.get(&session.user_id).map(SessionUser::from);
        }
    }

    let mut auth = state.auth.write().await;
    if auth.sessions.get(token).is_some_and(|s| s.expires_at <= now) {
        auth.sessions.remove(token);
        info!("expired session removed");
    }
    None
}

/// Delete a session. Unknown tokens are ignored.
pub async fn delete_session(state: &AppState, token: &str) {
    let mut auth = state.auth.write().await;
    if let Some(session) = auth.sessions.remove(token) {
        info!(user_id = %session.user_id, "session deleted");
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
