use super::*;
use crate::state::test_helpers;

#[tokio::test]
async fn register_normalizes_email_and_name() {
    let state = test_helpers::test_app_state();
    let user = register(&state, "  Taiichi@Toyota.JP ", "  Taiichi Ohno ", "just-in-time").await.unwrap();
    assert_eq!(user.email, "taiichi@toyota.jp");
    assert_eq!(user.name, "Taiichi Ohno");

    let auth = state.auth.read().await;
    let credential = auth.credentials.get(&user.id).unwrap();
    assert_eq!(credential.salt.len(), 32);
    assert_eq!(credential.hash, hash_password(&credential.salt, "just-in-time"));
}

#[tokio::test]
async fn register_validates_input() {
    let state = test_helpers::test_app_state();
    assert!(matches!(register(&state, "no-at-sign", "A", "12345678").await, Err(AuthError::InvalidEmail)));
    assert!(matches!(register(&state, "@example.test", "A", "12345678").await, Err(AuthError::InvalidEmail)));
    assert!(matches!(register(&state, "a@b.c", "   ", "12345678").await, Err(AuthError::NameRequired)));
    assert!(matches!(
        register(&state, "a@b.c", "A", "short").await,
        Err(AuthError::WeakPassword { min: MIN_PASSWORD_LEN })
    ));
    assert!(state.auth.read().await.users.is_empty());
}

#[tokio::test]
async fn register_rejects_duplicate_email_case_insensitive() {
    let state = test_helpers::test_app_state();
    register(&state, "shingo@example.test", "Shigeo", "poka-yoke!").await.unwrap();
    let err = register(&state, "SHINGO@example.test", "Other", "poka-yoke!").await.unwrap_err();
    assert!(matches!(err, AuthError::EmailTaken(_)));
    assert_eq!(err.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_returns_session_token() {
    let state = test_helpers::test_app_state();
    let user = register(&state, "deming@example.test", "W. Edwards Deming", "plan-do-check").await.unwrap();

    let (logged_in, token) = login(&state, "Deming@example.test", "plan-do-check").await.unwrap();
    assert_eq!(logged_in.id, user.id);
    let resolved = session::validate_session(&state, &token).await.unwrap();
    assert_eq!(resolved.id, user.id);
}

#[tokio::test]
async fn login_wrong_password_and_unknown_email_look_the_same() {
    let state = test_helpers::test_app_state();
    register(&state, "juran@example.test", "Joseph Juran", "trilogy-123").await.unwrap();

    let wrong = login(&state, "juran@example.test", "nope-nope").await.unwrap_err();
    let unknown = login(&state, "ghost@example.test", "trilogy-123").await.unwrap_err();
    assert_eq!(wrong.to_string(), unknown.to_string());
    assert_eq!(wrong.error_code(), "E_INVALID_CREDENTIALS");
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_users_sorted_by_name() {
    let state = test_helpers::test_app_state();
    test_helpers::seed_user(&state, "zoe").await;
    test_helpers::seed_user(&state, "Alan").await;
    test_helpers::seed_user(&state, "mia").await;

    let names: Vec<String> = list_users(&state).await.into_iter().map(|u| u.name).collect();
    assert_eq!(names, vec!["Alan", "mia", "zoe"]);
}

#[test]
fn hash_depends_on_salt() {
    assert_ne!(hash_password("aa", "secret-pw"), hash_password("bb", "secret-pw"));
    assert_eq!(hash_password("aa", "secret-pw").len(), 64);
}

#[test]
fn session_user_from_user() {
    let user = User {
        id: Uuid::new_v4(),
        email: "x@y.z".into(),
        name: "X".into(),
        created_at: OffsetDateTime::now_utc(),
    };
    let session_user = SessionUser::from(&user);
    assert_eq!(session_user.id, user.id);
    assert_eq!(session_user.email, "x@y.z");
}
