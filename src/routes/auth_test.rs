use super::*;
use crate::routes::test_support::{body_json, login_cookie, send};
use crate::state::test_helpers;
use axum::http::header;

fn cookie_pair(response: &axum::http::Response<axum::body::Body>) -> String {
    let set_cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_owned()
}

#[test]
fn session_cookie_flags() {
    let config = Config { cookie_secure: true, ..Config::default() };
    let cookie = session_cookie(&config, "abc".to_owned());
    assert_eq!(cookie.name(), COOKIE_NAME);
    assert_eq!(cookie.value(), "abc");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    assert_eq!(cookie.max_age(), Some(config.session_ttl()));
}

#[tokio::test]
async fn register_sets_cookie_and_me_resolves_it() {
    let state = test_helpers::test_app_state();
    let response = send(
        &state,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({"email": "Deming@Example.test", "name": "W. E. Deming", "password": "plan-do-check"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = cookie_pair(&response);
    assert!(cookie.starts_with("kaizen_session="));
    let user = body_json(response).await;
    assert_eq!(user["email"], "deming@example.test");

    let me = send(&state, "GET", "/api/auth/me", Some(&cookie), None).await;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(body_json(me).await["name"], "W. E. Deming");
}

#[tokio::test]
async fn register_conflict_and_validation_errors() {
    let state = test_helpers::test_app_state();
    test_helpers::seed_user(&state, "Taken").await;

    let response = send(
        &state,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({"email": "taken@example.test", "name": "Other", "password": "long-enough"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "E_EMAIL_TAKEN");

    let response = send(
        &state,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({"email": "new@example.test", "name": "New", "password": "short"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "E_WEAK_PASSWORD");
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let state = test_helpers::test_app_state();
    test_helpers::seed_user(&state, "Ohno").await;

    let response = send(
        &state,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({"email": "ohno@example.test", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let response = send(
        &state,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({"email": "OHNO@example.test", "password": "correct-horse"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(cookie_pair(&response).starts_with("kaizen_session="));
}

#[tokio::test]
async fn logout_invalidates_session() {
    let state = test_helpers::test_app_state();
    let (_user, cookie) = login_cookie(&state, "Imai").await;

    let response = send(&state, "POST", "/api/auth/logout", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(state.auth.read().await.sessions.is_empty());

    let me = send(&state, "GET", "/api/auth/me", Some(&cookie), None).await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);

    let again = send(&state, "POST", "/api/auth/logout", None, None).await;
    assert_eq!(again.status(), StatusCode::NO_CONTENT);
}
