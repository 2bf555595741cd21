use super::*;
use crate::routes::test_support::{body_json, login_cookie, send};
use crate::state::test_helpers;
use serde_json::json;

#[tokio::test]
async fn create_list_and_get_project() {
    let state = test_helpers::test_app_state();
    let (_user, cookie) = login_cookie(&state, "Owner").await;

    let response = send(
        &state,
        "POST",
        "/api/projects",
        Some(&cookie),
        Some(json!({"title": "Shorten lead time", "area": "Warehouse", "start_date": "2024-04-01"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["status"], "draft");
    assert_eq!(created["phase"], "plan");
    assert_eq!(created["start_date"], "2024-04-01");
    let id = created["id"].as_str().unwrap().to_owned();

    let list = body_json(send(&state, "GET", "/api/projects", Some(&cookie), None).await).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    let filtered = body_json(send(&state, "GET", "/api/projects?status=active", Some(&cookie), None).await).await;
    assert!(filtered.as_array().unwrap().is_empty());

    let response = send(&state, "GET", &format!("/api/projects/{id}"), Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["title"], "Shorten lead time");
}

#[tokio::test]
async fn blank_title_is_bad_request() {
    let state = test_helpers::test_app_state();
    let (_user, cookie) = login_cookie(&state, "Owner").await;
    let response = send(&state, "POST", "/api/projects", Some(&cookie), Some(json!({"title": " "}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "E_TITLE_REQUIRED");
}

#[tokio::test]
async fn outsiders_get_not_found() {
    let state = test_helpers::test_app_state();
    let (owner, _) = login_cookie(&state, "Owner").await;
    let (_outsider, cookie) = login_cookie(&state, "Outsider").await;
    let project_id = test_helpers::seed_project(&state, &owner, "Hidden").await;

    let response = send(&state, "GET", &format!("/api/projects/{project_id}"), Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "E_PROJECT_NOT_FOUND");
}

#[tokio::test]
async fn advance_status_and_summary() {
    let state = test_helpers::test_app_state();
    let (owner, cookie) = login_cookie(&state, "Owner").await;
    let project_id = test_helpers::seed_project(&state, &owner, "PDCA").await;

    let advanced = body_json(send(&state, "POST", &format!("/api/projects/{project_id}/advance"), Some(&cookie), None).await).await;
    assert_eq!(advanced["phase"], "do");
    assert_eq!(advanced["status"], "active");

    let response = send(
        &state,
        "PUT",
        &format!("/api/projects/{project_id}/status"),
        Some(&cookie),
        Some(json!({"status": "completed"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&state, "POST", &format!("/api/projects/{project_id}/advance"), Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "E_PROJECT_CLOSED");

    let summary = body_json(send(&state, "GET", &format!("/api/projects/{project_id}/summary"), Some(&cookie), None).await).await;
    assert_eq!(summary["member_count"], 1);
    assert_eq!(summary["modules_by_phase"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn member_management_by_email_and_id() {
    let state = test_helpers::test_app_state();
    let (owner, cookie) = login_cookie(&state, "Owner").await;
    let expert = test_helpers::seed_user(&state, "Expert").await;
    let project_id = test_helpers::seed_project(&state, &owner, "Team").await;
    let members_uri = format!("/api/projects/{project_id}/members");

    let response = send(
        &state,
        "POST",
        &members_uri,
        Some(&cookie),
        Some(json!({"email": "EXPERT@example.test", "role": "expert"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["role"], "expert");

    let response = send(&state, "POST", &members_uri, Some(&cookie), Some(json!({"email": "nobody@example.test", "role": "member"}))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(&state, "POST", &members_uri, Some(&cookie), Some(json!({"role": "member"}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &state,
        "PATCH",
        &format!("{members_uri}/{}", expert.id),
        Some(&cookie),
        Some(json!({"role": "facilitator"})),
    )
    .await;
    assert_eq!(body_json(response).await["role"], "facilitator");

    let listed = body_json(send(&state, "GET", &members_uri, Some(&cookie), None).await).await;
    assert_eq!(listed[0]["role"], "leader");
    assert_eq!(listed[1]["name"], "Expert");

    let response = send(&state, "DELETE", &format!("{members_uri}/{}", owner.id), Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let response = send(&state, "DELETE", &format!("{members_uri}/{}", expert.id), Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn delete_project_returns_no_content() {
    let state = test_helpers::test_app_state();
    let (owner, cookie) = login_cookie(&state, "Owner").await;
    let project_id = test_helpers::seed_project(&state, &owner, "Gone").await;

    let response = send(&state, "DELETE", &format!("/api/projects/{project_id}"), Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = send(&state, "GET", &format!("/api/projects/{project_id}"), Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
