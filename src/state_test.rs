use super::*;
use crate::services::member::MemberRole;

#[test]
fn stores_start_empty() {
    let auth = AuthStore::new();
    assert!(auth.users.is_empty());
    assert!(auth.sessions.is_empty());
    let store = EntityStore::new();
    assert!(store.projects.is_empty());
    assert!(store.members.is_empty());
    assert!(store.actions.is_empty());
    assert!(store.modules.is_empty());
}

#[tokio::test]
async fn find_by_email_ignores_case() {
    let state = test_helpers::test_app_state();
    let user = test_helpers::seed_user(&state, "Ada").await;
    let auth = state.auth.read().await;
    let found = auth.find_by_email("ADA@EXAMPLE.TEST").unwrap();
    assert_eq!(found.id, user.id);
    assert!(auth.find_by_email("nobody@example.test").is_none());
}

#[tokio::test]
async fn seeded_project_has_owner_as_leader() {
    let state = test_helpers::test_app_state();
    let owner = test_helpers::seed_user(&state, "Grace").await;
    let project_id = test_helpers::seed_project(&state, &owner, "Reduce changeover").await;

    let store = state.store.read().await;
    assert!(store.projects.contains_key(&project_id));
    let member = store.member(project_id, owner.id).unwrap();
    assert_eq!(member.role, MemberRole::Leader);
    assert_eq!(store.project_members(project_id).count(), 1);
    assert_eq!(store.project_actions(project_id).count(), 0);
    assert_eq!(store.project_modules(project_id).count(), 0);
}

#[test]
fn app_state_clones_share_stores() {
    let state = test_helpers::test_app_state();
    let clone = state.clone();
    assert!(Arc::ptr_eq(&state.store, &clone.store));
    assert!(Arc::ptr_eq(&state.auth, &clone.auth));
}
