use super::*;
use crate::services::member::{self, MemberRole};
use crate::services::project::{self, ProjectStatus};
use crate::state::test_helpers;
use time::macros::date;

fn action(status: ActionStatus, due_date: Option<Date>) -> Action {
    let now = OffsetDateTime::now_utc();
    Action {
        id: Uuid::new_v4(),
        project_id: Uuid::nil(),
        title: "t".to_owned(),
        description: String::new(),
        assignee_id: None,
        due_date,
        status,
        priority: Priority::Medium,
        phase: PdcaPhase::Do,
        created_at: now,
        updated_at: now,
        completed_at: None,
    }
}

async fn titled(
    state: &AppState,
    user: &SessionUser,
    project_id: Uuid,
    title: &str,
    due_date: Option<Date>,
    assignee_id: Option<Uuid>,
) -> Uuid {
    create_action(state, user, project_id, NewAction { title: title.to_owned(), due_date, assignee_id, ..NewAction::default() })
        .await
        .unwrap()
        .id
}

#[test]
fn summarize_counts_and_overdue() {
    let today = date!(2024 - 06 - 10);
    let late = action(ActionStatus::Todo, Some(date!(2024 - 06 - 01)));
    let late_done = action(ActionStatus::Done, Some(date!(2024 - 06 - 01)));
    let due_today = action(ActionStatus::InProgress, Some(today));
    let cancelled = action(ActionStatus::Cancelled, Some(date!(2024 - 05 - 01)));
    let actions = [late.clone(), late_done, due_today, cancelled];

    let summary = summarize(&actions, today);
    assert_eq!(summary.total, 4);
    assert_eq!((summary.todo, summary.in_progress, summary.done, summary.cancelled), (1, 1, 1, 1));
    assert!((summary.progress - 1.0 / 3.0).abs() < 1e-12);
    assert_eq!(summary.overdue, vec![late.id]);
}

#[test]
fn summarize_orders_overdue_by_due_date_then_creation() {
    let today = date!(2024 - 06 - 10);
    let newest = action(ActionStatus::Todo, Some(date!(2024 - 06 - 05)));
    let mut oldest = action(ActionStatus::Todo, Some(date!(2024 - 06 - 05)));
    oldest.created_at = newest.created_at - time::Duration::hours(1);
    let earliest_due = action(ActionStatus::InProgress, Some(date!(2024 - 05 - 20)));
    let actions = [newest.clone(), oldest.clone(), earliest_due.clone()];

    let summary = summarize(actions.iter().rev(), today);
    assert_eq!(summary.overdue, vec![earliest_due.id, oldest.id, newest.id]);
    assert_eq!(summarize(&actions, today).overdue, summary.overdue);
}

#[test]
fn summarize_empty_has_zero_progress() {
    let summary = summarize(&Vec::<Action>::new(), date!(2024 - 06 - 10));
    assert_eq!(summary.total, 0);
    assert!(summary.progress.abs() < f64::EPSILON);

    let all_cancelled = [action(ActionStatus::Cancelled, None)];
    assert!(summarize(&all_cancelled, date!(2024 - 06 - 10)).progress.abs() < f64::EPSILON);
}

#[test]
fn patch_distinguishes_null_from_missing() {
    let patch: ActionPatch = serde_json::from_str(r#"{"assignee_id": null}"#).unwrap();
    assert_eq!(patch.assignee_id, Some(None));
    assert_eq!(patch.due_date, None);

    let patch: ActionPatch = serde_json::from_str(r#"{"due_date": "2024-07-01"}"#).unwrap();
    assert_eq!(patch.due_date, Some(Some(date!(2024 - 07 - 01))));
}

#[tokio::test]
async fn create_action_defaults_to_project_phase() {
    let state = test_helpers::test_app_state();
    let owner = test_helpers::seed_user(&state, "Owner").await;
    let project_id = test_helpers::seed_project(&state, &owner, "Actions").await;
    project::advance_phase(&state, &owner, project_id).await.unwrap();

    let created = create_action(
        &state,
        &owner,
        project_id,
        NewAction { title: " Label bins ".to_owned(), ..NewAction::default() },
    )
    .await
    .unwrap();
    assert_eq!(created.title, "Label bins");
    assert_eq!(created.phase, PdcaPhase::Do);
    assert_eq!(created.status, ActionStatus::Todo);
    assert_eq!(created.priority, Priority::Medium);
    assert!(created.completed_at.is_none());
}

#[tokio::test]
async fn create_action_validates_title_and_assignee() {
    let state = test_helpers::test_app_state();
    let owner = test_helpers::seed_user(&state, "Owner").await;
    let outsider = test_helpers::seed_user(&state, "Outsider").await;
    let project_id = test_helpers::seed_project(&state, &owner, "Actions").await;

    let err = create_action(&state, &owner, project_id, NewAction::default()).await.unwrap_err();
    assert!(matches!(err, ActionError::TitleRequired));

    let err = create_action(
        &state,
        &owner,
        project_id,
        NewAction { title: "Help".to_owned(), assignee_id: Some(outsider.id), ..NewAction::default() },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ActionError::AssigneeNotMember(id) if id == outsider.id));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_actions_orders_and_filters() {
    let state = test_helpers::test_app_state();
    let owner = test_helpers::seed_user(&state, "Owner").await;
    let helper = test_helpers::seed_user(&state, "Helper").await;
    let project_id = test_helpers::seed_project(&state, &owner, "Actions").await;
    member::upsert_member(&state, &owner, project_id, helper.id, MemberRole::Member).await.unwrap();

    let undated = titled(&state, &owner, project_id, "Undated", None, None).await;
    let later = titled(&state, &owner, project_id, "Later", Some(date!(2024 - 09 - 01)), Some(helper.id)).await;
    let sooner = titled(&state, &owner, project_id, "Sooner", Some(date!(2024 - 08 - 01)), None).await;

    let ids: Vec<Uuid> = list_actions(&state, &owner, project_id, ActionFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(ids, vec![sooner, later, undated]);

    let mine = list_actions(&state, &owner, project_id, ActionFilter { assignee_id: Some(helper.id), status: None })
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, later);

    let done = list_actions(
        &state,
        &owner,
        project_id,
        ActionFilter { status: Some(ActionStatus::Done), assignee_id: None },
    )
    .await
    .unwrap();
    assert!(done.is_empty());
}

#[tokio::test]
async fn update_action_tracks_completion() {
    let state = test_helpers::test_app_state();
    let owner = test_helpers::seed_user(&state, "Owner").await;
    let project_id = test_helpers::seed_project(&state, &owner, "Actions").await;
    let created = create_action(
        &state,
        &owner,
        project_id,
        NewAction { title: "Label bins".to_owned(), due_date: Some(date!(2024 - 08 - 01)), ..NewAction::default() },
    )
    .await
    .unwrap();

    let done = update_action(
        &state,
        &owner,
        created.id,
        ActionPatch { status: Some(ActionStatus::Done), ..ActionPatch::default() },
    )
    .await
    .unwrap();
    let stamp = done.completed_at.unwrap();

    let still_done = update_action(
        &state,
        &owner,
        created.id,
        ActionPatch { status: Some(ActionStatus::Done), priority: Some(Priority::High), ..ActionPatch::default() },
    )
    .await
    .unwrap();
    assert_eq!(still_done.completed_at, Some(stamp));
    assert_eq!(still_done.priority, Priority::High);

    let reopened = update_action(
        &state,
        &owner,
        created.id,
        ActionPatch { status: Some(ActionStatus::InProgress), due_date: Some(None), ..ActionPatch::default() },
    )
    .await
    .unwrap();
    assert!(reopened.completed_at.is_none());
    assert!(reopened.due_date.is_none());
}

#[tokio::test]
async fn sponsor_cannot_touch_actions() {
    let state = test_helpers::test_app_state();
    let owner = test_helpers::seed_user(&state, "Owner").await;
    let sponsor = test_helpers::seed_user(&state, "Sponsor").await;
    let project_id = test_helpers::seed_project(&state, &owner, "Actions").await;
    member::upsert_member(&state, &owner, project_id, sponsor.id, MemberRole::Sponsor).await.unwrap();
    let created = create_action(&state, &owner, project_id, NewAction { title: "A".to_owned(), ..NewAction::default() })
        .await
        .unwrap();

    assert_eq!(list_actions(&state, &sponsor, project_id, ActionFilter::default()).await.unwrap().len(), 1);
    let err = delete_action(&state, &sponsor, created.id).await.unwrap_err();
    assert!(matches!(err, ActionError::Project(ProjectError::Forbidden(_))));
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    delete_action(&state, &owner, created.id).await.unwrap();
    let err = delete_action(&state, &owner, created.id).await.unwrap_err();
    assert!(matches!(err, ActionError::NotFound(_)));
}

#[tokio::test]
async fn outsiders_see_action_not_found() {
    let state = test_helpers::test_app_state();
    let owner = test_helpers::seed_user(&state, "Owner").await;
    let outsider = test_helpers::seed_user(&state, "Outsider").await;
    let project_id = test_helpers::seed_project(&state, &owner, "Actions").await;
    let action_id = titled(&state, &owner, project_id, "Private", None, None).await;

    let err = delete_action(&state, &outsider, action_id).await.unwrap_err();
    assert!(matches!(err, ActionError::NotFound(id) if id == action_id));
    assert!(!err.to_string().contains(&project_id.to_string()));
    let err = update_action(&state, &outsider, action_id, ActionPatch::default()).await.unwrap_err();
    assert!(matches!(err, ActionError::NotFound(id) if id == action_id));
}

#[tokio::test]
async fn summary_requires_membership() {
    let state = test_helpers::test_app_state();
    let owner = test_helpers::seed_user(&state, "Owner").await;
    let outsider = test_helpers::seed_user(&state, "Outsider").await;
    let project_id = test_helpers::seed_project(&state, &owner, "Actions").await;
    project::set_status(&state, &owner, project_id, ProjectStatus::Active).await.unwrap();

    let err = action_plan_summary(&state, &outsider, project_id, date!(2024 - 01 - 01)).await.unwrap_err();
    assert!(matches!(err, ActionError::Project(ProjectError::NotFound(_))));
    let summary = action_plan_summary(&state, &owner, project_id, date!(2024 - 01 - 01)).await.unwrap();
    assert_eq!(summary.total, 0);
}
