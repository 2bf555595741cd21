use super::*;
use crate::services::module::{ModuleAnalysis, ModuleContent};
use crate::state::test_helpers;
use time::macros::date;

#[tokio::test]
async fn seed_creates_demo_user_and_project() {
    let state = test_helpers::test_app_state();
    let project_id = seed_demo(&state, date!(2024 - 06 - 01)).await.unwrap().unwrap();

    let (user, _token) = auth::login(&state, DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();
    let user = SessionUser::from(&user);
    let project = project::get_project(&state, &user, project_id).await.unwrap();
    assert_eq!(project.start_date, Some(date!(2024 - 05 - 04)));

    let modules = module::list_modules(&state, &user, project_id, None).await.unwrap();
    let kinds: Vec<ModuleKind> = modules.iter().map(|m| m.kind).collect();
    for kind in [ModuleKind::FiveWhy, ModuleKind::Ishikawa, ModuleKind::Vsm, ModuleKind::ActionPlan, ModuleKind::Indicators] {
        assert!(kinds.contains(&kind), "missing {kind:?}");
    }
    assert_eq!(action::list_actions(&state, &user, project_id, action::ActionFilter::default()).await.unwrap().len(), 3);
}

#[tokio::test]
async fn seeded_modules_carry_example_content() {
    let state = test_helpers::test_app_state();
    let today = date!(2024 - 06 - 01);
    let project_id = seed_demo(&state, today).await.unwrap().unwrap();
    let (user, _token) = auth::login(&state, DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();
    let user = SessionUser::from(&user);

    for module in module::list_modules(&state, &user, project_id, None).await.unwrap() {
        match (&module.content, module::analyze_module(&state, &user, module.id, today).await.unwrap()) {
            (ModuleContent::FiveWhy(_), ModuleAnalysis::FiveWhy(analysis)) => {
                assert_eq!(analysis.max_depth, 3);
                assert_eq!(analysis.root_causes.len(), 1);
            }
            (ModuleContent::Ishikawa(diagram), ModuleAnalysis::Ishikawa(_)) => {
                assert_eq!(diagram.total_causes(), 3);
                assert_eq!(diagram.likely_causes().len(), 1);
            }
            (ModuleContent::Vsm(_), ModuleAnalysis::Vsm(analysis)) => {
                assert_eq!(analysis.timeline.len(), 5);
                assert_eq!(analysis.timeline[0].name, "Steel coil supplier");
                assert_eq!(analysis.metrics.takt_time_secs, Some(60.0));
                assert_eq!(analysis.metrics.over_takt.len(), 1);
            }
            (ModuleContent::Indicators(_), ModuleAnalysis::Indicators(stats)) => {
                assert_eq!(stats.len(), 1);
                assert_eq!(stats[0].count, 5);
                assert_eq!(stats[0].trend, crate::editors::indicators::Trend::Improving);
            }
            (ModuleContent::ActionPlan, ModuleAnalysis::ActionPlan(summary)) => {
                assert_eq!(summary.total, 3);
                assert_eq!(summary.overdue.len(), 1);
            }
            (content, analysis) => panic!("analysis {analysis:?} does not match content {content:?}"),
        }
    }
}

#[tokio::test]
async fn reseeding_is_a_no_op() {
    let state = test_helpers::test_app_state();
    assert!(seed_demo(&state, date!(2024 - 06 - 01)).await.unwrap().is_some());
    assert!(seed_demo(&state, date!(2024 - 06 - 01)).await.unwrap().is_none());
    assert_eq!(state.store.read().await.projects.len(), 1);
}
