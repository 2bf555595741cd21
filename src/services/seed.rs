//! Demo data loaded at start when `KAIZEN_SEED_DEMO` is set.
//!
//! Seeding goes through the regular services, so the demo project obeys the
//! same validation as anything a user creates.

use time::{Date, Duration, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::editors::indicators::{Direction, NewIndicator};
use crate::editors::vsm::{FlowKind, NewElement, VsmElementKind};
use crate::services::action::{self, ActionError, NewAction, Priority};
use crate::services::auth::{self, AuthError, SessionUser};
use crate::services::module::{self, ModuleCommand, ModuleError, ModuleKind, NewModule};
use crate::services::project::{self, NewProject, ProjectError};
use crate::state::AppState;

pub const DEMO_EMAIL: &str = "demo@kaizen.local";
pub const DEMO_PASSWORD: &str = "kaizen-demo";

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Module(#[from] ModuleError),
}

/// Create the demo user and sample project. Returns the project id, or
/// `None` when the demo user already exists.
///
/// # Errors
///
/// Any service error raised while building the sample data.
pub async fn seed_demo(state: &AppState, today: Date) -> Result<Option<Uuid>, SeedError> {
    if state.auth.read().await.find_by_email(DEMO_EMAIL).is_some() {
        return Ok(None);
    }
    let user = auth::register(state, DEMO_EMAIL, "Demo User", DEMO_PASSWORD).await?;
    let user = SessionUser::from(&user);

    let project = project::create_project(
        state,
        &user,
        NewProject {
            title: "Reduce press line changeover".to_owned(),
            description: "Changeovers on press line 2 take too long and eat into shift capacity.".to_owned(),
            area: "Stamping".to_owned(),
            start_date: Some(today - Duration::days(28)),
            target_date: Some(today + Duration::days(62)),
        },
    )
    .await?;

    seed_five_why(state, &user, project.id).await?;
    seed_ishikawa(state, &user, project.id).await?;
    seed_vsm(state, &user, project.id).await?;
    seed_indicators(state, &user, project.id, today).await?;

    module::create_module(state, &user, project.id, NewModule { kind: ModuleKind::ActionPlan, title: None, phase: None })
        .await?;
    for (title, due_in, priority) in [
        ("Pre-stage dies on a cart before stop", 7, Priority::High),
        ("Standardize clamp bolts to one size", 21, Priority::Medium),
        ("Write changeover checklist", -3, Priority::Low),
    ] {
        action::create_action(
            state,
            &user,
            project.id,
            NewAction {
                title: title.to_owned(),
                assignee_id: Some(user.id),
                due_date: Some(today + Duration::days(due_in)),
                priority: Some(priority),
                ..NewAction::default()
            },
        )
        .await?;
    }

    info!(project_id = %project.id, email = DEMO_EMAIL, "demo data seeded");
    Ok(Some(project.id))
}

async fn run(
    state: &AppState,
    user: &SessionUser,
    module_id: Uuid,
    command: ModuleCommand,
) -> Result<Option<Uuid>, SeedError> {
    Ok(module::apply_command(state, user, module_id, command).await?.created_id)
}

async fn seed_five_why(state: &AppState, user: &SessionUser, project_id: Uuid) -> Result<(), SeedError> {
    let module =
        module::create_module(state, user, project_id, NewModule { kind: ModuleKind::FiveWhy, title: None, phase: None })
            .await?;
    run(state, user, module.id, ModuleCommand::SetProblem { text: "Changeover takes 90 minutes".to_owned() }).await?;

    let mut parent = None;
    for text in [
        "Dies are fetched from storage after the line stops",
        "No staging area next to the press",
        "Floor space is used for finished goods",
    ] {
        parent = run(state, user, module.id, ModuleCommand::AddWhy { parent_id: parent, text: text.to_owned() }).await?;
    }
    if let Some(id) = parent {
        run(state, user, module.id, ModuleCommand::SetRootCause { id, root_cause: true }).await?;
    }
    Ok(())
}

async fn seed_ishikawa(state: &AppState, user: &SessionUser, project_id: Uuid) -> Result<(), SeedError> {
    let module =
        module::create_module(state, user, project_id, NewModule { kind: ModuleKind::Ishikawa, title: None, phase: None })
            .await?;
    run(state, user, module.id, ModuleCommand::SetEffect { text: "Long changeover".to_owned() }).await?;

    let categories: Vec<(String, Uuid)> = {
        let store = state.store.read().await;
        match store.modules.get(&module.id).map(|m| &m.content) {
            Some(module::ModuleContent::Ishikawa(diagram)) => {
                diagram.categories.iter().map(|c| (c.name.clone(), c.id)).collect()
            }
            _ => Vec::new(),
        }
    };
    let category = |name: &str| categories.iter().find(|(n, _)| n == name).map(|(_, id)| *id);

    let causes = [
        ("Method", "Internal and external setup not separated", true),
        ("Machine", "Clamps need manual adjustment", false),
        ("Manpower", "Only one trained setter per shift", false),
    ];
    for (name, text, likely) in causes {
        let Some(category_id) = category(name) else { continue };
        let cause = run(
            state,
            user,
            module.id,
            ModuleCommand::AddCause { category_id, parent_id: None, text: text.to_owned() },
        )
        .await?;
        if let (true, Some(id)) = (likely, cause) {
            run(state, user, module.id, ModuleCommand::SetLikely { id, likely: true }).await?;
        }
    }
    Ok(())
}

async fn seed_vsm(state: &AppState, user: &SessionUser, project_id: Uuid) -> Result<(), SeedError> {
    let module =
        module::create_module(state, user, project_id, NewModule { kind: ModuleKind::Vsm, title: None, phase: None })
            .await?;
    run(
        state,
        user,
        module.id,
        ModuleCommand::SetDemand { demand_per_day: Some(460.0), available_secs_per_day: Some(27_600.0) },
    )
    .await?;

    let elements = [
        NewElement { kind: Some(VsmElementKind::Supplier), name: "Steel coil supplier".to_owned(), ..NewElement::default() },
        NewElement {
            kind: Some(VsmElementKind::Process),
            name: "Stamping".to_owned(),
            x: 100.0,
            cycle_time_secs: 1.0,
            changeover_secs: 3600.0,
            uptime_pct: Some(85.0),
            operators: 1,
            wait_time_secs: 432_000.0,
            ..NewElement::default()
        },
        NewElement {
            kind: Some(VsmElementKind::Process),
            name: "Spot welding".to_owned(),
            x: 200.0,
            cycle_time_secs: 39.0,
            changeover_secs: 600.0,
            uptime_pct: Some(100.0),
            operators: 1,
            wait_time_secs: 172_800.0,
            ..NewElement::default()
        },
        NewElement {
            kind: Some(VsmElementKind::Process),
            name: "Assembly".to_owned(),
            x: 300.0,
            cycle_time_secs: 62.0,
            operators: 2,
            wait_time_secs: 115_200.0,
            ..NewElement::default()
        },
        NewElement { kind: Some(VsmElementKind::Customer), name: "Assembly plant".to_owned(), x: 400.0, ..NewElement::default() },
    ];
    let mut previous = None;
    for element in elements {
        let id = run(state, user, module.id, ModuleCommand::AddElement(element)).await?;
        if let (Some(from), Some(to)) = (previous, id) {
            run(state, user, module.id, ModuleCommand::Connect { from, to, kind: FlowKind::Push }).await?;
        }
        previous = id;
    }
    Ok(())
}

async fn seed_indicators(state: &AppState, user: &SessionUser, project_id: Uuid, today: Date) -> Result<(), SeedError> {
    let module = module::create_module(
        state,
        user,
        project_id,
        NewModule { kind: ModuleKind::Indicators, title: None, phase: None },
    )
    .await?;
    let indicator = run(
        state,
        user,
        module.id,
        ModuleCommand::AddIndicator(NewIndicator {
            name: "Changeover time".to_owned(),
            unit: "min".to_owned(),
            direction: Direction::LowerIsBetter,
            baseline: Some(90.0),
            target: Some(30.0),
        }),
    )
    .await?;
    let Some(indicator_id) = indicator else { return Ok(()) };

    for (weeks_ago, value) in [(4, 90.0), (3, 82.0), (2, 71.0), (1, 64.0), (0, 58.0)] {
        run(
            state,
            user,
            module.id,
            ModuleCommand::RecordMeasurement {
                indicator_id,
                date: today - Duration::weeks(weeks_ago),
                value,
                note: String::new(),
            },
        )
        .await?;
    }
    Ok(())
}

/// Seed relative to the current UTC date.
///
/// # Errors
///
/// As `seed_demo`.
pub async fn seed_demo_now(state: &AppState) -> Result<Option<Uuid>, SeedError> {
    seed_demo(state, OffsetDateTime::now_utc().date()).await
}

#[cfg(test)]
#[path = "seed_test.rs"]
mod tests;
