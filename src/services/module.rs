//! A3 module service — the problem-solving artifacts attached to a project.
//!
//! DESIGN
//! ======
//! A module pairs metadata (title, PDCA phase) with one editor document.
//! Edits arrive as `ModuleCommand`s, tagged by `op`, and are applied to the
//! document under the entity write lock. A command aimed at a different
//! editor than the module holds is rejected with `KindMismatch` before
//! anything changes.
//!
//! The action-plan module carries no document: it reads the project's
//! actions.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::editors::EditorError;
use crate::editors::five_why::{FiveWhyAnalysis, FiveWhyTree};
use crate::editors::indicators::{IndicatorBoard, IndicatorPatch, IndicatorStats, NewIndicator};
use crate::editors::ishikawa::{IshikawaAnalysis, IshikawaDiagram};
use crate::editors::vsm::{ElementPatch, FlowKind, NewElement, ValueStreamMap, VsmAnalysis};
use crate::error::ErrorCode;
use crate::services::action::{self, ActionPlanSummary};
use crate::services::auth::SessionUser;
use crate::services::member::{Permission, ensure_permission};
use crate::services::project::{PdcaPhase, ProjectError};
use crate::state::{AppState, EntityStore};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    FiveWhy,
    Ishikawa,
    Vsm,
    ActionPlan,
    Indicators,
}

impl ModuleKind {
    #[must_use]
    pub fn default_title(self) -> &'static str {
        match self {
            Self::FiveWhy => "5-Why Analysis",
            Self::Ishikawa => "Ishikawa Diagram",
            Self::Vsm => "Value Stream Map",
            Self::ActionPlan => "Action Plan",
            Self::Indicators => "Performance Indicators",
        }
    }

    /// Where the artifact usually sits in the PDCA cycle.
    #[must_use]
    pub fn default_phase(self) -> PdcaPhase {
        match self {
            Self::FiveWhy | Self::Ishikawa | Self::Vsm => PdcaPhase::Plan,
            Self::ActionPlan => PdcaPhase::Do,
            Self::Indicators => PdcaPhase::Check,
        }
    }

    fn empty_content(self) -> ModuleContent {
        match self {
            Self::FiveWhy => ModuleContent::FiveWhy(FiveWhyTree::default()),
            Self::Ishikawa => ModuleContent::Ishikawa(IshikawaDiagram::with_default_categories()),
            Self::Vsm => ModuleContent::Vsm(ValueStreamMap::default()),
            Self::ActionPlan => ModuleContent::ActionPlan,
            Self::Indicators => ModuleContent::Indicators(IndicatorBoard::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ModuleContent {
    FiveWhy(FiveWhyTree),
    Ishikawa(IshikawaDiagram),
    Vsm(ValueStreamMap),
    ActionPlan,
    Indicators(IndicatorBoard),
}

impl ModuleContent {
    #[must_use]
    pub fn kind(&self) -> ModuleKind {
        match self {
            Self::FiveWhy(_) => ModuleKind::FiveWhy,
            Self::Ishikawa(_) => ModuleKind::Ishikawa,
            Self::Vsm(_) => ModuleKind::Vsm,
            Self::ActionPlan => ModuleKind::ActionPlan,
            Self::Indicators(_) => ModuleKind::Indicators,
        }
    }

    fn mismatch(&self, expected: ModuleKind) -> ModuleError {
        ModuleError::KindMismatch { expected, found: self.kind() }
    }

    fn five_why_mut(&mut self) -> Result<&mut FiveWhyTree, ModuleError> {
        match self {
            Self::FiveWhy(tree) => Ok(tree),
            other => Err(other.mismatch(ModuleKind::FiveWhy)),
        }
    }

    fn ishikawa_mut(&mut self) -> Result<&mut IshikawaDiagram, ModuleError> {
        match self {
            Self::Ishikawa(diagram) => Ok(diagram),
            other => Err(other.mismatch(ModuleKind::Ishikawa)),
        }
    }

    fn vsm_mut(&mut self) -> Result<&mut ValueStreamMap, ModuleError> {
        match self {
            Self::Vsm(map) => Ok(map),
            other => Err(other.mismatch(ModuleKind::Vsm)),
        }
    }

    fn indicators_mut(&mut self) -> Result<&mut IndicatorBoard, ModuleError> {
        match self {
            Self::Indicators(board) => Ok(board),
            other => Err(other.mismatch(ModuleKind::Indicators)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A3Module {
    pub id: Uuid,
    pub project_id: Uuid,
    pub kind: ModuleKind,
    pub title: String,
    pub phase: PdcaPhase,
    pub content: ModuleContent,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewModule {
    pub kind: ModuleKind,
    pub title: Option<String>,
    pub phase: Option<PdcaPhase>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModulePatch {
    pub title: Option<String>,
    pub phase: Option<PdcaPhase>,
}

/// One editor operation. JSON form: `{"op": "add_why", "parent_id": null, "text": "..."}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ModuleCommand {
    SetProblem { text: String },
    AddWhy { parent_id: Option<Uuid>, text: String },
    UpdateWhy { id: Uuid, text: String },
    SetRootCause { id: Uuid, root_cause: bool },
    RemoveWhy { id: Uuid },

    SetEffect { text: String },
    AddCategory { name: String },
    RenameCategory { id: Uuid, name: String },
    RemoveCategory { id: Uuid },
    AddCause { category_id: Uuid, parent_id: Option<Uuid>, text: String },
    UpdateCause { id: Uuid, text: String },
    SetLikely { id: Uuid, likely: bool },
    RemoveCause { id: Uuid },

    AddElement(NewElement),
    UpdateElement { id: Uuid, patch: ElementPatch },
    MoveElement { id: Uuid, x: f64, y: f64 },
    RemoveElement { id: Uuid },
    Connect { from: Uuid, to: Uuid, kind: FlowKind },
    Disconnect { id: Uuid },
    SetDemand { demand_per_day: Option<f64>, available_secs_per_day: Option<f64> },

    AddIndicator(NewIndicator),
    UpdateIndicator { id: Uuid, patch: IndicatorPatch },
    RemoveIndicator { id: Uuid },
    RecordMeasurement {
        indicator_id: Uuid,
        date: Date,
        value: f64,
        #[serde(default)]
        note: String,
    },
    RemoveMeasurement { indicator_id: Uuid, measurement_id: Uuid },
}

/// Result of a command: the updated module, plus the id of anything the
/// command created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOutcome {
    pub module: A3Module,
    pub created_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ModuleAnalysis {
    FiveWhy(FiveWhyAnalysis),
    Ishikawa(IshikawaAnalysis),
    Vsm(VsmAnalysis),
    ActionPlan(ActionPlanSummary),
    Indicators(Vec<IndicatorStats>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseModules {
    pub phase: PdcaPhase,
    pub modules: Vec<A3Module>,
}

#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("module not found: {0}")]
    NotFound(Uuid),
    #[error("module title must not be blank")]
    TitleRequired,
    #[error("command targets a {expected:?} module but this module is {found:?}")]
    KindMismatch { expected: ModuleKind, found: ModuleKind },
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Project(#[from] ProjectError),
}

impl ErrorCode for ModuleError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_MODULE_NOT_FOUND",
            Self::TitleRequired => "E_TITLE_REQUIRED",
            Self::KindMismatch { .. } => "E_KIND_MISMATCH",
            Self::Editor(e) => e.error_code(),
            Self::Project(e) => e.error_code(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::TitleRequired => StatusCode::BAD_REQUEST,
            Self::KindMismatch { .. } => StatusCode::CONFLICT,
            Self::Editor(e) => e.status(),
            Self::Project(e) => e.status(),
        }
    }
}

// =============================================================================
// COMMAND DISPATCH
// =============================================================================

/// Apply one command to a document. Returns the id of a created item.
fn apply(content: &mut ModuleContent, command: ModuleCommand) -> Result<Option<Uuid>, ModuleError> {
    use ModuleCommand as C;

    let created = match command {
        C::SetProblem { text } => content.five_why_mut()?.set_problem(&text).map(|()| None)?,
        C::AddWhy { parent_id, text } => Some(content.five_why_mut()?.add_why(parent_id, &text)?.id),
        C::UpdateWhy { id, text } => content.five_why_mut()?.update_why(id, &text).map(|()| None)?,
        C::SetRootCause { id, root_cause } => content.five_why_mut()?.set_root_cause(id, root_cause).map(|()| None)?,
        C::RemoveWhy { id } => content.five_why_mut()?.remove_why(id).map(|_| None)?,

        C::SetEffect { text } => content.ishikawa_mut()?.set_effect(&text).map(|()| None)?,
        C::AddCategory { name } => Some(content.ishikawa_mut()?.add_category(&name)?.id),
        C::RenameCategory { id, name } => content.ishikawa_mut()?.rename_category(id, &name).map(|()| None)?,
        C::RemoveCategory { id } => content.ishikawa_mut()?.remove_category(id).map(|_| None)?,
        C::AddCause { category_id, parent_id, text } => {
            Some(content.ishikawa_mut()?.add_cause(category_id, parent_id, &text)?)
        }
        C::UpdateCause { id, text } => content.ishikawa_mut()?.update_cause(id, &text).map(|()| None)?,
        C::SetLikely { id, likely } => content.ishikawa_mut()?.set_likely(id, likely).map(|()| None)?,
        C::RemoveCause { id } => content.ishikawa_mut()?.remove_cause(id).map(|_| None)?,

        C::AddElement(new) => Some(content.vsm_mut()?.add_element(new)?.id),
        C::UpdateElement { id, patch } => content.vsm_mut()?.update_element(id, patch).map(|_| None)?,
        C::MoveElement { id, x, y } => content.vsm_mut()?.move_element(id, x, y).map(|()| None)?,
        C::RemoveElement { id } => content.vsm_mut()?.remove_element(id).map(|_| None)?,
        C::Connect { from, to, kind } => Some(content.vsm_mut()?.connect(from, to, kind)?.id),
        C::Disconnect { id } => content.vsm_mut()?.disconnect(id).map(|_| None)?,
        C::SetDemand { demand_per_day, available_secs_per_day } => content
            .vsm_mut()?
            .set_demand(demand_per_day, available_secs_per_day)
            .map(|()| None)?,

        C::AddIndicator(new) => Some(content.indicators_mut()?.add_indicator(new)?.id),
        C::UpdateIndicator { id, patch } => content.indicators_mut()?.update_indicator(id, patch).map(|_| None)?,
        C::RemoveIndicator { id } => content.indicators_mut()?.remove_indicator(id).map(|_| None)?,
        C::RecordMeasurement { indicator_id, date, value, note } => {
            Some(content.indicators_mut()?.record_measurement(indicator_id, date, value, &note)?)
        }
        C::RemoveMeasurement { indicator_id, measurement_id } => content
            .indicators_mut()?
            .remove_measurement(indicator_id, measurement_id)
            .map(|()| None)?,
    };
    Ok(created)
}

// =============================================================================
// OPERATIONS
// =============================================================================

fn require_title(title: &str) -> Result<String, ModuleError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ModuleError::TitleRequired);
    }
    Ok(title.to_owned())
}

/// Owning project of `module_id` once `user_id` holds `permission` on it. Callers
/// outside the project see the same `NotFound` as for an unknown id.
fn authorize(store: &EntityStore, module_id: Uuid, user_id: Uuid, permission: Permission) -> Result<Uuid, ModuleError> {
    let project_id = store
        .modules
        .get(&module_id)
        .map(|m| m.project_id)
        .ok_or(ModuleError::NotFound(module_id))?;
    match ensure_permission(store, project_id, user_id, permission) {
        Ok(_) => Ok(project_id),
        Err(ProjectError::NotFound(_)) => Err(ModuleError::NotFound(module_id)),
        Err(err) => Err(err.into()),
    }
}

/// Attach a new, empty module to a project.
///
/// # Errors
///
/// `TitleRequired` for an explicit blank title, plus permission errors.
pub async fn create_module(
    state: &AppState,
    user: &SessionUser,
    project_id: Uuid,
    new: NewModule,
) -> Result<A3Module, ModuleError> {
    let title = match new.title.as_deref() {
        Some(title) => require_title(title)?,
        None => new.kind.default_title().to_owned(),
    };
    let mut store = state.store.write().await;
    ensure_permission(&store, project_id, user.id, Permission::Edit)?;

    let now = OffsetDateTime::now_utc();
    let module = A3Module {
        id: Uuid::new_v4(),
        project_id,
        kind: new.kind,
        title,
        phase: new.phase.unwrap_or_else(|| new.kind.default_phase()),
        content: new.kind.empty_content(),
        created_at: now,
        updated_at: now,
    };
    store.modules.insert(module.id, module.clone());
    info!(%project_id, module_id = %module.id, kind = ?module.kind, "module created");
    Ok(module)
}

/// A project's modules in PDCA order, then by creation time.
///
/// # Errors
///
/// Permission errors only.
pub async fn list_modules(
    state: &AppState,
    user: &SessionUser,
    project_id: Uuid,
    phase: Option<PdcaPhase>,
) -> Result<Vec<A3Module>, ModuleError> {
    let store = state.store.read().await;
    ensure_permission(&store, project_id, user.id, Permission::View)?;
    let mut modules: Vec<A3Module> = store
        .project_modules(project_id)
        .filter(|m| phase.is_none_or(|p| m.phase == p))
        .cloned()
        .collect();
    modules.sort_by(|a, b| {
        a.phase
            .cmp(&b.phase)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
    Ok(modules)
}

/// Fetch one module.
///
/// # Errors
///
/// `NotFound` plus permission errors.
pub async fn get_module(state: &AppState, user: &SessionUser, module_id: Uuid) -> Result<A3Module, ModuleError> {
    let store = state.store.read().await;
    let project_id = authorize(&store, module_id, user.id, Permission::View)?;
    store
        .modules
        .get(&module_id)
        .cloned()
        .ok_or(ModuleError::NotFound(module_id))
}

/// Rename a module or move it to another PDCA phase.
///
/// # Errors
///
/// `NotFound`, `TitleRequired`, plus permission errors.
pub async fn update_module(
    state: &AppState,
    user: &SessionUser,
    module_id: Uuid,
    patch: ModulePatch,
) -> Result<A3Module, ModuleError> {
    let title = patch.title.as_deref().map(require_title).transpose()?;
    let mut store = state.store.write().await;
    let project_id = authorize(&store, module_id, user.id, Permission::Edit)?;

    let module = store
        .modules
        .get_mut(&module_id)
        .ok_or(ModuleError::NotFound(module_id))?;
    if let Some(title) = title {
        module.title = title;
    }
    if let Some(phase) = patch.phase {
        module.phase = phase;
    }
    module.updated_at = OffsetDateTime::now_utc();
    info!(%project_id, %module_id, "module updated");
    Ok(module.clone())
}

/// Delete a module and its document.
///
/// # Errors
///
/// `NotFound` plus permission errors.
pub async fn delete_module(state: &AppState, user: &SessionUser, module_id: Uuid) -> Result<(), ModuleError> {
    let mut store = state.store.write().await;
    let project_id = authorize(&store, module_id, user.id, Permission::Edit)?;
    store.modules.remove(&module_id);
    info!(%project_id, %module_id, "module deleted");
    Ok(())
}

/// Apply an editor command to a module's document.
///
/// The command runs against a copy, which replaces the stored document only
/// on success, so a failing command never leaves a half-applied edit.
///
/// # Errors
///
/// `NotFound`, `KindMismatch`, editor validation errors, plus permission errors.
pub async fn apply_command(
    state: &AppState,
    user: &SessionUser,
    module_id: Uuid,
    command: ModuleCommand,
) -> Result<CommandOutcome, ModuleError> {
    let mut store = state.store.write().await;
    let project_id = authorize(&store, module_id, user.id, Permission::Edit)?;

    let module = store
        .modules
        .get_mut(&module_id)
        .ok_or(ModuleError::NotFound(module_id))?;
    let mut content = module.content.clone();
    let created_id = apply(&mut content, command)?;
    module.content = content;
    module.updated_at = OffsetDateTime::now_utc();
    info!(%project_id, %module_id, kind = ?module.kind, "module command applied");
    Ok(CommandOutcome { module: module.clone(), created_id })
}

/// Derived metrics for a module as of `today`.
///
/// # Errors
///
/// `NotFound`, `FlowCycle` for a looping value stream, plus permission errors.
pub async fn analyze_module(
    state: &AppState,
    user: &SessionUser,
    module_id: Uuid,
    today: Date,
) -> Result<ModuleAnalysis, ModuleError> {
    let store = state.store.read().await;
    let project_id = authorize(&store, module_id, user.id, Permission::View)?;
    let module = store
        .modules
        .get(&module_id)
        .ok_or(ModuleError::NotFound(module_id))?;

    Ok(match &module.content {
        ModuleContent::FiveWhy(tree) => ModuleAnalysis::FiveWhy(tree.analyze()),
        ModuleContent::Ishikawa(diagram) => ModuleAnalysis::Ishikawa(diagram.analyze()),
        ModuleContent::Vsm(map) => ModuleAnalysis::Vsm(map.analyze()?),
        ModuleContent::ActionPlan => ModuleAnalysis::ActionPlan(action::summarize(store.project_actions(project_id), today)),
        ModuleContent::Indicators(board) => ModuleAnalysis::Indicators(board.analyze()),
    })
}

/// The project's A3 sheet: every PDCA phase with its modules.
///
/// # Errors
///
/// Permission errors only.
pub async fn a3_overview(state: &AppState, user: &SessionUser, project_id: Uuid) -> Result<Vec<PhaseModules>, ModuleError> {
    let modules = list_modules(state, user, project_id, None).await?;
    Ok(PdcaPhase::ALL
        .iter()
        .map(|phase| PhaseModules {
            phase: *phase,
            modules: modules.iter().filter(|m| m.phase == *phase).cloned().collect(),
        })
        .collect())
}

#[cfg(test)]
#[path = "module_test.rs"]
mod tests;
