//! Value Stream Map editor — element graph with derived timeline metrics.
//!
//! DESIGN
//! ======
//! Elements are the boxes and triangles of the map; flows are the arrows
//! between them. Material flows (push, pull, shipment) define the order of
//! the value stream, information flows only annotate the map. The timeline
//! walks the material order and splits every step into value-added and
//! non-value-added seconds.
//!
//! TRADE-OFFS
//! ==========
//! Branching streams are linearized by topological order, so parallel
//! branches add up in lead time instead of taking the longest branch.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EditorError, nullable, require_non_negative, require_text};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VsmElementKind {
    Supplier,
    Customer,
    Process,
    Inventory,
    Transport,
    ProductionControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Push,
    Pull,
    Shipment,
    Information,
}

impl FlowKind {
    #[must_use]
    pub fn is_material(self) -> bool {
        !matches!(self, Self::Information)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VsmElement {
    pub id: Uuid,
    pub kind: VsmElementKind,
    pub name: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub cycle_time_secs: f64,
    #[serde(default)]
    pub changeover_secs: f64,
    #[serde(default)]
    pub uptime_pct: Option<f64>,
    #[serde(default)]
    pub operators: u32,
    #[serde(default)]
    pub wait_time_secs: f64,
    #[serde(default)]
    pub inventory_units: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VsmFlow {
    pub id: Uuid,
    pub from: Uuid,
    pub to: Uuid,
    pub kind: FlowKind,
}

/// Fields accepted when placing a new element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewElement {
    pub kind: Option<VsmElementKind>,
    pub name: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub cycle_time_secs: f64,
    #[serde(default)]
    pub changeover_secs: f64,
    #[serde(default)]
    pub uptime_pct: Option<f64>,
    #[serde(default)]
    pub operators: u32,
    #[serde(default)]
    pub wait_time_secs: f64,
    #[serde(default)]
    pub inventory_units: u32,
}

/// Partial update; absent fields keep their value. `"uptime_pct": null`
/// clears the uptime.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ElementPatch {
    pub name: Option<String>,
    pub cycle_time_secs: Option<f64>,
    pub changeover_secs: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    pub uptime_pct: Option<Option<f64>>,
    pub operators: Option<u32>,
    pub wait_time_secs: Option<f64>,
    pub inventory_units: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueStreamMap {
    /// Customer demand in units per day; drives takt time.
    #[serde(default)]
    pub demand_per_day: Option<f64>,
    /// Available production seconds per day.
    #[serde(default)]
    pub available_secs_per_day: Option<f64>,
    #[serde(default)]
    pub elements: Vec<VsmElement>,
    #[serde(default)]
    pub flows: Vec<VsmFlow>,
}

fn check_uptime(uptime: Option<f64>) -> Result<Option<f64>, EditorError> {
    match uptime {
        Some(pct) if !pct.is_finite() || pct <= 0.0 || pct > 100.0 => {
            Err(EditorError::InvalidValue { field: "uptime_pct", reason: "must be within (0, 100]" })
        }
        other => Ok(other),
    }
}

/// Upper bound for per-element headcount and stock.
pub const MAX_COUNT: u32 = 1_000_000_000;

fn check_count(value: u32, field: &'static str) -> Result<u32, EditorError> {
    if value > MAX_COUNT {
        return Err(EditorError::InvalidValue { field, reason: "must not exceed 1000000000" });
    }
    Ok(value)
}

fn check_positive(value: Option<f64>, field: &'static str) -> Result<Option<f64>, EditorError> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 => Err(EditorError::InvalidValue { field, reason: "must be positive" }),
        other => Ok(other),
    }
}

// =============================================================================
// MUTATIONS
// =============================================================================

impl ValueStreamMap {
    #[must_use]
    pub fn element(&self, id: Uuid) -> Option<&VsmElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    fn element_mut(&mut self, id: Uuid) -> Result<&mut VsmElement, EditorError> {
        self.elements
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(EditorError::NotFound(id))
    }

    pub fn add_element(&mut self, new: NewElement) -> Result<&VsmElement, EditorError> {
        let element = VsmElement {
            id: Uuid::new_v4(),
            kind: new.kind.unwrap_or(VsmElementKind::Process),
            name: require_text(&new.name, "element name")?,
            x: new.x,
            y: new.y,
            cycle_time_secs: require_non_negative(new.cycle_time_secs, "cycle_time_secs")?,
            changeover_secs: require_non_negative(new.changeover_secs, "changeover_secs")?,
            uptime_pct: check_uptime(new.uptime_pct)?,
            operators: check_count(new.operators, "operators")?,
            wait_time_secs: require_non_negative(new.wait_time_secs, "wait_time_secs")?,
            inventory_units: check_count(new.inventory_units, "inventory_units")?,
        };
        self.elements.push(element);
        Ok(&self.elements[self.elements.len() - 1])
    }

    /// Apply a patch. Validation runs on every field before anything changes.
    pub fn update_element(&mut self, id: Uuid, patch: ElementPatch) -> Result<&VsmElement, EditorError> {
        let name = patch.name.as_deref().map(|n| require_text(n, "element name")).transpose()?;
        let cycle = patch.cycle_time_secs.map(|v| require_non_negative(v, "cycle_time_secs")).transpose()?;
        let changeover = patch.changeover_secs.map(|v| require_non_negative(v, "changeover_secs")).transpose()?;
        let wait = patch.wait_time_secs.map(|v| require_non_negative(v, "wait_time_secs")).transpose()?;
        let uptime = patch.uptime_pct.map(check_uptime).transpose()?;
        let operators = patch.operators.map(|v| check_count(v, "operators")).transpose()?;
        let units = patch.inventory_units.map(|v| check_count(v, "inventory_units")).transpose()?;

        let element = self.element_mut(id)?;
        if let Some(name) = name {
            element.name = name;
        }
        if let Some(cycle) = cycle {
            element.cycle_time_secs = cycle;
        }
        if let Some(changeover) = changeover {
            element.changeover_secs = changeover;
        }
        if let Some(wait) = wait {
            element.wait_time_secs = wait;
        }
        if let Some(uptime) = uptime {
            element.uptime_pct = uptime;
        }
        if let Some(operators) = operators {
            element.operators = operators;
        }
        if let Some(units) = units {
            element.inventory_units = units;
        }
        Ok(element)
    }

    pub fn move_element(&mut self, id: Uuid, x: f64, y: f64) -> Result<(), EditorError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(EditorError::InvalidValue { field: "position", reason: "must be a finite number" });
        }
        let element = self.element_mut(id)?;
        element.x = x;
        element.y = y;
        Ok(())
    }

    /// Remove an element and every flow touching it.
    pub fn remove_element(&mut self, id: Uuid) -> Result<VsmElement, EditorError> {
        let pos = self
            .elements
            .iter()
            .position(|e| e.id == id)
            .ok_or(EditorError::NotFound(id))?;
        self.flows.retain(|f| f.from != id && f.to != id);
        Ok(self.elements.remove(pos))
    }

    pub fn connect(&mut self, from: Uuid, to: Uuid, kind: FlowKind) -> Result<&VsmFlow, EditorError> {
        if from == to {
            return Err(EditorError::SelfLoop);
        }
        for id in [from, to] {
            if self.element(id).is_none() {
                return Err(EditorError::NotFound(id));
            }
        }
        if self.flows.iter().any(|f| f.from == from && f.to == to && f.kind.is_material() == kind.is_material()) {
            return Err(EditorError::DuplicateFlow { from, to });
        }
        self.flows.push(VsmFlow { id: Uuid::new_v4(), from, to, kind });
        Ok(&self.flows[self.flows.len() - 1])
    }

    pub fn disconnect(&mut self, flow_id: Uuid) -> Result<VsmFlow, EditorError> {
        let pos = self
            .flows
            .iter()
            .position(|f| f.id == flow_id)
            .ok_or(EditorError::NotFound(flow_id))?;
        Ok(self.flows.remove(pos))
    }

    pub fn set_demand(
        &mut self,
        demand_per_day: Option<f64>,
        available_secs_per_day: Option<f64>,
    ) -> Result<(), EditorError> {
        self.demand_per_day = check_positive(demand_per_day, "demand_per_day")?;
        self.available_secs_per_day = check_positive(available_secs_per_day, "available_secs_per_day")?;
        Ok(())
    }
}

// =============================================================================
// TIMELINE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineStep {
    pub element_id: Uuid,
    pub name: String,
    pub kind: VsmElementKind,
    pub value_added_secs: f64,
    pub non_value_added_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VsmMetrics {
    pub lead_time_secs: f64,
    pub value_added_secs: f64,
    pub non_value_added_secs: f64,
    /// Value-added share of lead time, 0 when the lead time is 0.
    pub process_cycle_efficiency: f64,
    pub takt_time_secs: Option<f64>,
    pub bottleneck: Option<Uuid>,
    pub over_takt: Vec<Uuid>,
    pub total_operators: u64,
    pub total_inventory_units: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VsmAnalysis {
    pub timeline: Vec<TimelineStep>,
    pub metrics: VsmMetrics,
}

fn order_key(element: &VsmElement) -> (f64, &str) {
    (element.x, element.name.as_str())
}

impl ValueStreamMap {
    /// Elements in material-flow order (Kahn's algorithm). Ready elements are
    /// taken left to right, then by name. Elements with no material flow at
    /// all still appear, positioned by the same tie-break.
    ///
    /// # Errors
    ///
    /// `FlowCycle` when the material flows loop.
    pub fn material_path(&self) -> Result<Vec<&VsmElement>, EditorError> {
        let mut indegree: HashMap<Uuid, usize> = self.elements.iter().map(|e| (e.id, 0)).collect();
        let mut outgoing: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for flow in self.flows.iter().filter(|f| f.kind.is_material()) {
            if !indegree.contains_key(&flow.from) {
                continue;
            }
            let Some(degree) = indegree.get_mut(&flow.to) else {
                continue;
            };
            *degree += 1;
            outgoing.entry(flow.from).or_default().push(flow.to);
        }

        let mut ready: Vec<&VsmElement> = self
            .elements
            .iter()
            .filter(|e| indegree.get(&e.id).copied() == Some(0))
            .collect();
        let mut out = Vec::with_capacity(self.elements.len());

        while let Some(pos) = ready
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let (ax, an) = order_key(a);
                let (bx, bn) = order_key(b);
                ax.total_cmp(&bx).then_with(|| an.cmp(bn))
            })
            .map(|(pos, _)| pos)
        {
            let element = ready.swap_remove(pos);
            out.push(element);
            for next in outgoing.get(&element.id).into_iter().flatten() {
                let Some(degree) = indegree.get_mut(next) else {
                    continue;
                };
                *degree -= 1;
                if *degree == 0 {
                    if let Some(e) = self.element(*next) {
                        ready.push(e);
                    }
                }
            }
        }

        if out.len() != self.elements.len() {
            return Err(EditorError::FlowCycle);
        }
        Ok(out)
    }

    pub fn timeline(&self) -> Result<Vec<TimelineStep>, EditorError> {
        Ok(self
            .material_path()?
            .into_iter()
            .map(|e| {
                let (value_added_secs, non_value_added_secs) = match e.kind {
                    VsmElementKind::Process => (e.cycle_time_secs, e.wait_time_secs),
                    VsmElementKind::Inventory => (0.0, e.wait_time_secs),
                    VsmElementKind::Transport => (0.0, e.cycle_time_secs + e.wait_time_secs),
                    VsmElementKind::Supplier | VsmElementKind::Customer | VsmElementKind::ProductionControl => {
                        (0.0, 0.0)
                    }
                };
                TimelineStep { element_id: e.id, name: e.name.clone(), kind: e.kind, value_added_secs, non_value_added_secs }
            })
            .collect())
    }

    /// Seconds available per unit of demand.
    #[must_use]
    pub fn takt_time_secs(&self) -> Option<f64> {
        match (self.available_secs_per_day, self.demand_per_day) {
            (Some(available), Some(demand)) if demand > 0.0 => Some(available / demand),
            _ => None,
        }
    }

    pub fn metrics(&self) -> Result<VsmMetrics, EditorError> {
        let timeline = self.timeline()?;
        Ok(self.metrics_from(&timeline))
    }

    fn metrics_from(&self, timeline: &[TimelineStep]) -> VsmMetrics {
        let value_added_secs: f64 = timeline.iter().map(|s| s.value_added_secs).sum();
        let non_value_added_secs: f64 = timeline.iter().map(|s| s.non_value_added_secs).sum();
        let lead_time_secs = value_added_secs + non_value_added_secs;
        let process_cycle_efficiency = if lead_time_secs > 0.0 { value_added_secs / lead_time_secs } else { 0.0 };

        let processes = || self.elements.iter().filter(|e| e.kind == VsmElementKind::Process);
        let bottleneck = processes()
            .filter(|e| e.cycle_time_secs > 0.0)
            .max_by(|a, b| a.cycle_time_secs.total_cmp(&b.cycle_time_secs))
            .map(|e| e.id);
        let takt_time_secs = self.takt_time_secs();
        let over_takt = match takt_time_secs {
            Some(takt) => processes().filter(|e| e.cycle_time_secs > takt).map(|e| e.id).collect(),
            None => Vec::new(),
        };

        VsmMetrics {
            lead_time_secs,
            value_added_secs,
            non_value_added_secs,
            process_cycle_efficiency,
            takt_time_secs,
            bottleneck,
            over_takt,
            total_operators: self.elements.iter().map(|e| u64::from(e.operators)).sum(),
            total_inventory_units: self.elements.iter().map(|e| u64::from(e.inventory_units)).sum(),
        }
    }

    pub fn analyze(&self) -> Result<VsmAnalysis, EditorError> {
        let timeline = self.timeline()?;
        let metrics = self.metrics_from(&timeline);
        Ok(VsmAnalysis { timeline, metrics })
    }
}

#[cfg(test)]
#[path = "vsm_test.rs"]
mod tests;
