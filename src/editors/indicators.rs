//! Performance indicator editor — KPIs with dated measurements and trends.
//!
//! DESIGN
//! ======
//! Measurements stay sorted by date; same-day readings keep their insertion
//! order. Trend is the least-squares slope per day over day offsets from the
//! first reading, read against the indicator's direction.

use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::stats::{linear_regression, mean};
use super::{EditorError, nullable, require_text};

/// Slopes at or below this magnitude count as flat.
pub const STABLE_SLOPE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    HigherIsBetter,
    LowerIsBetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Degrading,
    Stable,
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: Uuid,
    pub date: Date,
    pub value: f64,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub baseline: Option<f64>,
    #[serde(default)]
    pub target: Option<f64>,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewIndicator {
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub baseline: Option<f64>,
    #[serde(default)]
    pub target: Option<f64>,
}

/// Partial update; `"baseline": null` or `"target": null` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IndicatorPatch {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub direction: Option<Direction>,
    #[serde(default, deserialize_with = "nullable")]
    pub baseline: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub target: Option<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorBoard {
    #[serde(default)]
    pub indicators: Vec<Indicator>,
}

fn check_finite(value: Option<f64>, field: &'static str) -> Result<Option<f64>, EditorError> {
    match value {
        Some(v) if !v.is_finite() => Err(EditorError::InvalidValue { field, reason: "must be a finite number" }),
        other => Ok(other),
    }
}

impl IndicatorBoard {
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&Indicator> {
        self.indicators.iter().find(|i| i.id == id)
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut Indicator, EditorError> {
        self.indicators
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(EditorError::NotFound(id))
    }

    pub fn add_indicator(&mut self, new: NewIndicator) -> Result<&Indicator, EditorError> {
        let indicator = Indicator {
            id: Uuid::new_v4(),
            name: require_text(&new.name, "indicator name")?,
            unit: new.unit.trim().to_owned(),
            direction: new.direction,
            baseline: check_finite(new.baseline, "baseline")?,
            target: check_finite(new.target, "target")?,
            measurements: Vec::new(),
        };
        self.indicators.push(indicator);
        Ok(&self.indicators[self.indicators.len() - 1])
    }

    pub fn update_indicator(&mut self, id: Uuid, patch: IndicatorPatch) -> Result<&Indicator, EditorError> {
        let name = patch.name.as_deref().map(|n| require_text(n, "indicator name")).transpose()?;
        let baseline = patch.baseline.map(|v| check_finite(v, "baseline")).transpose()?;
        let target = patch.target.map(|v| check_finite(v, "target")).transpose()?;

        let indicator = self.get_mut(id)?;
        if let Some(name) = name {
            indicator.name = name;
        }
        if let Some(unit) = patch.unit {
            indicator.unit = unit.trim().to_owned();
        }
        if let Some(direction) = patch.direction {
            indicator.direction = direction;
        }
        if let Some(baseline) = baseline {
            indicator.baseline = baseline;
        }
        if let Some(target) = target {
            indicator.target = target;
        }
        Ok(indicator)
    }

    pub fn remove_indicator(&mut self, id: Uuid) -> Result<Indicator, EditorError> {
        let pos = self
            .indicators
            .iter()
            .position(|i| i.id == id)
            .ok_or(EditorError::NotFound(id))?;
        Ok(self.indicators.remove(pos))
    }

    /// Record a reading, keeping the series ordered by date.
    pub fn record_measurement(
        &mut self,
        indicator_id: Uuid,
        date: Date,
        value: f64,
        note: &str,
    ) -> Result<Uuid, EditorError> {
        if !value.is_finite() {
            return Err(EditorError::InvalidValue { field: "value", reason: "must be a finite number" });
        }
        let indicator = self.get_mut(indicator_id)?;
        let measurement = Measurement { id: Uuid::new_v4(), date, value, note: note.trim().to_owned() };
        let id = measurement.id;
        let pos = indicator.measurements.partition_point(|m| m.date <= date);
        indicator.measurements.insert(pos, measurement);
        Ok(id)
    }

    pub fn remove_measurement(&mut self, indicator_id: Uuid, measurement_id: Uuid) -> Result<(), EditorError> {
        let indicator = self.get_mut(indicator_id)?;
        let pos = indicator
            .measurements
            .iter()
            .position(|m| m.id == measurement_id)
            .ok_or(EditorError::NotFound(measurement_id))?;
        indicator.measurements.remove(pos);
        Ok(())
    }
}

// =============================================================================
// STATISTICS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorStats {
    pub indicator_id: Uuid,
    pub name: String,
    pub count: usize,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub latest: Option<f64>,
    pub slope_per_day: Option<f64>,
    pub trend: Trend,
    /// Share of the baseline-to-target distance covered by the latest reading.
    pub attainment: Option<f64>,
    pub target_met: bool,
}

impl Indicator {
    fn classify(&self, slope: Option<f64>) -> Trend {
        let Some(slope) = slope else {
            return Trend::InsufficientData;
        };
        if slope.abs() <= STABLE_SLOPE_EPSILON {
            return Trend::Stable;
        }
        match (self.direction, slope > 0.0) {
            (Direction::HigherIsBetter, true) | (Direction::LowerIsBetter, false) => Trend::Improving,
            _ => Trend::Degrading,
        }
    }

    #[must_use]
    pub fn stats(&self) -> IndicatorStats {
        let values: Vec<f64> = self.measurements.iter().map(|m| m.value).collect();
        let latest = values.last().copied();

        let slope_per_day = self.measurements.first().and_then(|first| {
            let points: Vec<(f64, f64)> = self
                .measurements
                .iter()
                .map(|m| {
                    #[allow(clippy::cast_precision_loss)]
                    let days = (m.date - first.date).whole_days() as f64;
                    (days, m.value)
                })
                .collect();
            linear_regression(&points).map(|fit| fit.slope)
        });

        let attainment = match (self.baseline, self.target, latest) {
            (Some(baseline), Some(target), Some(latest)) if (target - baseline).abs() > f64::EPSILON => {
                Some((latest - baseline) / (target - baseline))
            }
            _ => None,
        };
        let target_met = match (self.target, latest) {
            (Some(target), Some(latest)) => match self.direction {
                Direction::HigherIsBetter => latest >= target,
                Direction::LowerIsBetter => latest <= target,
            },
            _ => false,
        };

        IndicatorStats {
            indicator_id: self.id,
            name: self.name.clone(),
            count: values.len(),
            average: mean(&values),
            min: values.iter().copied().reduce(f64::min),
            max: values.iter().copied().reduce(f64::max),
            latest,
            slope_per_day,
            trend: self.classify(slope_per_day),
            attainment,
            target_met,
        }
    }
}

impl IndicatorBoard {
    #[must_use]
    pub fn analyze(&self) -> Vec<IndicatorStats> {
        self.indicators.iter().map(Indicator::stats).collect()
    }
}

#[cfg(test)]
#[path = "indicators_test.rs"]
mod tests;
