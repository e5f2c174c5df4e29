use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

/// Physical parameter that can span one axis of an operational domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SweepParameter {
    EpsilonR,
    LambdaTf,
    MuMinus,
}

impl SweepParameter {
    pub fn name(self) -> &'static str {
        match self {
            SweepParameter::EpsilonR => "epsilon_r",
            SweepParameter::LambdaTf => "lambda_tf",
            SweepParameter::MuMinus => "mu_minus",
        }
    }
}

impl fmt::Display for SweepParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A regular sweep `min, min + step, ..., max` (both ends included).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepAxis {
    pub parameter: SweepParameter,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl SweepAxis {
    pub fn new(parameter: SweepParameter, min: f64, max: f64, step: f64) -> Self {
        Self {
            parameter,
            min,
            max,
            step,
        }
    }

    /// Number of grid points along the axis, saturating at `usize::MAX` for
    /// degenerate steps.
    pub fn num_steps(&self) -> usize {
        let intervals = ((self.max - self.min) / self.step).round();
        if intervals.is_nan() || intervals < 0.0 {
            return 1;
        }
        (intervals as usize).saturating_add(1)
    }

    #[inline]
    pub fn value(&self, step: usize) -> f64 {
        self.min + step as f64 * self.step
    }

    /// Snaps a parameter value to the nearest step, or `None` when it lies
    /// outside the axis.
    pub fn step_of(&self, value: f64) -> Option<usize> {
        let position = ((value - self.min) / self.step).round();
        if position < 0.0 || position as usize >= self.num_steps() {
            return None;
        }
        Some(position as usize)
    }
}

/// Grid coordinates of a parameter point, counted in steps along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepPoint {
    pub x: usize,
    pub y: usize,
}

impl StepPoint {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationalStatus {
    Operational,
    NonOperational,
}

impl OperationalStatus {
    pub fn is_operational(self) -> bool {
        self == OperationalStatus::Operational
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainRecord {
    pub status: OperationalStatus,
    /// Optional numeric figure of merit, e.g. a critical temperature.
    pub value: Option<f64>,
}

/// Sparse map from visited parameter points to their evaluation.
///
/// Entries are only ever added; a point that has been recorded keeps its first
/// evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationalDomain {
    x_axis: SweepAxis,
    y_axis: SweepAxis,
    records: BTreeMap<StepPoint, DomainRecord>,
}

impl OperationalDomain {
    pub fn new(x_axis: SweepAxis, y_axis: SweepAxis) -> Self {
        Self {
            x_axis,
            y_axis,
            records: BTreeMap::new(),
        }
    }

    pub fn x_axis(&self) -> &SweepAxis {
        &self.x_axis
    }

    pub fn y_axis(&self) -> &SweepAxis {
        &self.y_axis
    }

    pub fn grid_size(&self) -> (usize, usize) {
        (self.x_axis.num_steps(), self.y_axis.num_steps())
    }

    pub fn contains_step(&self, step: StepPoint) -> bool {
        let (nx, ny) = self.grid_size();
        step.x < nx && step.y < ny
    }

    pub fn parameter_point(&self, step: StepPoint) -> ParameterPoint {
        ParameterPoint {
            x: self.x_axis.value(step.x),
            y: self.y_axis.value(step.y),
        }
    }

    /// Records an evaluation unless the point was already visited. Returns the
    /// record that is stored afterwards.
    pub fn record(&mut self, step: StepPoint, record: DomainRecord) -> DomainRecord {
        match self.records.entry(step) {
            Entry::Occupied(existing) => *existing.get(),
            Entry::Vacant(slot) => *slot.insert(record),
        }
    }

    pub fn get(&self, step: StepPoint) -> Option<&DomainRecord> {
        self.records.get(&step)
    }

    pub fn status(&self, step: StepPoint) -> Option<OperationalStatus> {
        self.records.get(&step).map(|r| r.status)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StepPoint, ParameterPoint, &DomainRecord)> {
        self.records
            .iter()
            .map(|(step, record)| (*step, self.parameter_point(*step), record))
    }

    pub fn num_operational(&self) -> usize {
        self.records
            .values()
            .filter(|r| r.status.is_operational())
            .count()
    }

    pub fn num_non_operational(&self) -> usize {
        self.len() - self.num_operational()
    }
}
