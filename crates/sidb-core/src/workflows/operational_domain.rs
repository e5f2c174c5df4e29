//! Operational domain exploration.
//!
//! A domain is a sparse map over a two-dimensional parameter grid. Every
//! strategy evaluates points in batches: the batch is evaluated in parallel
//! and then merged into the domain by the coordinating thread, which is the
//! only owner of the map. A point is never evaluated twice.

use super::operational::is_operational;
use super::temperature;
use crate::core::models::domain::{
    DomainRecord, OperationalDomain, OperationalStatus, ParameterPoint, StepPoint,
};
use crate::core::models::gate::GateDesign;
use crate::core::physics::params::SimulationParameters;
use crate::engine::config::{
    CriticalTemperatureConfig, ExplorationStrategy, IsOperationalConfig, OperationalDomainConfig,
};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter, TaskScope};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Outcome of evaluating one parameter point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointEvaluation {
    pub status: OperationalStatus,
    pub value: Option<f64>,
    pub simulator_invocations: u64,
}

impl PointEvaluation {
    pub fn new(status: OperationalStatus) -> Self {
        Self {
            status,
            value: None,
            simulator_invocations: 0,
        }
    }
}

/// Decides the status of a single parameter point.
pub trait PointEvaluator: Sync {
    fn evaluate(&self, params: &SimulationParameters) -> Result<PointEvaluation, EngineError>;
}

impl<F> PointEvaluator for F
where
    F: Fn(&SimulationParameters) -> Result<PointEvaluation, EngineError> + Sync,
{
    fn evaluate(&self, params: &SimulationParameters) -> Result<PointEvaluation, EngineError> {
        self(params)
    }
}

/// Evaluates points with [`is_operational`].
pub struct GateEvaluator<'g> {
    gate: &'g GateDesign,
    config: IsOperationalConfig,
}

impl<'g> GateEvaluator<'g> {
    pub fn new(gate: &'g GateDesign, config: IsOperationalConfig) -> Self {
        Self { gate, config }
    }
}

impl PointEvaluator for GateEvaluator<'_> {
    fn evaluate(&self, params: &SimulationParameters) -> Result<PointEvaluation, EngineError> {
        let (status, simulator_invocations) = is_operational(self.gate, params, &self.config)?;
        Ok(PointEvaluation {
            status,
            value: None,
            simulator_invocations,
        })
    }
}

/// Records the gate's critical temperature at every point. A point is
/// operational when the gate's ground states are correct.
pub struct CriticalTemperatureEvaluator<'g> {
    gate: &'g GateDesign,
    config: CriticalTemperatureConfig,
}

impl<'g> CriticalTemperatureEvaluator<'g> {
    pub fn new(gate: &'g GateDesign, config: CriticalTemperatureConfig) -> Self {
        Self { gate, config }
    }
}

impl PointEvaluator for CriticalTemperatureEvaluator<'_> {
    fn evaluate(&self, params: &SimulationParameters) -> Result<PointEvaluation, EngineError> {
        let result =
            temperature::gate_based(self.gate, params, &self.config, &ProgressReporter::new())?;
        let status = if result.ground_state_correct {
            OperationalStatus::Operational
        } else {
            OperationalStatus::NonOperational
        };
        Ok(PointEvaluation {
            status,
            value: Some(result.critical_temperature),
            simulator_invocations: result.simulator_invocations,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainStats {
    pub runtime: Duration,
    pub simulator_invocations: u64,
    pub evaluated_points: usize,
    pub operational_points: usize,
    pub non_operational_points: usize,
}

/// Clockwise Moore neighbourhood, starting north (`y` grows upwards).
const MOORE_CLOCKWISE: [(i64, i64); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

type GridPoint = (i64, i64);

struct Explorer<'e, 'r, 'a, E: PointEvaluator + ?Sized> {
    config: &'e OperationalDomainConfig,
    evaluator: &'e E,
    domain: OperationalDomain,
    simulator_invocations: u64,
    rng: StdRng,
    task: TaskScope<'r, 'a>,
}

impl<E: PointEvaluator + ?Sized> Explorer<'_, '_, '_, E> {
    fn parameters_at(&self, step: StepPoint) -> SimulationParameters {
        let point = self.domain.parameter_point(step);
        self.config
            .base_parameters
            .with_sweep_value(self.config.x_axis.parameter, point.x)
            .with_sweep_value(self.config.y_axis.parameter, point.y)
    }

    fn random_step(&mut self) -> StepPoint {
        let (nx, ny) = self.domain.grid_size();
        StepPoint::new(self.rng.gen_range(0..nx), self.rng.gen_range(0..ny))
    }

    fn to_step(&self, point: GridPoint) -> Option<StepPoint> {
        let (x, y) = (usize::try_from(point.0).ok()?, usize::try_from(point.1).ok()?);
        let step = StepPoint::new(x, y);
        self.domain.contains_step(step).then_some(step)
    }

    /// Evaluates all points of the batch that are inside the grid and not yet
    /// recorded. Returns the status of every newly recorded point.
    fn evaluate_batch(
        &mut self,
        candidates: impl IntoIterator<Item = StepPoint>,
    ) -> Result<Vec<(StepPoint, OperationalStatus)>, EngineError> {
        let mut pending: Vec<StepPoint> = candidates
            .into_iter()
            .filter(|&s| self.domain.contains_step(s) && self.domain.get(s).is_none())
            .collect();
        pending.sort_unstable();
        pending.dedup();

        let jobs: Vec<(StepPoint, SimulationParameters)> = pending
            .iter()
            .map(|&s| (s, self.parameters_at(s)))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let iterator = jobs.iter();

        #[cfg(feature = "parallel")]
        let iterator = jobs.par_iter();

        let evaluator = self.evaluator;
        let task = &self.task;
        let evaluations: Vec<Result<(StepPoint, PointEvaluation), EngineError>> = iterator
            .map(|(step, params)| {
                let evaluation = evaluator.evaluate(params).map(|e| (*step, e));
                task.increment();
                evaluation
            })
            .collect();

        let mut statuses = Vec::with_capacity(evaluations.len());
        for evaluation in evaluations {
            let (step, evaluation) = evaluation?;
            self.simulator_invocations += evaluation.simulator_invocations;
            let stored = self.domain.record(
                step,
                DomainRecord {
                    status: evaluation.status,
                    value: evaluation.value,
                },
            );
            statuses.push((step, stored.status));
        }
        Ok(statuses)
    }

    /// Status of a grid point, evaluating it on first access. Points outside
    /// the grid count as non-operational.
    fn status_at(&mut self, point: GridPoint) -> Result<OperationalStatus, EngineError> {
        let Some(step) = self.to_step(point) else {
            return Ok(OperationalStatus::NonOperational);
        };
        if let Some(status) = self.domain.status(step) {
            return Ok(status);
        }
        self.evaluate_batch([step])?;
        Ok(self
            .domain
            .status(step)
            .unwrap_or(OperationalStatus::NonOperational))
    }

    fn grid_search(&mut self) -> Result<(), EngineError> {
        let (nx, ny) = self.domain.grid_size();
        let all = (0..nx).flat_map(|x| (0..ny).map(move |y| StepPoint::new(x, y)));
        self.evaluate_batch(all)?;
        Ok(())
    }

    fn random_sampling(&mut self, samples: usize) -> Result<(), EngineError> {
        let steps: Vec<StepPoint> = (0..samples).map(|_| self.random_step()).collect();
        self.evaluate_batch(steps)?;
        Ok(())
    }

    /// Draws random points one at a time until an operational one is found.
    fn find_operational_point(&mut self, samples: usize) -> Result<Option<StepPoint>, EngineError> {
        for _ in 0..samples {
            let step = self.random_step();
            let point = (step.x as i64, step.y as i64);
            if self.status_at(point)?.is_operational() {
                return Ok(Some(step));
            }
        }
        Ok(None)
    }

    fn flood_fill(
        &mut self,
        samples: usize,
        seeds: &[ParameterPoint],
    ) -> Result<(), EngineError> {
        let mut seed_steps = Vec::with_capacity(seeds.len());
        for seed in seeds {
            match (
                self.config.x_axis.step_of(seed.x),
                self.config.y_axis.step_of(seed.y),
            ) {
                (Some(x), Some(y)) => seed_steps.push(StepPoint::new(x, y)),
                _ => warn!(x = seed.x, y = seed.y, "Flood fill seed lies outside the grid."),
            }
        }
        self.evaluate_batch(seed_steps.iter().copied())?;

        let mut frontier: Vec<StepPoint> = seed_steps
            .into_iter()
            .filter(|&s| self.domain.status(s) == Some(OperationalStatus::Operational))
            .collect();
        if frontier.is_empty() {
            frontier.extend(self.find_operational_point(samples)?);
        }
        if frontier.is_empty() {
            info!("No operational point found; flood fill has nothing to expand.");
            return Ok(());
        }

        let mut rounds = 0;
        while !frontier.is_empty() {
            let neighbours: Vec<StepPoint> = frontier
                .iter()
                .flat_map(|s| {
                    let (x, y) = (s.x as i64, s.y as i64);
                    [(x + 1, y), (x - 1, y), (x, y + 1), (x, y - 1)]
                })
                .filter_map(|p| self.to_step(p))
                .collect();
            frontier = self
                .evaluate_batch(neighbours)?
                .into_iter()
                .filter(|(_, status)| status.is_operational())
                .map(|(step, _)| step)
                .collect();
            rounds += 1;
        }
        debug!(rounds, "Flood fill exhausted its frontier.");
        Ok(())
    }

    fn contour_tracing(&mut self, samples: usize) -> Result<(), EngineError> {
        let Some(found) = self.find_operational_point(samples)? else {
            info!("No operational point found; no contour to trace.");
            return Ok(());
        };

        let mut current = (found.x as i64, found.y as i64);
        loop {
            let next = (current.0 + 1, current.1);
            if !self.status_at(next)?.is_operational() {
                break;
            }
            current = next;
        }

        let start = current;
        let start_backtrack = (start.0 + 1, start.1);
        let (mut position, mut backtrack) = (start, start_backtrack);
        let mut seen: HashSet<(GridPoint, GridPoint)> = HashSet::new();
        let mut steps = 0;

        while seen.insert((position, backtrack)) {
            let offset = (backtrack.0 - position.0, backtrack.1 - position.1);
            let Some(from) = MOORE_CLOCKWISE.iter().position(|&d| d == offset) else {
                return Err(EngineError::Internal(format!(
                    "backtrack {:?} is not adjacent to {:?}",
                    backtrack, position
                )));
            };

            let mut previous = backtrack;
            let mut next = None;
            for k in 1..MOORE_CLOCKWISE.len() {
                let (dx, dy) = MOORE_CLOCKWISE[(from + k) % MOORE_CLOCKWISE.len()];
                let candidate = (position.0 + dx, position.1 + dy);
                if self.status_at(candidate)?.is_operational() {
                    next = Some(candidate);
                    break;
                }
                previous = candidate;
            }

            let Some(next) = next else {
                debug!("Operational point without operational neighbours.");
                break;
            };
            position = next;
            backtrack = previous;
            steps += 1;
            if position == start && backtrack == start_backtrack {
                break;
            }
        }
        debug!(steps, "Contour traced.");
        Ok(())
    }
}

/// Explores the parameter grid with the configured strategy.
#[instrument(skip_all, name = "operational_domain_workflow", fields(strategy = config.strategy.name()))]
pub fn run<E: PointEvaluator + ?Sized>(
    config: &OperationalDomainConfig,
    evaluator: &E,
    reporter: &ProgressReporter,
) -> Result<(OperationalDomain, DomainStats), EngineError> {
    let start = Instant::now();
    let domain = OperationalDomain::new(config.x_axis, config.y_axis);
    let (nx, ny) = domain.grid_size();
    info!(
        x = %config.x_axis.parameter,
        y = %config.y_axis.parameter,
        grid_points = nx * ny,
        "Exploring operational domain."
    );

    reporter.report(Progress::PhaseStart {
        name: "Operational Domain",
    });
    let mut explorer = Explorer {
        config,
        evaluator,
        domain,
        simulator_invocations: 0,
        rng: match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        },
        task: reporter.task((nx * ny) as u64),
    };

    match &config.strategy {
        ExplorationStrategy::GridSearch => explorer.grid_search()?,
        ExplorationStrategy::RandomSampling { samples } => explorer.random_sampling(*samples)?,
        ExplorationStrategy::FloodFill { samples, seeds } => explorer.flood_fill(*samples, seeds)?,
        ExplorationStrategy::ContourTracing { samples } => explorer.contour_tracing(*samples)?,
    }

    let Explorer {
        domain,
        simulator_invocations,
        task,
        ..
    } = explorer;
    drop(task);
    reporter.report(Progress::PhaseFinish);

    let stats = DomainStats {
        runtime: start.elapsed(),
        simulator_invocations,
        evaluated_points: domain.len(),
        operational_points: domain.num_operational(),
        non_operational_points: domain.num_non_operational(),
    };
    info!(
        evaluated = stats.evaluated_points,
        operational = stats.operational_points,
        simulator_invocations = stats.simulator_invocations,
        "Operational domain explored."
    );
    Ok((domain, stats))
}

/// Operational domain of a gate under [`is_operational`].
pub fn gate_domain(
    gate: &GateDesign,
    config: &OperationalDomainConfig,
    operational_config: &IsOperationalConfig,
    reporter: &ProgressReporter,
) -> Result<(OperationalDomain, DomainStats), EngineError> {
    run(
        config,
        &GateEvaluator::new(gate, operational_config.clone()),
        reporter,
    )
}

/// Operational domain of a gate with the critical temperature recorded as the
/// value of every point.
pub fn critical_temperature_domain(
    gate: &GateDesign,
    config: &OperationalDomainConfig,
    temperature_config: &CriticalTemperatureConfig,
    reporter: &ProgressReporter,
) -> Result<(OperationalDomain, DomainStats), EngineError> {
    temperature_config.validate()?;
    run(
        config,
        &CriticalTemperatureEvaluator::new(gate, temperature_config.clone()),
        reporter,
    )
}
