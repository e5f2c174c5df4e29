use crate::core::models::domain::{ParameterPoint, SweepAxis};
use crate::core::physics::params::SimulationParameters;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        parameter,
        reason: reason.into(),
    }
}

pub const DEFAULT_QUICKSIM_ITERATION_STEPS: u64 = 80;
pub const DEFAULT_QUICKSIM_ALPHA: f64 = 0.7;
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.99;
pub const DEFAULT_MAX_TEMPERATURE: f64 = 400.0;
/// Upper bound on the number of points of an operational-domain grid.
pub const MAX_DOMAIN_GRID_POINTS: usize = 100_000_000;

fn available_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuickSimConfig {
    /// Total number of search rounds, shared across all workers.
    pub iteration_steps: u64,
    /// Fraction of the largest neutral-to-negative distance a site must reach
    /// to be considered in an adjacent search step.
    pub alpha: f64,
    pub number_threads: usize,
    pub timeout: Option<Duration>,
    /// Worker `w` draws from a generator seeded with `seed + w`.
    pub seed: Option<u64>,
}

impl Default for QuickSimConfig {
    fn default() -> Self {
        Self {
            iteration_steps: DEFAULT_QUICKSIM_ITERATION_STEPS,
            alpha: DEFAULT_QUICKSIM_ALPHA,
            number_threads: available_threads(),
            timeout: None,
            seed: None,
        }
    }
}

#[derive(Default)]
pub struct QuickSimConfigBuilder {
    iteration_steps: Option<u64>,
    alpha: Option<f64>,
    number_threads: Option<usize>,
    timeout: Option<Duration>,
    seed: Option<u64>,
}

impl QuickSimConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iteration_steps(mut self, steps: u64) -> Self {
        self.iteration_steps = Some(steps);
        self
    }
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }
    pub fn number_threads(mut self, threads: usize) -> Self {
        self.number_threads = Some(threads);
        self
    }
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<QuickSimConfig, ConfigError> {
        let defaults = QuickSimConfig::default();
        let config = QuickSimConfig {
            iteration_steps: self.iteration_steps.unwrap_or(defaults.iteration_steps),
            alpha: self.alpha.unwrap_or(defaults.alpha),
            number_threads: self.number_threads.unwrap_or(defaults.number_threads),
            timeout: self.timeout,
            seed: self.seed,
        };
        if config.iteration_steps == 0 {
            return Err(invalid("iteration_steps", "must be at least 1"));
        }
        if !(config.alpha > 0.0 && config.alpha <= 1.0) {
            return Err(invalid("alpha", format!("{} is not in (0, 1]", config.alpha)));
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuickExactConfig {
    /// Drop to two charge states when no site can become positive.
    pub automatic_base_detection: bool,
}

impl Default for QuickExactConfig {
    fn default() -> Self {
        Self {
            automatic_base_detection: true,
        }
    }
}

/// Ground-state search algorithm together with its settings.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationEngine {
    Exhaustive,
    QuickSim(QuickSimConfig),
    QuickExact(QuickExactConfig),
}

impl Default for SimulationEngine {
    fn default() -> Self {
        SimulationEngine::QuickExact(QuickExactConfig::default())
    }
}

impl SimulationEngine {
    pub fn name(&self) -> &'static str {
        match self {
            SimulationEngine::Exhaustive => "ExGS",
            SimulationEngine::QuickSim(_) => "QuickSim",
            SimulationEngine::QuickExact(_) => "QuickExact",
        }
    }

    /// Whether the engine is guaranteed to return every valid configuration.
    pub fn is_exact(&self) -> bool {
        !matches!(self, SimulationEngine::QuickSim(_))
    }
}

/// Treatment of wire pairs that do not carry their expected signal while the
/// outputs are correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KinkPolicy {
    #[default]
    AcceptKinks,
    RejectKinks,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IsOperationalConfig {
    pub engine: SimulationEngine,
    pub kinks: KinkPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CriticalTemperatureConfig {
    pub engine: SimulationEngine,
    /// Required probability of finding the system in a correct state.
    pub confidence_level: f64,
    /// Upper end of the temperature scan in K.
    pub max_temperature: f64,
}

impl Default for CriticalTemperatureConfig {
    fn default() -> Self {
        Self {
            engine: SimulationEngine::default(),
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            max_temperature: DEFAULT_MAX_TEMPERATURE,
        }
    }
}

impl CriticalTemperatureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.confidence_level > 0.0 && self.confidence_level <= 1.0) {
            return Err(invalid(
                "confidence_level",
                format!("{} is not in (0, 1]", self.confidence_level),
            ));
        }
        if !(self.max_temperature.is_finite() && self.max_temperature > 0.0) {
            return Err(invalid("max_temperature", "must be a positive number of kelvin"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExplorationStrategy {
    GridSearch,
    RandomSampling {
        samples: usize,
    },
    FloodFill {
        samples: usize,
        /// Points evaluated before any random sampling.
        seeds: Vec<ParameterPoint>,
    },
    ContourTracing {
        samples: usize,
    },
}

impl ExplorationStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ExplorationStrategy::GridSearch => "grid_search",
            ExplorationStrategy::RandomSampling { .. } => "random_sampling",
            ExplorationStrategy::FloodFill { .. } => "flood_fill",
            ExplorationStrategy::ContourTracing { .. } => "contour_tracing",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationalDomainConfig {
    pub x_axis: SweepAxis,
    pub y_axis: SweepAxis,
    /// Parameters for every point; the swept values replace the matching fields.
    pub base_parameters: SimulationParameters,
    pub strategy: ExplorationStrategy,
    pub seed: Option<u64>,
}

#[derive(Default)]
pub struct OperationalDomainConfigBuilder {
    x_axis: Option<SweepAxis>,
    y_axis: Option<SweepAxis>,
    base_parameters: Option<SimulationParameters>,
    strategy: Option<ExplorationStrategy>,
    seed: Option<u64>,
}

impl OperationalDomainConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x_axis(mut self, axis: SweepAxis) -> Self {
        self.x_axis = Some(axis);
        self
    }
    pub fn y_axis(mut self, axis: SweepAxis) -> Self {
        self.y_axis = Some(axis);
        self
    }
    pub fn base_parameters(mut self, params: SimulationParameters) -> Self {
        self.base_parameters = Some(params);
        self
    }
    pub fn strategy(mut self, strategy: ExplorationStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<OperationalDomainConfig, ConfigError> {
        let config = OperationalDomainConfig {
            x_axis: self.x_axis.ok_or(ConfigError::MissingParameter("x_axis"))?,
            y_axis: self.y_axis.ok_or(ConfigError::MissingParameter("y_axis"))?,
            base_parameters: self.base_parameters.unwrap_or_default(),
            strategy: self
                .strategy
                .ok_or(ConfigError::MissingParameter("strategy"))?,
            seed: self.seed,
        };
        if config.x_axis.parameter == config.y_axis.parameter {
            return Err(invalid(
                "y_axis",
                format!("both axes sweep {}", config.x_axis.parameter),
            ));
        }
        validate_axis("x_axis", &config.x_axis, &config.base_parameters)?;
        validate_axis("y_axis", &config.y_axis, &config.base_parameters)?;
        let grid_points = config
            .x_axis
            .num_steps()
            .checked_mul(config.y_axis.num_steps())
            .filter(|&points| points <= MAX_DOMAIN_GRID_POINTS);
        if grid_points.is_none() {
            return Err(invalid(
                "y_axis",
                format!("the grid exceeds {} points", MAX_DOMAIN_GRID_POINTS),
            ));
        }
        if let ExplorationStrategy::RandomSampling { samples }
        | ExplorationStrategy::ContourTracing { samples } = config.strategy
        {
            if samples == 0 {
                return Err(invalid("samples", "must be at least 1"));
            }
        }
        Ok(config)
    }
}

fn validate_axis(
    name: &'static str,
    axis: &SweepAxis,
    base: &SimulationParameters,
) -> Result<(), ConfigError> {
    if !(axis.min.is_finite() && axis.max.is_finite() && axis.step.is_finite()) {
        return Err(invalid(name, "bounds and step must be finite"));
    }
    if axis.step <= 0.0 {
        return Err(invalid(name, format!("step {} must be positive", axis.step)));
    }
    if axis.max < axis.min {
        return Err(invalid(
            name,
            format!("max {} is below min {}", axis.max, axis.min),
        ));
    }
    let intervals = ((axis.max - axis.min) / axis.step).round();
    if !intervals.is_finite() || intervals >= MAX_DOMAIN_GRID_POINTS as f64 {
        return Err(invalid(
            name,
            format!(
                "step {} yields more than {} points",
                axis.step, MAX_DOMAIN_GRID_POINTS
            ),
        ));
    }
    for value in [axis.min, axis.max] {
        base.with_sweep_value(axis.parameter, value)
            .validate()
            .map_err(|e| invalid(name, e.to_string()))?;
    }
    Ok(())
}
