mod defaults;

use crate::cli::{EngineArgs, EngineKind, OpdomArgs, PhysicsArgs, StrategyKind, TemperatureArgs};
use crate::error::{CliError, Result};
use crate::utils::parser;
use defaults::DefaultsConfig;
use serde::Deserialize;
use sidbsim::core::models::domain::{ParameterPoint, SweepAxis};
use sidbsim::core::physics::params::SimulationParameters;
use sidbsim::engine::config as core_config;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialPhysicsConfig {
    epsilon_r: Option<f64>,
    lambda_tf: Option<f64>,
    mu_minus: Option<f64>,
    base: Option<u8>,
    charge_transition_gap: Option<f64>,
    stability_tolerance: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialEngineConfig {
    engine: Option<String>,
    iteration_steps: Option<u64>,
    alpha: Option<f64>,
    timeout_seconds: Option<f64>,
    seed: Option<u64>,
    automatic_base_detection: Option<bool>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct PartialAxisConfig {
    parameter: String,
    min: f64,
    max: f64,
    step: f64,
}

impl PartialAxisConfig {
    fn resolve(&self) -> Result<SweepAxis> {
        let parameter = parser::parse_sweep_parameter_name(&self.parameter)
            .map_err(|e| CliError::Config(e.to_string()))?;
        Ok(SweepAxis::new(parameter, self.min, self.max, self.step))
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialDomainConfig {
    x_axis: Option<PartialAxisConfig>,
    y_axis: Option<PartialAxisConfig>,
    strategy: Option<String>,
    samples: Option<usize>,
    seed: Option<u64>,
    /// Flood-fill starting points as `[x, y]` parameter pairs.
    seeds: Option<Vec<[f64; 2]>>,
    reject_kinks: Option<bool>,
    critical_temperature: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialTemperatureConfig {
    confidence_level: Option<f64>,
    max_temperature: Option<f64>,
}

/// Settings of the `opdom` command after merging file, flags and defaults.
#[derive(Debug, Clone)]
pub struct DomainSettings {
    pub domain: core_config::OperationalDomainConfig,
    pub operational: core_config::IsOperationalConfig,
    /// Set when every point records its critical temperature.
    pub critical_temperature: Option<core_config::CriticalTemperatureConfig>,
}

/// Contents of a TOML configuration file. Every value is optional; command
/// line flags take precedence, `--set` overrides are applied to the file
/// values before merging.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialConfig {
    physics: Option<PartialPhysicsConfig>,
    engine: Option<PartialEngineConfig>,
    operational_domain: Option<PartialDomainConfig>,
    temperature: Option<PartialTemperatureConfig>,
}

fn parse_engine_name(name: &str) -> Result<EngineKind> {
    match name.trim().to_ascii_lowercase().as_str() {
        "exgs" | "exhaustive" => Ok(EngineKind::Exgs),
        "quicksim" => Ok(EngineKind::Quicksim),
        "quickexact" => Ok(EngineKind::Quickexact),
        other => Err(CliError::Config(format!(
            "Unknown engine '{}'. Expected 'exgs', 'quicksim' or 'quickexact'.",
            other
        ))),
    }
}

fn parse_strategy_name(name: &str) -> Result<StrategyKind> {
    match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
        "grid" | "grid-search" => Ok(StrategyKind::Grid),
        "random" | "random-sampling" => Ok(StrategyKind::Random),
        "flood-fill" => Ok(StrategyKind::FloodFill),
        "contour" | "contour-tracing" => Ok(StrategyKind::Contour),
        other => Err(CliError::Config(format!(
            "Unknown exploration strategy '{}'. Expected 'grid', 'random', 'flood-fill' or 'contour'.",
            other
        ))),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

impl PartialConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Reads the file when one is given and applies the `--set` overrides.
    pub fn load(path: Option<&Path>, set_values: &[String]) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_set_values(set_values)?;
        Ok(config)
    }

    pub fn resolve_parameters(&self, args: &PhysicsArgs) -> Result<SimulationParameters> {
        let file = self.physics.clone().unwrap_or_default();
        let defaults = SimulationParameters::default();
        let params = SimulationParameters {
            epsilon_r: args
                .epsilon_r
                .or(file.epsilon_r)
                .unwrap_or(defaults.epsilon_r),
            lambda_tf: args
                .lambda_tf
                .or(file.lambda_tf)
                .unwrap_or(defaults.lambda_tf),
            mu_minus: args.mu_minus.or(file.mu_minus).unwrap_or(defaults.mu_minus),
            base: args.base.or(file.base).unwrap_or(defaults.base),
            charge_transition_gap: file
                .charge_transition_gap
                .unwrap_or(defaults.charge_transition_gap),
            stability_tolerance: file
                .stability_tolerance
                .unwrap_or(defaults.stability_tolerance),
        };
        params
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        Ok(params)
    }

    pub fn resolve_engine(&self, args: &EngineArgs) -> Result<core_config::SimulationEngine> {
        let file = self.engine.clone().unwrap_or_default();
        let defaults = DefaultsConfig::default();

        let kind = match (args.engine, file.engine.as_deref()) {
            (Some(kind), _) => kind,
            (None, Some(name)) => parse_engine_name(name)?,
            (None, None) => parse_engine_name(defaults.engine)?,
        };

        Ok(match kind {
            EngineKind::Exgs => core_config::SimulationEngine::Exhaustive,
            EngineKind::Quickexact => {
                core_config::SimulationEngine::QuickExact(core_config::QuickExactConfig {
                    automatic_base_detection: file
                        .automatic_base_detection
                        .unwrap_or(defaults.automatic_base_detection),
                })
            }
            EngineKind::Quicksim => {
                let mut builder = core_config::QuickSimConfigBuilder::new()
                    .iteration_steps(
                        args.iteration_steps
                            .or(file.iteration_steps)
                            .unwrap_or(defaults.iteration_steps),
                    )
                    .alpha(file.alpha.unwrap_or(defaults.alpha));
                if let Some(seconds) = args.timeout.or(file.timeout_seconds) {
                    let timeout = Duration::try_from_secs_f64(seconds).map_err(|_| {
                        CliError::Config(format!("Invalid timeout of {} seconds", seconds))
                    })?;
                    builder = builder.timeout(timeout);
                }
                if let Some(seed) = args.seed.or(file.seed) {
                    builder = builder.seed(seed);
                }
                let config = builder
                    .build()
                    .map_err(|e| CliError::Config(e.to_string()))?;
                core_config::SimulationEngine::QuickSim(config)
            }
        })
    }

    pub fn resolve_temperature(
        &self,
        confidence_level: Option<f64>,
        max_temperature: Option<f64>,
        engine: core_config::SimulationEngine,
    ) -> Result<core_config::CriticalTemperatureConfig> {
        let file = self.temperature.clone().unwrap_or_default();
        let defaults = DefaultsConfig::default();
        let config = core_config::CriticalTemperatureConfig {
            engine,
            confidence_level: confidence_level
                .or(file.confidence_level)
                .unwrap_or(defaults.confidence_level),
            max_temperature: max_temperature
                .or(file.max_temperature)
                .unwrap_or(defaults.max_temperature),
        };
        config
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        Ok(config)
    }

    pub fn merge_temperature_args(
        &self,
        args: &TemperatureArgs,
    ) -> Result<(SimulationParameters, core_config::CriticalTemperatureConfig)> {
        let params = self.resolve_parameters(&args.physics)?;
        let engine = self.resolve_engine(&args.engine)?;
        let config =
            self.resolve_temperature(args.confidence_level, args.max_temperature, engine)?;
        Ok((params, config))
    }

    pub fn merge_domain_args(&self, args: &OpdomArgs) -> Result<DomainSettings> {
        let file = self.operational_domain.clone().unwrap_or_default();
        let defaults = DefaultsConfig::default();
        let params = self.resolve_parameters(&args.physics)?;
        let engine = self.resolve_engine(&args.engine)?;

        let axis = |cli: Option<&String>, file: Option<&PartialAxisConfig>, name: &str| {
            match (cli, file) {
                (Some(text), _) => {
                    parser::parse_axis(text).map_err(|e| CliError::Argument(e.to_string()))
                }
                (None, Some(partial)) => partial.resolve(),
                (None, None) => Err(CliError::Config(format!(
                    "A value for '{}' is required either in the config file or via CLI argument.",
                    name
                ))),
            }
        };
        let x_axis = axis(args.x_axis.as_ref(), file.x_axis.as_ref(), "x-axis")?;
        let y_axis = axis(args.y_axis.as_ref(), file.y_axis.as_ref(), "y-axis")?;

        let kind = match (args.strategy, file.strategy.as_deref()) {
            (Some(kind), _) => kind,
            (None, Some(name)) => parse_strategy_name(name)?,
            (None, None) => parse_strategy_name(defaults.strategy)?,
        };
        let samples = args.samples.or(file.samples).unwrap_or(defaults.samples);
        let strategy = match kind {
            StrategyKind::Grid => core_config::ExplorationStrategy::GridSearch,
            StrategyKind::Random => core_config::ExplorationStrategy::RandomSampling { samples },
            StrategyKind::FloodFill => core_config::ExplorationStrategy::FloodFill {
                samples,
                seeds: file
                    .seeds
                    .unwrap_or_default()
                    .into_iter()
                    .map(|[x, y]| ParameterPoint { x, y })
                    .collect(),
            },
            StrategyKind::Contour => core_config::ExplorationStrategy::ContourTracing { samples },
        };

        let mut builder = core_config::OperationalDomainConfigBuilder::new()
            .x_axis(x_axis)
            .y_axis(y_axis)
            .base_parameters(params)
            .strategy(strategy);
        if let Some(seed) = args.engine.seed.or(file.seed) {
            builder = builder.seed(seed);
        }
        let domain = builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        let kinks = if args.reject_kinks || file.reject_kinks.unwrap_or(false) {
            core_config::KinkPolicy::RejectKinks
        } else {
            core_config::KinkPolicy::AcceptKinks
        };
        let critical_temperature =
            if args.critical_temperature || file.critical_temperature.unwrap_or(false) {
                Some(self.resolve_temperature(None, None, engine.clone())?)
            } else {
                None
            };

        Ok(DomainSettings {
            domain,
            operational: core_config::IsOperationalConfig { engine, kinks },
            critical_temperature,
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value_str) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;

            match key.trim() {
                "physics.epsilon-r" => {
                    self.physics.get_or_insert_with(Default::default).epsilon_r =
                        Some(parse_value(key, value_str, "float")?);
                }
                "physics.lambda-tf" => {
                    self.physics.get_or_insert_with(Default::default).lambda_tf =
                        Some(parse_value(key, value_str, "float")?);
                }
                "physics.mu-minus" => {
                    self.physics.get_or_insert_with(Default::default).mu_minus =
                        Some(parse_value(key, value_str, "float")?);
                }
                "physics.base" => {
                    self.physics.get_or_insert_with(Default::default).base =
                        Some(parse_value(key, value_str, "integer")?);
                }
                "physics.charge-transition-gap" => {
                    self.physics
                        .get_or_insert_with(Default::default)
                        .charge_transition_gap = Some(parse_value(key, value_str, "float")?);
                }
                "physics.stability-tolerance" => {
                    self.physics
                        .get_or_insert_with(Default::default)
                        .stability_tolerance = Some(parse_value(key, value_str, "float")?);
                }
                "engine.engine" => {
                    parse_engine_name(value_str)?;
                    self.engine.get_or_insert_with(Default::default).engine =
                        Some(value_str.trim().to_string());
                }
                "engine.iteration-steps" => {
                    self.engine.get_or_insert_with(Default::default).iteration_steps =
                        Some(parse_value(key, value_str, "integer")?);
                }
                "engine.alpha" => {
                    self.engine.get_or_insert_with(Default::default).alpha =
                        Some(parse_value(key, value_str, "float")?);
                }
                "engine.timeout-seconds" => {
                    self.engine.get_or_insert_with(Default::default).timeout_seconds =
                        Some(parse_value(key, value_str, "float")?);
                }
                "engine.seed" => {
                    self.engine.get_or_insert_with(Default::default).seed =
                        Some(parse_value(key, value_str, "integer")?);
                }
                "engine.automatic-base-detection" => {
                    self.engine
                        .get_or_insert_with(Default::default)
                        .automatic_base_detection = Some(parse_value(key, value_str, "boolean")?);
                }
                "operational-domain.strategy" => {
                    parse_strategy_name(value_str)?;
                    self.operational_domain
                        .get_or_insert_with(Default::default)
                        .strategy = Some(value_str.trim().to_string());
                }
                "operational-domain.samples" => {
                    self.operational_domain
                        .get_or_insert_with(Default::default)
                        .samples = Some(parse_value(key, value_str, "integer")?);
                }
                "operational-domain.seed" => {
                    self.operational_domain
                        .get_or_insert_with(Default::default)
                        .seed = Some(parse_value(key, value_str, "integer")?);
                }
                "temperature.confidence-level" => {
                    self.temperature
                        .get_or_insert_with(Default::default)
                        .confidence_level = Some(parse_value(key, value_str, "float")?);
                }
                "temperature.max-temperature" => {
                    self.temperature
                        .get_or_insert_with(Default::default)
                        .max_temperature = Some(parse_value(key, value_str, "float")?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
