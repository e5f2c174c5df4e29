//! Critical temperature: the highest temperature at which the system still
//! occupies correct charge configurations with the required confidence.
//!
//! States are weighted by their Boltzmann factor `exp(-(E - E0) / (k_B T))`.
//! The temperature is scanned upwards in steps of [`TEMPERATURE_STEP`] kelvin
//! until the summed occupation of erroneous states exceeds
//! `1 - confidence_level`.

use super::operational::{can_positive_charges_occur, configuration_is_correct};
use super::simulate;
use crate::core::models::gate::GateDesign;
use crate::core::models::layout::SidbLayout;
use crate::core::physics::constants::{BOLTZMANN_EV, ENERGY_DEGENERACY_TOLERANCE};
use crate::core::physics::params::SimulationParameters;
use crate::engine::config::{CriticalTemperatureConfig, KinkPolicy};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{debug, info, instrument};

pub const TEMPERATURE_STEP: f64 = 0.01;

/// An energy level of a simulation result and whether it is a correct state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifiedState {
    pub energy: f64,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CriticalTemperatureResult {
    pub algorithm_name: &'static str,
    /// In kelvin. Zero when a ground state is already erroneous.
    pub critical_temperature: f64,
    /// Smallest energy distance between a ground state and an erroneous
    /// state over all simulated layouts, in eV.
    pub energy_gap_to_first_erroneous: Option<f64>,
    pub ground_state_correct: bool,
    pub simulator_invocations: u64,
}

/// Summed Boltzmann occupation of the erroneous states at `temperature` K.
pub fn erroneous_occupation(states: &[ClassifiedState], temperature: f64) -> f64 {
    let Some(e0) = states.iter().map(|s| s.energy).reduce(f64::min) else {
        return 0.0;
    };
    let kt = BOLTZMANN_EV * temperature;
    let (mut total, mut erroneous) = (0.0, 0.0);
    for state in states {
        let weight = (-(state.energy - e0) / kt).exp();
        total += weight;
        if !state.correct {
            erroneous += weight;
        }
    }
    if total > 0.0 { erroneous / total } else { 0.0 }
}

/// Critical temperature of one set of classified states.
///
/// Zero when an erroneous state is degenerate with the ground state,
/// `max_temperature` when the threshold is never crossed.
pub fn critical_temperature_of(
    states: &[ClassifiedState],
    confidence_level: f64,
    max_temperature: f64,
) -> f64 {
    let Some(e0) = states.iter().map(|s| s.energy).reduce(f64::min) else {
        return 0.0;
    };
    if states
        .iter()
        .any(|s| !s.correct && s.energy - e0 <= ENERGY_DEGENERACY_TOLERANCE)
    {
        return 0.0;
    }
    if states.iter().all(|s| s.correct) {
        return max_temperature;
    }

    let threshold = 1.0 - confidence_level;
    let num_steps = (max_temperature / TEMPERATURE_STEP).round() as u64;
    (1..=num_steps)
        .map(|k| k as f64 * TEMPERATURE_STEP)
        .find(|&t| erroneous_occupation(states, t) > threshold)
        .unwrap_or(max_temperature)
}

fn energy_gap(states: &[ClassifiedState]) -> Option<f64> {
    let e0 = states.iter().map(|s| s.energy).reduce(f64::min)?;
    states
        .iter()
        .filter(|s| !s.correct)
        .map(|s| s.energy - e0)
        .reduce(f64::min)
}

/// Critical temperature of a gate: for every input pattern, states whose
/// outputs differ from the truth table are erroneous. The lowest temperature
/// over all patterns is reported.
#[instrument(skip_all, name = "critical_temperature_gate_based")]
pub fn gate_based(
    gate: &GateDesign,
    params: &SimulationParameters,
    config: &CriticalTemperatureConfig,
    reporter: &ProgressReporter,
) -> Result<CriticalTemperatureResult, EngineError> {
    config.validate()?;
    let silent = ProgressReporter::new();

    reporter.report(Progress::PhaseStart {
        name: "Critical Temperature",
    });
    let task = reporter.task(gate.num_patterns());

    let mut critical_temperature = config.max_temperature;
    let mut gap: Option<f64> = None;
    let mut invocations = 0;
    let mut ground_state_correct = true;

    for pattern in 0..gate.num_patterns() {
        let layout = gate.pattern_layout(pattern)?;
        if can_positive_charges_occur(&layout, params)? {
            debug!(pattern, "Positive charges can occur.");
            ground_state_correct = false;
            critical_temperature = 0.0;
            break;
        }

        let result = simulate::run(&layout, params, &config.engine, &silent)?;
        invocations += 1;
        task.increment();

        let states = result
            .charge_distributions
            .iter()
            .map(|surface| {
                Ok(ClassifiedState {
                    energy: surface.system_energy(),
                    correct: configuration_is_correct(
                        gate,
                        &layout,
                        pattern,
                        surface,
                        KinkPolicy::AcceptKinks,
                    )?,
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        let temperature =
            critical_temperature_of(&states, config.confidence_level, config.max_temperature);
        debug!(pattern, temperature, states = states.len(), "Pattern evaluated.");
        if states.is_empty() || temperature == 0.0 {
            ground_state_correct = false;
        }
        critical_temperature = critical_temperature.min(temperature);
        if let Some(g) = energy_gap(&states) {
            gap = Some(gap.map_or(g, |current| current.min(g)));
        }
        if !ground_state_correct {
            critical_temperature = 0.0;
            break;
        }
    }
    drop(task);
    reporter.report(Progress::PhaseFinish);

    info!(
        critical_temperature,
        ground_state_correct, "Critical temperature determined."
    );
    Ok(CriticalTemperatureResult {
        algorithm_name: config.engine.name(),
        critical_temperature,
        energy_gap_to_first_erroneous: gap,
        ground_state_correct,
        simulator_invocations: invocations,
    })
}

/// Critical temperature of a plain layout: every state above the ground
/// state energy counts as erroneous.
#[instrument(skip_all, name = "critical_temperature_non_gate_based")]
pub fn non_gate_based(
    layout: &SidbLayout,
    params: &SimulationParameters,
    config: &CriticalTemperatureConfig,
    reporter: &ProgressReporter,
) -> Result<CriticalTemperatureResult, EngineError> {
    config.validate()?;

    reporter.report(Progress::PhaseStart {
        name: "Critical Temperature",
    });
    let result = simulate::run(layout, params, &config.engine, &ProgressReporter::new())?;
    let states: Vec<ClassifiedState> = match result.ground_state_energy() {
        Some(e0) => result
            .charge_distributions
            .iter()
            .map(|s| ClassifiedState {
                energy: s.system_energy(),
                correct: s.system_energy() - e0 <= ENERGY_DEGENERACY_TOLERANCE,
            })
            .collect(),
        None => Vec::new(),
    };
    let critical_temperature =
        critical_temperature_of(&states, config.confidence_level, config.max_temperature);
    reporter.report(Progress::PhaseFinish);

    info!(critical_temperature, "Critical temperature determined.");
    Ok(CriticalTemperatureResult {
        algorithm_name: config.engine.name(),
        critical_temperature,
        energy_gap_to_first_erroneous: energy_gap(&states),
        ground_state_correct: !states.is_empty(),
        simulator_invocations: 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lattice::Lattice;
    use crate::engine::config::{ConfigError, SimulationEngine};
    use crate::workflows::operational::tests::identity_gate;

    const TOLERANCE: f64 = 1e-9;

    fn state(energy: f64, correct: bool) -> ClassifiedState {
        ClassifiedState { energy, correct }
    }

    #[test]
    fn occupation_is_zero_without_erroneous_states() {
        let states = [state(0.0, true), state(0.1, true)];
        assert!(erroneous_occupation(&states, 300.0).abs() < TOLERANCE);
    }

    #[test]
    fn occupation_approaches_half_for_two_levels_at_high_temperature() {
        let states = [state(0.0, true), state(1e-4, false)];
        let p = erroneous_occupation(&states, 1e6);
        assert!((p - 0.5).abs() < 1e-3);
    }

    #[test]
    fn two_level_system_crosses_threshold_at_expected_temperature() {
        let states = [state(0.0, true), state(0.01, false)];
        let t = critical_temperature_of(&states, 0.99, 400.0);
        // exp(-0.01 / kT) / (1 + exp(-0.01 / kT)) = 0.01 at T = 25.2553 K
        assert!((t - 25.26).abs() < 0.011, "got {t}");
    }

    #[test]
    fn degenerate_erroneous_ground_state_gives_zero() {
        let states = [state(0.0, true), state(1e-9, false)];
        assert_eq!(critical_temperature_of(&states, 0.99, 400.0), 0.0);
    }

    #[test]
    fn only_correct_states_reach_max_temperature() {
        let states = [state(-0.2, true)];
        assert_eq!(critical_temperature_of(&states, 0.99, 350.0), 350.0);
    }

    #[test]
    fn non_gate_based_matches_first_excited_state() {
        let layout =
            SidbLayout::from_coords(Lattice::Si100, [(0, 0, 0), (0, 0, 1), (2, 2, 0)]).unwrap();
        let params = SimulationParameters {
            mu_minus: -0.28,
            ..Default::default()
        };
        let result = non_gate_based(
            &layout,
            &params,
            &CriticalTemperatureConfig {
                engine: SimulationEngine::Exhaustive,
                ..Default::default()
            },
            &ProgressReporter::new(),
        )
        .unwrap();
        assert!((result.critical_temperature - 94.36).abs() < 0.02);
        let gap = result.energy_gap_to_first_erroneous.unwrap();
        assert!((gap - 0.037362).abs() < 1e-5);
        assert!(result.ground_state_correct);
    }

    #[test]
    fn gate_with_single_valid_state_per_pattern_reaches_max_temperature() {
        let gate = identity_gate(vec![]);
        let result = gate_based(
            &gate,
            &SimulationParameters::default(),
            &CriticalTemperatureConfig::default(),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(result.critical_temperature, 400.0);
        assert!(result.ground_state_correct);
        assert_eq!(result.simulator_invocations, 2);
        assert_eq!(result.energy_gap_to_first_erroneous, None);
        assert_eq!(result.algorithm_name, "QuickExact");
    }

    #[test]
    fn non_operational_gate_has_zero_critical_temperature() {
        let gate = identity_gate(vec![]);
        let params = SimulationParameters {
            mu_minus: -0.4,
            ..Default::default()
        };
        let result = gate_based(
            &gate,
            &params,
            &CriticalTemperatureConfig::default(),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(result.critical_temperature, 0.0);
        assert!(!result.ground_state_correct);
    }

    #[test]
    fn invalid_confidence_level_is_rejected() {
        let config = CriticalTemperatureConfig {
            confidence_level: 1.5,
            ..Default::default()
        };
        let result = gate_based(
            &identity_gate(vec![]),
            &SimulationParameters::default(),
            &config,
            &ProgressReporter::new(),
        );
        assert!(matches!(
            result,
            Err(EngineError::Config {
                source: ConfigError::InvalidValue { .. }
            })
        ));
    }
}
