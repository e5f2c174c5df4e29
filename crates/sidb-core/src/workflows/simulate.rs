use crate::core::models::layout::SidbLayout;
use crate::core::physics::params::SimulationParameters;
use crate::engine::config::SimulationEngine;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::result::SimulationResult;
use crate::engine::tasks::{exhaustive, quickexact, quicksim};
use tracing::{info, instrument};

/// Finds the physically valid charge configurations of a layout with the
/// selected engine.
#[instrument(skip_all, name = "simulation_workflow", fields(engine = engine.name()))]
pub fn run(
    layout: &SidbLayout,
    params: &SimulationParameters,
    engine: &SimulationEngine,
    reporter: &ProgressReporter,
) -> Result<SimulationResult, EngineError> {
    params.validate()?;

    reporter.report(Progress::PhaseStart {
        name: "Ground-State Search",
    });
    let result = match engine {
        SimulationEngine::Exhaustive => exhaustive::run(layout, params, reporter),
        SimulationEngine::QuickSim(config) => quicksim::run(layout, params, config, reporter),
        SimulationEngine::QuickExact(config) => quickexact::run(layout, params, config, reporter),
    }?;
    reporter.report(Progress::PhaseFinish);

    info!(
        valid = result.num_valid(),
        ground_state_energy = ?result.ground_state_energy(),
        runtime_ms = result.runtime.as_millis() as u64,
        "Simulation finished."
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lattice::Lattice;
    use crate::core::physics::params::ParameterError;
    use crate::engine::config::{QuickExactConfig, QuickSimConfigBuilder};
    use std::sync::Mutex;

    fn wire() -> SidbLayout {
        SidbLayout::from_coords(
            Lattice::Si100,
            [(0, 0, 0), (2, 0, 0), (6, 0, 0), (8, 0, 0), (12, 0, 0)],
        )
        .unwrap()
    }

    #[test]
    fn all_engines_agree_on_ground_state_energy() {
        let params = SimulationParameters::default();
        let reporter = ProgressReporter::new();
        let quicksim = SimulationEngine::QuickSim(
            QuickSimConfigBuilder::new()
                .seed(3)
                .number_threads(1)
                .build()
                .unwrap(),
        );
        let engines = [
            SimulationEngine::Exhaustive,
            SimulationEngine::QuickExact(QuickExactConfig::default()),
            quicksim,
        ];
        let energies: Vec<f64> = engines
            .iter()
            .map(|e| {
                run(&wire(), &params, e, &reporter)
                    .unwrap()
                    .ground_state_energy()
                    .unwrap()
            })
            .collect();
        assert!((energies[0] - energies[1]).abs() < 1e-9);
        assert!((energies[0] - energies[2]).abs() < 1e-9);
    }

    #[test]
    fn reports_engine_name_and_phase_events() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|e| {
            if matches!(e, Progress::PhaseStart { .. } | Progress::PhaseFinish) {
                events.lock().unwrap().push(e);
            }
        }));
        let result = run(
            &wire(),
            &SimulationParameters::default(),
            &SimulationEngine::Exhaustive,
            &reporter,
        )
        .unwrap();
        drop(reporter);
        assert_eq!(result.algorithm_name, "ExGS");
        assert_eq!(
            events.into_inner().unwrap(),
            vec![
                Progress::PhaseStart {
                    name: "Ground-State Search"
                },
                Progress::PhaseFinish
            ]
        );
    }

    #[test]
    fn invalid_parameters_are_rejected_before_search() {
        let params = SimulationParameters {
            epsilon_r: 0.0,
            ..Default::default()
        };
        let result = run(
            &wire(),
            &params,
            &SimulationEngine::default(),
            &ProgressReporter::new(),
        );
        assert!(matches!(
            result,
            Err(EngineError::Parameters {
                source: ParameterError::NonPositivePermittivity(_)
            })
        ));
    }
}
