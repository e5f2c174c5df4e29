use crate::core::models::layout::SidbLayout;
use crate::core::physics::params::SimulationParameters;
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressReporter;
use crate::engine::result::{AdditionalParameter, SearchStats, SimulationResult};
use crate::engine::surface::ChargeDistributionSurface;
use crate::engine::utils::partition::{split_range, worker_chunks};
use std::ops::Range;
use std::time::Instant;
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub const ALGORITHM_NAME: &str = "ExGS";

/// Visits every charge configuration and keeps the physically valid ones.
#[instrument(skip_all, name = "exhaustive_task")]
pub fn run(
    layout: &SidbLayout,
    params: &SimulationParameters,
    reporter: &ProgressReporter,
) -> Result<SimulationResult, EngineError> {
    let start = Instant::now();
    let template = ChargeDistributionSurface::from_layout(layout, *params)?;
    let total = template.max_charge_index()? + 1;

    info!(
        sites = template.num_sites(),
        base = params.base,
        configurations = total,
        "Enumerating all charge configurations."
    );

    let chunks = split_range(total, worker_chunks());
    let task = reporter.task(chunks.len() as u64);

    #[cfg(not(feature = "parallel"))]
    let iterator = chunks.iter();

    #[cfg(feature = "parallel")]
    let iterator = chunks.par_iter();

    let chunk_results: Vec<Result<Vec<ChargeDistributionSurface>, EngineError>> = iterator
        .map(|range| {
            let found = enumerate_range(&template, range.clone());
            task.increment();
            found
        })
        .collect();
    drop(task);

    let mut valid = Vec::new();
    for found in chunk_results {
        valid.extend(found?);
    }

    debug!(valid = valid.len(), "Exhaustive enumeration complete.");

    let stats = SearchStats {
        iterations_completed: total,
        timed_out: false,
        configurations_visited: total,
    };
    Ok(
        SimulationResult::new(ALGORITHM_NAME, *params, start.elapsed(), valid, stats)
            .with_parameter(
                "global_potential",
                AdditionalParameter::Real(layout.global_potential()),
            ),
    )
}

fn enumerate_range(
    template: &ChargeDistributionSurface,
    range: Range<u64>,
) -> Result<Vec<ChargeDistributionSurface>, EngineError> {
    let mut surface = template.clone();
    surface.index_to_charge_distribution(range.start)?;
    let mut valid = Vec::new();
    let mut index = range.start;
    loop {
        if surface.is_physically_valid() {
            valid.push(surface.clone());
        }
        index += 1;
        if index >= range.end {
            break;
        }
        surface.increase_charge_index_by_one()?;
    }
    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lattice::Lattice;
    use crate::core::models::charge::ChargeState;

    fn pair() -> SidbLayout {
        SidbLayout::from_coords(Lattice::Si100, [(0, 0, 0), (2, 0, 0)]).unwrap()
    }

    fn params(mu_minus: f64) -> SimulationParameters {
        SimulationParameters {
            mu_minus,
            ..Default::default()
        }
    }

    #[test]
    fn close_pair_is_doubly_negative_at_default_mu() {
        let result = run(&pair(), &params(-0.32), &ProgressReporter::new()).unwrap();
        assert_eq!(result.num_valid(), 1);
        assert_eq!(
            result.charge_distributions[0].charges(),
            &[ChargeState::Negative, ChargeState::Negative]
        );
        assert_eq!(result.stats.configurations_visited, 9);
        assert_eq!(result.algorithm_name, "ExGS");
    }

    #[test]
    fn close_pair_shares_one_electron_at_shallower_mu() {
        let result = run(&pair(), &params(-0.2), &ProgressReporter::new()).unwrap();
        let ground = result.ground_states();
        assert_eq!(ground.len(), 2);
        let mut charges: Vec<_> = ground.iter().map(|s| s.charges().to_vec()).collect();
        charges.sort();
        assert_eq!(
            charges,
            vec![
                vec![ChargeState::Negative, ChargeState::Neutral],
                vec![ChargeState::Neutral, ChargeState::Negative],
            ]
        );
    }

    #[test]
    fn every_returned_configuration_is_valid_and_unique() {
        let layout = SidbLayout::from_coords(
            Lattice::Si100,
            [(0, 0, 0), (1, 0, 0), (3, 0, 0), (6, 1, 1), (9, 0, 0)],
        )
        .unwrap();
        let result = run(&layout, &params(-0.25), &ProgressReporter::new()).unwrap();
        assert!(result.num_valid() > 0);
        let mut seen = std::collections::HashSet::new();
        for s in &result.charge_distributions {
            assert!(s.is_physically_valid());
            assert!(seen.insert(s.charges().to_vec()));
        }
        let energies: Vec<f64> = result
            .charge_distributions
            .iter()
            .map(|s| s.system_energy())
            .collect();
        assert!(energies.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn single_threaded_scan_finds_the_same_configurations() {
        let layout = SidbLayout::from_coords(
            Lattice::Si100,
            [(0, 0, 0), (2, 0, 0), (5, 0, 0), (7, 1, 0)],
        )
        .unwrap();
        let p = params(-0.28);
        let result = run(&layout, &p, &ProgressReporter::new()).unwrap();

        let mut reference = ChargeDistributionSurface::from_layout(&layout, p).unwrap();
        let mut expected = Vec::new();
        for index in 0..=reference.max_charge_index().unwrap() {
            reference.index_to_charge_distribution(index).unwrap();
            if reference.is_physically_valid() {
                expected.push(reference.charges().to_vec());
            }
        }
        let mut found: Vec<_> = result
            .charge_distributions
            .iter()
            .map(|s| s.charges().to_vec())
            .collect();
        found.sort();
        expected.sort();
        assert_eq!(found, expected);
    }

    #[test]
    fn base_two_never_produces_positive_charges() {
        let layout =
            SidbLayout::from_coords(Lattice::Si100, [(0, 0, 0), (1, 0, 0), (2, 0, 0)]).unwrap();
        let p = SimulationParameters {
            base: 2,
            ..Default::default()
        };
        let result = run(&layout, &p, &ProgressReporter::new()).unwrap();
        assert_eq!(result.stats.configurations_visited, 8);
        assert!(
            result
                .charge_distributions
                .iter()
                .all(|s| s.num_charged(ChargeState::Positive) == 0)
        );
    }

    #[test]
    fn empty_layout_has_one_empty_configuration() {
        let layout = SidbLayout::new(Lattice::Si100);
        let result = run(&layout, &params(-0.32), &ProgressReporter::new()).unwrap();
        assert_eq!(result.num_valid(), 1);
        assert_eq!(result.ground_state_energy(), Some(0.0));
    }
}
