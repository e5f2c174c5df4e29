use crate::core::models::charge::ChargeState;
use crate::core::models::layout::SidbLayout;
use crate::core::physics::params::SimulationParameters;
use crate::engine::config::QuickSimConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{ProgressReporter, TaskScope};
use crate::engine::result::{AdditionalParameter, SearchStats, SimulationResult};
use crate::engine::surface::{
    ChargeDistributionSurface, DependentCellMode, EnergyCalculation, UpdateMode,
};
use itertools::Itertools;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::mpsc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

pub const ALGORITHM_NAME: &str = "QuickSim";

#[derive(Debug, Default)]
struct WorkerOutcome {
    found: Vec<ChargeDistributionSurface>,
    rounds_completed: u64,
    visited: u64,
    timed_out: bool,
}

struct SearchPlan {
    rounds: u64,
    seeds_per_round: usize,
    steps_per_seed: usize,
    alpha: f64,
    seed: Option<u64>,
    deadline: Option<Instant>,
}

/// Randomized local search for low-energy valid configurations.
///
/// Not exhaustive: the ground state may be missed. Every returned
/// configuration is physically valid.
#[instrument(skip_all, name = "quicksim_task")]
pub fn run(
    layout: &SidbLayout,
    params: &SimulationParameters,
    config: &QuickSimConfig,
    reporter: &ProgressReporter,
) -> Result<SimulationResult, EngineError> {
    let start = Instant::now();
    let template = ChargeDistributionSurface::from_layout(layout, *params)?;
    let n = template.num_sites();

    let threads = config.number_threads.max(1);
    let plan = SearchPlan {
        rounds: (config.iteration_steps / threads as u64).max(1),
        seeds_per_round: (0.6 * n as f64).round() as usize,
        steps_per_seed: (n as f64 / 1.5) as usize,
        alpha: config.alpha,
        seed: config.seed,
        deadline: config.timeout.map(|t| start + t),
    };

    info!(
        sites = n,
        threads,
        rounds_per_thread = plan.rounds,
        "Starting QuickSim search."
    );

    let mut found = Vec::new();
    for state in [ChargeState::Neutral, ChargeState::Negative] {
        let mut surface = template.clone();
        surface.assign_all_charge_states(state)?;
        surface.update_after_charge_change(DependentCellMode::Fixed, EnergyCalculation::Update);
        if surface.is_physically_valid() {
            found.push(surface);
        }
    }

    let task = reporter.task(plan.rounds * threads as u64);
    let (sender, receiver) = mpsc::channel();

    #[cfg(feature = "parallel")]
    rayon::scope(|scope| {
        for worker_id in 0..threads {
            let sender = sender.clone();
            let (template, plan, task) = (&template, &plan, &task);
            scope.spawn(move |_| {
                let _ = sender.send(search_worker(template, worker_id, plan, task));
            });
        }
    });

    #[cfg(not(feature = "parallel"))]
    for worker_id in 0..threads {
        let _ = sender.send(search_worker(&template, worker_id, &plan, &task));
    }

    drop(sender);
    drop(task);

    let mut stats = SearchStats {
        configurations_visited: 2,
        ..Default::default()
    };
    for outcome in receiver {
        let outcome = outcome?;
        stats.iterations_completed += outcome.rounds_completed;
        stats.configurations_visited += outcome.visited;
        stats.timed_out |= outcome.timed_out;
        found.extend(outcome.found);
    }

    let found: Vec<ChargeDistributionSurface> = found
        .into_iter()
        .unique_by(|s| s.charges().to_vec())
        .collect();

    if stats.timed_out {
        warn!(
            rounds = stats.iterations_completed,
            "QuickSim stopped at its timeout."
        );
    }
    debug!(valid = found.len(), "QuickSim search complete.");

    Ok(
        SimulationResult::new(ALGORITHM_NAME, *params, start.elapsed(), found, stats)
            .with_parameter(
                "iteration_steps",
                AdditionalParameter::Integer(config.iteration_steps as i64),
            )
            .with_parameter("alpha", AdditionalParameter::Real(config.alpha)),
    )
}

fn search_worker(
    template: &ChargeDistributionSurface,
    worker_id: usize,
    plan: &SearchPlan,
    task: &TaskScope,
) -> Result<WorkerOutcome, EngineError> {
    let mut rng = match plan.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(worker_id as u64)),
        None => StdRng::from_entropy(),
    };
    let expired = || plan.deadline.is_some_and(|d| Instant::now() >= d);

    let mut surface = template.clone();
    let mut outcome = WorkerOutcome::default();

    'rounds: for _ in 0..plan.rounds {
        for seed_site in 0..plan.seeds_per_round {
            if expired() {
                outcome.timed_out = true;
                break 'rounds;
            }
            surface.assign_all_charge_states(ChargeState::Neutral)?;
            surface.assign_charge_state(seed_site, ChargeState::Negative, UpdateMode::Deferred)?;
            surface
                .update_after_charge_change(DependentCellMode::Fixed, EnergyCalculation::Update);
            record(&surface, &mut outcome);

            for _ in 0..plan.steps_per_seed {
                if expired() {
                    outcome.timed_out = true;
                    break 'rounds;
                }
                if !surface.adjacent_search(plan.alpha, &mut rng) {
                    break;
                }
                record(&surface, &mut outcome);
            }
        }
        outcome.rounds_completed += 1;
        task.increment();
    }
    Ok(outcome)
}

fn record(surface: &ChargeDistributionSurface, outcome: &mut WorkerOutcome) {
    outcome.visited += 1;
    if surface.is_physically_valid() {
        outcome.found.push(surface.clone());
    }
}
