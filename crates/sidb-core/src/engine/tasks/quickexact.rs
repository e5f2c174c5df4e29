use crate::core::models::charge::ChargeState;
use crate::core::models::layout::SidbLayout;
use crate::core::physics::params::SimulationParameters;
use crate::engine::config::QuickExactConfig;
use crate::engine::error::EngineError;
use crate::engine::gray_code::GrayCodeCursor;
use crate::engine::progress::ProgressReporter;
use crate::engine::result::{AdditionalParameter, SearchStats, SimulationResult};
use crate::engine::surface::{
    ChargeDistributionSurface, DependentCellMode, EnergyCalculation, UpdateMode,
};
use crate::engine::utils::partition::{split_range, worker_chunks};
use std::collections::HashSet;
use std::ops::Range;
use std::time::Instant;
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub const ALGORITHM_NAME: &str = "QuickExact";

/// The part of the layout that is actually enumerated.
struct SearchSpace {
    /// Sites not pinned to the negative state, in layout order.
    free: Vec<usize>,
    /// Free sites walked by the Gray code (all free sites but the dependent cell).
    gray_sites: Vec<usize>,
    radices: Vec<u8>,
}

/// Exact ground-state search with physically motivated pruning.
///
/// Returns exactly the physically valid configurations that exhaustive
/// enumeration finds.
#[instrument(skip_all, name = "quickexact_task")]
pub fn run(
    layout: &SidbLayout,
    params: &SimulationParameters,
    config: &QuickExactConfig,
    reporter: &ProgressReporter,
) -> Result<SimulationResult, EngineError> {
    let start = Instant::now();
    let mut surface = ChargeDistributionSurface::from_layout(layout, *params)?;
    let n = surface.num_sites();

    let required: HashSet<usize> = surface.required_negative_sites().into_iter().collect();
    let candidates: HashSet<usize> = surface.positive_candidates().into_iter().collect();

    let mut base = params.base;
    if config.automatic_base_detection && base == 3 && candidates.is_empty() {
        base = 2;
        surface.set_base(base)?;
    }

    let free: Vec<usize> = (0..n).filter(|i| !required.contains(i)).collect();
    info!(
        sites = n,
        pinned_negative = required.len(),
        positive_candidates = candidates.len(),
        base,
        "Starting QuickExact search."
    );

    let (valid, visited) = match free.split_first() {
        None => {
            let valid = if surface.is_physically_valid() {
                vec![surface]
            } else {
                Vec::new()
            };
            (valid, 1)
        }
        Some((&dependent, rest)) if rest.is_empty() => {
            enumerate_single_free_site(&surface, dependent)?
        }
        Some((&dependent, rest)) => {
            let radices = rest
                .iter()
                .map(|s| if base == 3 && candidates.contains(s) { 3 } else { 2 })
                .collect();
            let space = SearchSpace {
                gray_sites: rest.to_vec(),
                free: free.clone(),
                radices,
            };
            surface.assign_dependent_cell(dependent)?;
            traverse(&surface, &space, reporter)?
        }
    };

    debug!(valid = valid.len(), visited, "QuickExact search complete.");

    let stats = SearchStats {
        iterations_completed: visited,
        timed_out: false,
        configurations_visited: visited,
    };
    let params = SimulationParameters { base, ..*params };
    Ok(
        SimulationResult::new(ALGORITHM_NAME, params, start.elapsed(), valid, stats)
            .with_parameter("base_number", AdditionalParameter::Integer(base as i64))
            .with_parameter(
                "global_potential",
                AdditionalParameter::Real(layout.global_potential()),
            ),
    )
}

fn enumerate_single_free_site(
    template: &ChargeDistributionSurface,
    site: usize,
) -> Result<(Vec<ChargeDistributionSurface>, u64), EngineError> {
    let mut valid = Vec::new();
    let mut visited = 0;
    for state in ChargeState::ALL
        .into_iter()
        .filter(|s| s.is_supported_by(template.base()))
    {
        let mut surface = template.clone();
        surface.assign_charge_state(site, state, UpdateMode::Immediate)?;
        visited += 1;
        if surface.is_physically_valid() {
            valid.push(surface);
        }
    }
    Ok((valid, visited))
}

fn traverse(
    template: &ChargeDistributionSurface,
    space: &SearchSpace,
    reporter: &ProgressReporter,
) -> Result<(Vec<ChargeDistributionSurface>, u64), EngineError> {
    let total = GrayCodeCursor::sequence_length(&space.radices).ok_or(
        EngineError::IndexSpaceOverflow {
            num_sites: space.free.len(),
            base: template.base(),
        },
    )?;
    let chunks = split_range(total, worker_chunks());
    let task = reporter.task(chunks.len() as u64);

    #[cfg(not(feature = "parallel"))]
    let iterator = chunks.iter();

    #[cfg(feature = "parallel")]
    let iterator = chunks.par_iter();

    let chunk_results: Vec<Result<(Vec<ChargeDistributionSurface>, u64), EngineError>> = iterator
        .map(|range| {
            let found = traverse_range(template, space, range.clone());
            task.increment();
            found
        })
        .collect();
    drop(task);

    let mut valid = Vec::new();
    let mut visited = 0;
    for result in chunk_results {
        let (found, count) = result?;
        valid.extend(found);
        visited += count;
    }
    Ok((valid, visited))
}

fn state_of(digit: u8) -> Result<ChargeState, EngineError> {
    ChargeState::from_digit(digit)
        .ok_or_else(|| EngineError::Internal(format!("charge digit {} has no state", digit)))
}

fn traverse_range(
    template: &ChargeDistributionSurface,
    space: &SearchSpace,
    range: Range<u64>,
) -> Result<(Vec<ChargeDistributionSurface>, u64), EngineError> {
    let mut cursor = GrayCodeCursor::at_rank(space.radices.clone(), range.start)
        .ok_or_else(|| EngineError::Internal(format!("Gray rank {} out of range", range.start)))?;

    let mut surface = template.clone();
    for (&site, &digit) in space.gray_sites.iter().zip(cursor.digits()) {
        surface.assign_charge_state(site, state_of(digit)?, UpdateMode::Deferred)?;
    }
    surface.update_after_charge_change(DependentCellMode::Variable, EnergyCalculation::Update);

    let mut valid = Vec::new();
    let mut visited = 0;
    loop {
        visited += 1;
        if surface.is_population_stable_on(&space.free) && surface.is_physically_valid() {
            let mut accepted = surface.clone();
            accepted.clear_dependent_cell();
            valid.push(accepted);
        }
        if cursor.rank() + 1 >= range.end {
            break;
        }
        let change = cursor.advance().ok_or_else(|| {
            EngineError::Internal("Gray code ended inside its rank range".to_string())
        })?;
        surface.apply_delta(space.gray_sites[change.position], state_of(change.new)?)?;
        surface.update_dependent_cell();
    }
    Ok((valid, visited))
}
