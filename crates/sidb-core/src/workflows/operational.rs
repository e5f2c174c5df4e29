use super::simulate;
use crate::core::models::charge::ChargeState;
use crate::core::models::domain::OperationalStatus;
use crate::core::models::gate::{BdlPair, GateDesign};
use crate::core::models::layout::{LayoutError, SidbLayout};
use crate::core::physics::params::SimulationParameters;
use crate::engine::config::{IsOperationalConfig, KinkPolicy};
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressReporter;
use crate::engine::surface::ChargeDistributionSurface;
use tracing::{debug, instrument, trace};

/// Whether any site of the layout can hold a positive charge in a physically
/// valid configuration.
///
/// Evaluated on the all-negative configuration, which gives every site its
/// lowest possible local potential.
pub fn can_positive_charges_occur(
    layout: &SidbLayout,
    params: &SimulationParameters,
) -> Result<bool, EngineError> {
    let surface = ChargeDistributionSurface::from_layout(layout, *params)?;
    Ok(!surface.positive_candidates().is_empty())
}

/// Logic value of a BDL pair, or `None` when the pair holds no clean bit.
pub fn read_bdl_pair(
    surface: &ChargeDistributionSurface,
    layout: &SidbLayout,
    pair: &BdlPair,
) -> Result<Option<bool>, EngineError> {
    let upper = layout
        .index_of(pair.upper)
        .ok_or(LayoutError::UnknownSite(pair.upper))?;
    let lower = layout
        .index_of(pair.lower)
        .ok_or(LayoutError::UnknownSite(pair.lower))?;
    let state = |site| {
        surface
            .charge_state(site)
            .ok_or(EngineError::SiteOutOfRange {
                index: site,
                num_sites: surface.num_sites(),
            })
    };
    Ok(match (state(upper)?, state(lower)?) {
        (ChargeState::Neutral, ChargeState::Negative) => Some(true),
        (ChargeState::Negative, ChargeState::Neutral) => Some(false),
        _ => None,
    })
}

/// Whether a charge configuration of the layout simulated for `pattern`
/// shows the gate's intended outputs.
pub fn configuration_is_correct(
    gate: &GateDesign,
    layout: &SidbLayout,
    pattern: u64,
    surface: &ChargeDistributionSurface,
    kinks: KinkPolicy,
) -> Result<bool, EngineError> {
    for (output, pair) in gate.outputs().iter().enumerate() {
        let expected = gate.truth_tables()[output].bit(pattern);
        if read_bdl_pair(surface, layout, pair)? != Some(expected) {
            return Ok(false);
        }
    }
    if kinks == KinkPolicy::RejectKinks {
        for wire in gate.wires() {
            let expected = gate.expected_signal(pattern, wire.signal);
            for pair in &wire.pairs {
                if read_bdl_pair(surface, layout, pair)? != Some(expected) {
                    trace!(pattern, ?wire.signal, "Kink in BDL wire.");
                    return Ok(false);
                }
            }
        }
    }
    Ok(true)
}

/// Checks the gate against its truth tables for every input pattern.
///
/// Returns the status together with the number of simulator invocations,
/// which is lower than the number of patterns when a pattern fails early.
#[instrument(level = "debug", skip_all, name = "is_operational")]
pub fn is_operational(
    gate: &GateDesign,
    params: &SimulationParameters,
    config: &IsOperationalConfig,
) -> Result<(OperationalStatus, u64), EngineError> {
    let silent = ProgressReporter::new();
    let mut simulator_calls = 0;

    for pattern in 0..gate.num_patterns() {
        let layout = gate.pattern_layout(pattern)?;

        if can_positive_charges_occur(&layout, params)? {
            debug!(pattern, "Positive charges can occur.");
            return Ok((OperationalStatus::NonOperational, simulator_calls));
        }

        let result = simulate::run(&layout, params, &config.engine, &silent)?;
        simulator_calls += 1;

        let ground_states = result.ground_states();
        if ground_states.is_empty() {
            debug!(pattern, "No physically valid configuration found.");
            return Ok((OperationalStatus::NonOperational, simulator_calls));
        }
        for surface in ground_states {
            if !configuration_is_correct(gate, &layout, pattern, surface, config.kinks)? {
                debug!(pattern, "Ground state does not match the truth table.");
                return Ok((OperationalStatus::NonOperational, simulator_calls));
            }
        }
    }
    Ok((OperationalStatus::Operational, simulator_calls))
}
