use super::surface::ChargeDistributionSurface;
use crate::core::physics::constants::ENERGY_DEGENERACY_TOLERANCE;
use crate::core::physics::params::SimulationParameters;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdditionalParameter {
    Integer(i64),
    Real(f64),
}

impl fmt::Display for AdditionalParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdditionalParameter::Integer(v) => write!(f, "{}", v),
            AdditionalParameter::Real(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub iterations_completed: u64,
    pub timed_out: bool,
    pub configurations_visited: u64,
}

/// Energy levels of a result with the number of configurations at each level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnergyDistribution {
    levels: Vec<(f64, usize)>,
}

impl EnergyDistribution {
    /// Groups ascending energies whose distance to the first energy of the
    /// group is within `tolerance`.
    pub fn from_sorted_energies(energies: impl IntoIterator<Item = f64>, tolerance: f64) -> Self {
        let mut levels: Vec<(f64, usize)> = Vec::new();
        for energy in energies {
            match levels.last_mut() {
                Some((level, count)) if (energy - *level).abs() <= tolerance => *count += 1,
                _ => levels.push((energy, 1)),
            }
        }
        Self { levels }
    }

    /// `(energy, degeneracy)` pairs in ascending energy order.
    pub fn levels(&self) -> &[(f64, usize)] {
        &self.levels
    }

    pub fn ground_state_degeneracy(&self) -> usize {
        self.levels.first().map(|&(_, g)| g).unwrap_or(0)
    }

    pub fn num_states(&self) -> usize {
        self.levels.iter().map(|&(_, g)| g).sum()
    }
}

/// Outcome of one ground-state search.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub algorithm_name: &'static str,
    pub params: SimulationParameters,
    pub runtime: Duration,
    /// Physically valid configurations in ascending energy order.
    pub charge_distributions: Vec<ChargeDistributionSurface>,
    pub additional_parameters: BTreeMap<String, AdditionalParameter>,
    pub stats: SearchStats,
}

impl SimulationResult {
    pub fn new(
        algorithm_name: &'static str,
        params: SimulationParameters,
        runtime: Duration,
        mut charge_distributions: Vec<ChargeDistributionSurface>,
        stats: SearchStats,
    ) -> Self {
        charge_distributions.sort_by(|a, b| {
            a.system_energy()
                .partial_cmp(&b.system_energy())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.charges().cmp(b.charges()))
        });
        Self {
            algorithm_name,
            params,
            runtime,
            charge_distributions,
            additional_parameters: BTreeMap::new(),
            stats,
        }
    }

    pub fn with_parameter(mut self, name: &str, value: AdditionalParameter) -> Self {
        self.additional_parameters.insert(name.to_string(), value);
        self
    }

    pub fn num_valid(&self) -> usize {
        self.charge_distributions.len()
    }

    pub fn ground_state_energy(&self) -> Option<f64> {
        self.charge_distributions.first().map(|s| s.system_energy())
    }

    /// All configurations degenerate with the lowest energy.
    pub fn ground_states(&self) -> Vec<&ChargeDistributionSurface> {
        match self.ground_state_energy() {
            Some(e0) => self
                .charge_distributions
                .iter()
                .take_while(|s| s.system_energy() - e0 <= ENERGY_DEGENERACY_TOLERANCE)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn energy_distribution(&self) -> EnergyDistribution {
        EnergyDistribution::from_sorted_energies(
            self.charge_distributions.iter().map(|s| s.system_energy()),
            ENERGY_DEGENERACY_TOLERANCE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lattice::Lattice;
    use crate::core::models::charge::ChargeState;
    use crate::core::models::layout::SidbLayout;
    use crate::engine::surface::UpdateMode;

    #[test]
    fn energy_distribution_merges_near_degenerate_levels() {
        let dist = EnergyDistribution::from_sorted_energies([0.1, 0.1 + 1e-8, 0.2, 0.5, 0.5], 1e-6);
        assert_eq!(dist.levels().len(), 3);
        assert_eq!(dist.ground_state_degeneracy(), 2);
        assert_eq!(dist.num_states(), 5);
        assert_eq!(dist.levels()[2], (0.5, 2));
    }

    #[test]
    fn empty_distribution_has_no_ground_state() {
        let dist = EnergyDistribution::from_sorted_energies(Vec::new(), 1e-6);
        assert_eq!(dist.ground_state_degeneracy(), 0);
        assert_eq!(dist.num_states(), 0);
    }

    #[test]
    fn new_sorts_configurations_by_energy() {
        let layout = SidbLayout::from_coords(Lattice::Si100, [(0, 0, 0), (2, 0, 0)]).unwrap();
        let params = SimulationParameters::default();
        let all_negative = ChargeDistributionSurface::from_layout(&layout, params).unwrap();
        let mut one_neutral = all_negative.clone();
        one_neutral
            .assign_charge_state(0, ChargeState::Neutral, UpdateMode::Immediate)
            .unwrap();
        let mut other_neutral = all_negative.clone();
        other_neutral
            .assign_charge_state(1, ChargeState::Neutral, UpdateMode::Immediate)
            .unwrap();

        let result = SimulationResult::new(
            "test",
            params,
            Duration::ZERO,
            vec![all_negative, other_neutral, one_neutral],
            SearchStats::default(),
        )
        .with_parameter("base_number", AdditionalParameter::Integer(3));

        assert_eq!(result.num_valid(), 3);
        assert_eq!(result.ground_state_energy(), Some(0.0));
        let ground = result.ground_states();
        assert_eq!(ground.len(), 2);
        assert_eq!(ground[0].charges(), &[ChargeState::Negative, ChargeState::Neutral]);
        assert_eq!(result.energy_distribution().levels().len(), 2);
        assert_eq!(
            result.additional_parameters.get("base_number"),
            Some(&AdditionalParameter::Integer(3))
        );
    }
}
