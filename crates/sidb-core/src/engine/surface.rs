use super::error::EngineError;
use super::model::PotentialModel;
use crate::core::models::charge::ChargeState;
use crate::core::models::layout::SidbLayout;
use crate::core::physics::params::SimulationParameters;
use nalgebra::Point2;
use rand::Rng;
use rand::seq::SliceRandom;
use std::sync::Arc;

/// How a single-site assignment propagates into the cached potentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Update local potentials and the energy incrementally right away.
    Immediate,
    /// Only store the charge; caches are stale until the next
    /// [`ChargeDistributionSurface::update_after_charge_change`].
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependentCellMode {
    /// Keep the dependent cell's current charge.
    Fixed,
    /// Re-derive the dependent cell's charge from its local potential.
    Variable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyCalculation {
    Update,
    /// Leave the cached energy untouched. It is stale afterwards.
    KeepOldValue,
}

/// One site's charge transition as applied to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeDelta {
    pub site: usize,
    pub old: ChargeState,
    pub new: ChargeState,
}

/// A reason a site violates population stability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationViolation {
    pub site: usize,
    pub state: ChargeState,
    pub local_potential: f64,
}

/// Mutable charge configuration over a fixed layout.
///
/// Caches the local electrostatic potential of every site and the total
/// electrostatic energy. The charge index is a mixed-radix number whose digits
/// are [`ChargeState::digit`], site 0 being the most significant digit; the
/// dependent cell, if any, is skipped.
#[derive(Debug, Clone)]
pub struct ChargeDistributionSurface {
    model: Arc<PotentialModel>,
    charges: Vec<ChargeState>,
    local_potentials: Vec<f64>,
    energy: f64,
    dependent_cell: Option<usize>,
    stale: bool,
}

impl ChargeDistributionSurface {
    /// Creates a surface with every site negatively charged.
    pub fn new(model: Arc<PotentialModel>) -> Self {
        let n = model.num_sites();
        let mut surface = Self {
            model,
            charges: vec![ChargeState::Negative; n],
            local_potentials: vec![0.0; n],
            energy: 0.0,
            dependent_cell: None,
            stale: true,
        };
        surface.refresh(EnergyCalculation::Update);
        surface
    }

    pub fn from_layout(
        layout: &SidbLayout,
        params: SimulationParameters,
    ) -> Result<Self, EngineError> {
        Ok(Self::new(Arc::new(PotentialModel::new(layout, params)?)))
    }

    pub fn model(&self) -> &Arc<PotentialModel> {
        &self.model
    }

    pub fn params(&self) -> &SimulationParameters {
        self.model.params()
    }

    #[inline]
    pub fn base(&self) -> u8 {
        self.model.params().base
    }

    #[inline]
    pub fn num_sites(&self) -> usize {
        self.charges.len()
    }

    pub fn charges(&self) -> &[ChargeState] {
        &self.charges
    }

    pub fn charge_state(&self, site: usize) -> Option<ChargeState> {
        self.charges.get(site).copied()
    }

    pub fn local_potentials(&self) -> &[f64] {
        &self.local_potentials
    }

    pub fn local_potential(&self, site: usize) -> Option<f64> {
        self.local_potentials.get(site).copied()
    }

    /// Cached total electrostatic energy in eV.
    pub fn system_energy(&self) -> f64 {
        self.energy
    }

    pub fn dependent_cell(&self) -> Option<usize> {
        self.dependent_cell
    }

    pub fn nm_position(&self, site: usize) -> Point2<f64> {
        self.model.nm_position(site)
    }

    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.model.distance(i, j)
    }

    pub fn num_charged(&self, state: ChargeState) -> usize {
        self.charges.iter().filter(|&&c| c == state).count()
    }

    fn check_site(&self, site: usize) -> Result<(), EngineError> {
        if site >= self.num_sites() {
            return Err(EngineError::SiteOutOfRange {
                index: site,
                num_sites: self.num_sites(),
            });
        }
        Ok(())
    }

    fn check_state(&self, state: ChargeState) -> Result<(), EngineError> {
        if !state.is_supported_by(self.base()) {
            return Err(EngineError::UnsupportedChargeState {
                state,
                base: self.base(),
            });
        }
        Ok(())
    }

    pub fn assign_charge_state(
        &mut self,
        site: usize,
        state: ChargeState,
        mode: UpdateMode,
    ) -> Result<(), EngineError> {
        self.check_site(site)?;
        self.check_state(state)?;
        match mode {
            UpdateMode::Deferred => {
                self.charges[site] = state;
                self.stale = true;
            }
            UpdateMode::Immediate => {
                if self.dependent_cell == Some(site) {
                    return Err(EngineError::DependentCellAssignment(site));
                }
                if self.stale {
                    self.charges[site] = state;
                    self.refresh(EnergyCalculation::Update);
                } else {
                    self.flip(site, state);
                }
            }
        }
        Ok(())
    }

    /// Assigns `state` to every site in deferred mode.
    pub fn assign_all_charge_states(&mut self, state: ChargeState) -> Result<(), EngineError> {
        self.check_state(state)?;
        self.charges.fill(state);
        self.stale = true;
        Ok(())
    }

    /// Replaces the whole configuration in deferred mode.
    pub fn assign_charges(&mut self, charges: &[ChargeState]) -> Result<(), EngineError> {
        if charges.len() != self.num_sites() {
            return Err(EngineError::SiteOutOfRange {
                index: charges.len(),
                num_sites: self.num_sites(),
            });
        }
        for &state in charges {
            self.check_state(state)?;
        }
        self.charges.copy_from_slice(charges);
        self.stale = true;
        Ok(())
    }

    /// Recomputes every local potential from scratch.
    pub fn update_after_charge_change(
        &mut self,
        dependent_mode: DependentCellMode,
        energy_mode: EnergyCalculation,
    ) {
        self.refresh(EnergyCalculation::KeepOldValue);
        if dependent_mode == DependentCellMode::Variable {
            self.update_dependent_cell();
        }
        if energy_mode == EnergyCalculation::Update {
            self.recompute_energy();
        }
    }

    fn refresh(&mut self, energy_mode: EnergyCalculation) {
        let n = self.num_sites();
        for i in 0..n {
            let internal: f64 = (0..n)
                .map(|j| self.model.potential(i, j) * self.charges[j].sign_f64())
                .sum();
            self.local_potentials[i] = internal + self.model.fixed_potential(i);
        }
        self.stale = false;
        if energy_mode == EnergyCalculation::Update {
            self.recompute_energy();
        }
    }

    fn recompute_energy(&mut self) {
        self.energy = (0..self.num_sites())
            .map(|i| {
                let fixed = self.model.fixed_potential(i);
                let internal = self.local_potentials[i] - fixed;
                self.charges[i].sign_f64() * (0.5 * internal + fixed)
            })
            .sum();
    }

    // Incremental single-site change; requires fresh caches.
    fn flip(&mut self, site: usize, new: ChargeState) -> ChargeDelta {
        let old = self.charges[site];
        let delta = new.sign_f64() - old.sign_f64();
        if delta != 0.0 {
            self.energy += delta * self.local_potentials[site];
            for (i, loc) in self.local_potentials.iter_mut().enumerate() {
                *loc += self.model.potential(i, site) * delta;
            }
            self.charges[site] = new;
        }
        ChargeDelta { site, old, new }
    }

    /// Flips one site incrementally and returns the applied change.
    pub fn apply_delta(
        &mut self,
        site: usize,
        new_state: ChargeState,
    ) -> Result<ChargeDelta, EngineError> {
        self.check_site(site)?;
        self.check_state(new_state)?;
        if self.stale {
            self.refresh(EnergyCalculation::Update);
        }
        Ok(self.flip(site, new_state))
    }

    /// Charge state the dependent cell takes for a given local potential.
    pub fn dependent_state_for(&self, local_potential: f64) -> ChargeState {
        let params = self.params();
        let tol = params.stability_tolerance;
        if -local_potential + params.mu_minus < -tol {
            ChargeState::Negative
        } else if self.base() == 3 && -local_potential + params.mu_plus() > tol {
            ChargeState::Positive
        } else {
            ChargeState::Neutral
        }
    }

    /// Designates `site` as the dependent cell and derives its charge.
    pub fn assign_dependent_cell(&mut self, site: usize) -> Result<(), EngineError> {
        self.check_site(site)?;
        self.dependent_cell = Some(site);
        if self.stale {
            self.refresh(EnergyCalculation::Update);
        }
        self.update_dependent_cell();
        Ok(())
    }

    pub fn clear_dependent_cell(&mut self) {
        self.dependent_cell = None;
    }

    /// Re-derives the dependent cell's charge incrementally. Returns the change
    /// if the charge moved.
    pub fn update_dependent_cell(&mut self) -> Option<ChargeDelta> {
        let site = self.dependent_cell?;
        let state = self.dependent_state_for(self.local_potentials[site]);
        if state == self.charges[site] {
            return None;
        }
        Some(self.flip(site, state))
    }

    pub fn population_stability_violations(&self) -> Vec<PopulationViolation> {
        let params = self.params();
        let tol = params.stability_tolerance;
        let mu_minus = params.mu_minus;
        let mu_plus = params.mu_plus();
        self.charges
            .iter()
            .zip(&self.local_potentials)
            .enumerate()
            .filter(|(_, (state, loc))| {
                let stable = match state {
                    ChargeState::Negative => -**loc + mu_minus < tol,
                    ChargeState::Positive => -**loc + mu_plus > -tol,
                    ChargeState::Neutral => {
                        -**loc + mu_minus > -tol && -**loc + mu_plus < tol
                    }
                };
                !stable
            })
            .map(|(site, (&state, &local_potential))| PopulationViolation {
                site,
                state,
                local_potential,
            })
            .collect()
    }

    #[inline]
    fn is_site_population_stable(&self, site: usize) -> bool {
        let params = self.params();
        let tol = params.stability_tolerance;
        let loc = self.local_potentials[site];
        match self.charges[site] {
            ChargeState::Negative => -loc + params.mu_minus < tol,
            ChargeState::Positive => -loc + params.mu_plus() > -tol,
            ChargeState::Neutral => {
                -loc + params.mu_minus > -tol && -loc + params.mu_plus() < tol
            }
        }
    }

    pub fn is_population_stable(&self) -> bool {
        (0..self.num_sites()).all(|i| self.is_site_population_stable(i))
    }

    /// Population stability restricted to a subset of sites.
    pub fn is_population_stable_on(&self, sites: &[usize]) -> bool {
        sites.iter().all(|&i| self.is_site_population_stable(i))
    }

    /// No single electron hop from a site to a less negatively charged one
    /// lowers the energy.
    pub fn is_configuration_stable(&self) -> bool {
        let tol = self.params().stability_tolerance;
        let n = self.num_sites();
        for i in 0..n {
            let si = self.charges[i];
            if si == ChargeState::Positive {
                continue;
            }
            let dn = if si == ChargeState::Negative { 1.0 } else { -1.0 };
            for j in 0..n {
                if self.charges[j].sign() <= si.sign() {
                    continue;
                }
                let hop = self.local_potentials[i] * dn
                    - self.local_potentials[j] * dn
                    - self.model.potential(i, j);
                if hop < -tol {
                    return false;
                }
            }
        }
        true
    }

    pub fn is_physically_valid(&self) -> bool {
        !self.stale && self.is_population_stable() && self.is_configuration_stable()
    }

    /// Number of digits of the charge index.
    fn index_digits(&self) -> usize {
        self.num_sites() - usize::from(self.dependent_cell.is_some())
    }

    pub fn max_charge_index(&self) -> Result<u64, EngineError> {
        let digits = self.index_digits();
        let exponent = u32::try_from(digits).map_err(|_| self.overflow())?;
        (self.base() as u64)
            .checked_pow(exponent)
            .map(|count| count - 1)
            .ok_or_else(|| self.overflow())
    }

    fn overflow(&self) -> EngineError {
        EngineError::IndexSpaceOverflow {
            num_sites: self.num_sites(),
            base: self.base(),
        }
    }

    pub fn charge_distribution_to_index(&self) -> Result<u64, EngineError> {
        self.max_charge_index()?;
        let base = self.base() as u64;
        Ok((0..self.num_sites())
            .filter(|&i| Some(i) != self.dependent_cell)
            .fold(0u64, |acc, i| acc * base + self.charges[i].digit() as u64))
    }

    /// Sets the configuration encoded by `index` and refreshes all caches.
    pub fn index_to_charge_distribution(&mut self, index: u64) -> Result<(), EngineError> {
        let max = self.max_charge_index()?;
        if index > max {
            return Err(EngineError::ChargeIndexOutOfRange { index, max });
        }
        let base = self.base() as u64;
        let mut rest = index;
        for i in (0..self.num_sites()).rev() {
            if Some(i) == self.dependent_cell {
                continue;
            }
            let digit = (rest % base) as u8;
            rest /= base;
            self.charges[i] = ChargeState::from_digit(digit).ok_or_else(|| {
                EngineError::Internal(format!("charge digit {} has no state", digit))
            })?;
        }
        self.stale = true;
        self.update_after_charge_change(DependentCellMode::Variable, EnergyCalculation::Update);
        Ok(())
    }

    /// Advances the charge index by one, applying only the digits that change.
    pub fn increase_charge_index_by_one(&mut self) -> Result<Vec<ChargeDelta>, EngineError> {
        let max = self.max_charge_index()?;
        let index = self.charge_distribution_to_index()?;
        if index >= max {
            return Err(EngineError::ChargeIndexOutOfRange {
                index: index.saturating_add(1),
                max,
            });
        }
        if self.stale {
            self.refresh(EnergyCalculation::Update);
        }
        let base = self.base();
        let mut deltas = Vec::new();
        for i in (0..self.num_sites()).rev() {
            if Some(i) == self.dependent_cell {
                continue;
            }
            let digit = self.charges[i].digit();
            if digit + 1 < base {
                let next = ChargeState::from_digit(digit + 1).ok_or_else(|| {
                    EngineError::Internal(format!("charge digit {} has no state", digit + 1))
                })?;
                deltas.push(self.flip(i, next));
                break;
            }
            deltas.push(self.flip(i, ChargeState::Negative));
        }
        deltas.extend(self.update_dependent_cell());
        Ok(deltas)
    }

    /// Sites that are negative in every physically valid configuration.
    ///
    /// Evaluated on the current local potentials, which must stem from the
    /// all-negative configuration for the bound to hold.
    pub fn required_negative_sites(&self) -> Vec<usize> {
        let params = self.params();
        let tol = params.stability_tolerance;
        (0..self.num_sites())
            .filter(|&i| -self.local_potentials[i] + params.mu_minus < -tol)
            .collect()
    }

    /// Sites that could be positive in some physically valid configuration.
    ///
    /// Evaluated on the current local potentials, which must stem from the
    /// all-negative configuration for the bound to hold.
    pub fn positive_candidates(&self) -> Vec<usize> {
        let params = self.params();
        let tol = params.stability_tolerance;
        let mu_plus = params.mu_plus();
        (0..self.num_sites())
            .filter(|&i| -self.local_potentials[i] + mu_plus > -tol)
            .collect()
    }

    /// Turns one neutral site negative, preferring sites far away from the
    /// existing negative charges. Returns `false` when no neutral site is left.
    pub fn adjacent_search<R: Rng + ?Sized>(&mut self, alpha: f64, rng: &mut R) -> bool {
        if self.stale {
            self.refresh(EnergyCalculation::Update);
        }
        let negatives: Vec<usize> = (0..self.num_sites())
            .filter(|&i| self.charges[i] == ChargeState::Negative)
            .collect();
        let neutral_distances: Vec<(usize, f64)> = (0..self.num_sites())
            .filter(|&i| self.charges[i] == ChargeState::Neutral)
            .map(|i| {
                let nearest = negatives
                    .iter()
                    .map(|&j| self.model.distance(i, j))
                    .fold(f64::INFINITY, f64::min);
                (i, nearest)
            })
            .collect();
        if neutral_distances.is_empty() {
            return false;
        }

        let max_distance = neutral_distances
            .iter()
            .map(|&(_, d)| d)
            .fold(f64::NEG_INFINITY, f64::max);
        let candidates: Vec<usize> = if max_distance.is_finite() {
            neutral_distances
                .iter()
                .filter(|&&(_, d)| d >= alpha * max_distance)
                .map(|&(i, _)| i)
                .collect()
        } else {
            neutral_distances.iter().map(|&(i, _)| i).collect()
        };

        match candidates.choose(rng) {
            Some(&site) => {
                self.flip(site, ChargeState::Negative);
                true
            }
            None => false,
        }
    }

    /// Replaces the local external potential at `site` and refreshes caches.
    pub fn assign_local_external_potential(
        &mut self,
        site: usize,
        potential: f64,
    ) -> Result<(), EngineError> {
        self.check_site(site)?;
        Arc::make_mut(&mut self.model).set_local_external_potential(site, potential);
        self.update_after_charge_change(DependentCellMode::Fixed, EnergyCalculation::Update);
        Ok(())
    }

    pub fn assign_global_external_potential(&mut self, potential: f64) {
        Arc::make_mut(&mut self.model).set_global_potential(potential);
        self.update_after_charge_change(DependentCellMode::Fixed, EnergyCalculation::Update);
    }

    /// Switches to a different number of charge states. Sites whose charge is
    /// not representable become neutral.
    pub fn set_base(&mut self, base: u8) -> Result<(), EngineError> {
        let params = SimulationParameters {
            base,
            ..*self.params()
        };
        params.validate()?;
        Arc::make_mut(&mut self.model).set_base(base);
        for c in self.charges.iter_mut() {
            if !c.is_supported_by(base) {
                *c = ChargeState::Neutral;
                self.stale = true;
            }
        }
        if self.stale {
            self.refresh(EnergyCalculation::Update);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lattice::Lattice;
    use crate::core::models::coord::SiteCoord;
    use crate::core::physics::potentials::screened_coulomb;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn surface(coords: &[(i64, i64, u8)], params: SimulationParameters) -> ChargeDistributionSurface {
        let layout = SidbLayout::from_coords(Lattice::Si100, coords.iter().copied()).unwrap();
        ChargeDistributionSurface::from_layout(&layout, params).unwrap()
    }

    fn pair(mu_minus: f64) -> ChargeDistributionSurface {
        surface(
            &[(0, 0, 0), (2, 0, 0)],
            SimulationParameters {
                mu_minus,
                ..Default::default()
            },
        )
    }

    fn fresh_copy(s: &ChargeDistributionSurface) -> ChargeDistributionSurface {
        let mut copy = s.clone();
        copy.stale = true;
        copy.update_after_charge_change(DependentCellMode::Fixed, EnergyCalculation::Update);
        copy
    }

    #[test]
    fn new_surface_is_all_negative_with_matching_energy() {
        let s = pair(-0.32);
        let v = screened_coulomb(0.768, 5.6, 5.0);
        assert_eq!(s.charges(), &[ChargeState::Negative; 2]);
        assert!(f64_approx_equal(s.local_potential(0).unwrap(), -v));
        assert!(f64_approx_equal(s.system_energy(), v));
    }

    #[test]
    fn both_negative_is_the_only_valid_pair_state_at_default_mu() {
        let mut s = pair(-0.32);
        assert!(s.is_physically_valid());
        s.assign_charge_state(0, ChargeState::Neutral, UpdateMode::Immediate)
            .unwrap();
        assert!(!s.is_physically_valid());
    }

    #[test]
    fn one_neutral_one_negative_is_valid_at_shallower_mu() {
        let mut s = pair(-0.2);
        assert!(!s.is_physically_valid());
        let violations = s.population_stability_violations();
        assert_eq!(violations.len(), 2);
        s.assign_charge_state(0, ChargeState::Neutral, UpdateMode::Immediate)
            .unwrap();
        assert!(s.is_physically_valid());
        assert!(f64_approx_equal(s.system_energy(), 0.0));
    }

    #[test]
    fn immediate_updates_match_full_recomputation() {
        let mut s = surface(
            &[(0, 0, 0), (3, 0, 0), (5, 1, 1), (9, 2, 0)],
            SimulationParameters::default(),
        );
        let sequence = [
            (1, ChargeState::Neutral),
            (3, ChargeState::Positive),
            (0, ChargeState::Neutral),
            (1, ChargeState::Negative),
            (2, ChargeState::Positive),
        ];
        for (site, state) in sequence {
            s.assign_charge_state(site, state, UpdateMode::Immediate)
                .unwrap();
            let reference = fresh_copy(&s);
            assert!(f64_approx_equal(s.system_energy(), reference.system_energy()));
            for i in 0..s.num_sites() {
                assert!(f64_approx_equal(
                    s.local_potentials()[i],
                    reference.local_potentials()[i]
                ));
            }
        }
    }

    #[test]
    fn deferred_assignment_marks_surface_stale_until_update() {
        let mut s = pair(-0.32);
        s.assign_all_charge_states(ChargeState::Neutral).unwrap();
        assert!(!s.is_physically_valid());
        s.update_after_charge_change(DependentCellMode::Fixed, EnergyCalculation::Update);
        assert_eq!(s.system_energy(), 0.0);
        assert_eq!(s.local_potential(1), Some(0.0));
    }

    #[test]
    fn keep_old_value_leaves_energy_untouched() {
        let mut s = pair(-0.32);
        let before = s.system_energy();
        s.assign_all_charge_states(ChargeState::Neutral).unwrap();
        s.update_after_charge_change(DependentCellMode::Fixed, EnergyCalculation::KeepOldValue);
        assert_eq!(s.system_energy(), before);
    }

    #[test]
    fn positive_state_is_rejected_under_base_two() {
        let mut s = surface(
            &[(0, 0, 0)],
            SimulationParameters {
                base: 2,
                ..Default::default()
            },
        );
        let result = s.assign_charge_state(0, ChargeState::Positive, UpdateMode::Immediate);
        assert!(matches!(
            result,
            Err(EngineError::UnsupportedChargeState { base: 2, .. })
        ));
        assert!(s.apply_delta(0, ChargeState::Positive).is_err());
    }

    #[test]
    fn out_of_range_site_is_rejected() {
        let mut s = pair(-0.32);
        assert!(matches!(
            s.assign_charge_state(2, ChargeState::Neutral, UpdateMode::Deferred),
            Err(EngineError::SiteOutOfRange { index: 2, .. })
        ));
        assert!(s.assign_dependent_cell(5).is_err());
    }

    #[test]
    fn index_round_trips_through_every_configuration() {
        let mut s = surface(&[(0, 0, 0), (4, 0, 0), (8, 1, 0)], SimulationParameters::default());
        let max = s.max_charge_index().unwrap();
        assert_eq!(max, 26);
        for index in 0..=max {
            s.index_to_charge_distribution(index).unwrap();
            assert_eq!(s.charge_distribution_to_index().unwrap(), index);
        }
        assert!(matches!(
            s.index_to_charge_distribution(27),
            Err(EngineError::ChargeIndexOutOfRange { index: 27, max: 26 })
        ));
    }

    #[test]
    fn site_zero_is_the_most_significant_digit() {
        let mut s = surface(&[(0, 0, 0), (4, 0, 0)], SimulationParameters::default());
        s.index_to_charge_distribution(3).unwrap();
        assert_eq!(s.charges(), &[ChargeState::Neutral, ChargeState::Negative]);
        s.index_to_charge_distribution(2).unwrap();
        assert_eq!(s.charges(), &[ChargeState::Negative, ChargeState::Positive]);
    }

    #[test]
    fn increase_by_one_reports_carried_digits() {
        let mut s = surface(&[(0, 0, 0), (4, 0, 0)], SimulationParameters::default());
        s.index_to_charge_distribution(2).unwrap();
        let deltas = s.increase_charge_index_by_one().unwrap();
        assert_eq!(s.charge_distribution_to_index().unwrap(), 3);
        assert_eq!(
            deltas,
            vec![
                ChargeDelta {
                    site: 1,
                    old: ChargeState::Positive,
                    new: ChargeState::Negative
                },
                ChargeDelta {
                    site: 0,
                    old: ChargeState::Negative,
                    new: ChargeState::Neutral
                },
            ]
        );
        let reference = fresh_copy(&s);
        assert!(f64_approx_equal(s.system_energy(), reference.system_energy()));
    }

    fn assert_walk_matches_rebuilt_surfaces(mut s: ChargeDistributionSurface) {
        let max = s.max_charge_index().unwrap();
        s.index_to_charge_distribution(0).unwrap();
        for index in 0..=max {
            let mut rebuilt = s.clone();
            rebuilt.index_to_charge_distribution(index).unwrap();
            assert_eq!(s.charges(), rebuilt.charges(), "charges at index {}", index);
            assert!(
                f64_approx_equal(s.system_energy(), rebuilt.system_energy()),
                "energy at index {}",
                index
            );
            for (site, (a, b)) in s
                .local_potentials()
                .iter()
                .zip(rebuilt.local_potentials())
                .enumerate()
            {
                assert!(f64_approx_equal(*a, *b), "site {} at index {}", site, index);
            }
            if index < max {
                s.increase_charge_index_by_one().unwrap();
                assert_eq!(s.charge_distribution_to_index().unwrap(), index + 1);
            }
        }
    }

    const WALK_SITES: [(i64, i64, u8); 5] =
        [(0, 0, 0), (3, 0, 0), (6, 1, 0), (9, 0, 1), (12, 2, 0)];

    #[test]
    fn incremental_walk_matches_rebuilt_state_at_every_index() {
        let s = surface(&WALK_SITES, SimulationParameters::default());
        assert_eq!(s.max_charge_index().unwrap(), 242);
        assert_walk_matches_rebuilt_surfaces(s);
    }

    #[test]
    fn incremental_walk_with_dependent_cell_matches_rebuilt_state() {
        let mut s = surface(&WALK_SITES, SimulationParameters::default());
        s.assign_dependent_cell(2).unwrap();
        assert_eq!(s.max_charge_index().unwrap(), 80);
        assert_walk_matches_rebuilt_surfaces(s);
    }

    #[test]
    fn increase_past_maximum_is_an_error() {
        let mut s = surface(&[(0, 0, 0)], SimulationParameters::default());
        s.index_to_charge_distribution(2).unwrap();
        assert!(matches!(
            s.increase_charge_index_by_one(),
            Err(EngineError::ChargeIndexOutOfRange { index: 3, max: 2 })
        ));
    }

    #[test]
    fn dependent_cell_is_excluded_from_index_and_derived() {
        let mut s = pair(-0.2);
        s.assign_dependent_cell(0).unwrap();
        assert_eq!(s.max_charge_index().unwrap(), 2);
        s.index_to_charge_distribution(0).unwrap();
        // Site 1 negative pushes the dependent cell's potential to -V, which is
        // not deep enough for a second electron at mu = -0.2 eV.
        assert_eq!(s.charges(), &[ChargeState::Neutral, ChargeState::Negative]);
        assert!(s.is_physically_valid());
        assert!(matches!(
            s.assign_charge_state(0, ChargeState::Negative, UpdateMode::Immediate),
            Err(EngineError::DependentCellAssignment(0))
        ));
        assert!(
            s.assign_charge_state(0, ChargeState::Negative, UpdateMode::Deferred)
                .is_ok()
        );
    }

    #[test]
    fn large_layouts_report_index_overflow_but_stay_usable() {
        let coords: Vec<(i64, i64, u8)> = (0..45).map(|i| (i * 3, 0, 0)).collect();
        let mut s = surface(&coords, SimulationParameters::default());
        assert!(matches!(
            s.max_charge_index(),
            Err(EngineError::IndexSpaceOverflow { num_sites: 45, base: 3 })
        ));
        assert!(s.charge_distribution_to_index().is_err());
        s.assign_charge_state(3, ChargeState::Neutral, UpdateMode::Immediate)
            .unwrap();
        assert_eq!(s.num_charged(ChargeState::Neutral), 1);
    }

    #[test]
    fn adjacent_search_places_negative_charge_far_from_existing_ones() {
        let mut s = surface(
            &[(0, 0, 0), (3, 0, 0), (20, 0, 0)],
            SimulationParameters::default(),
        );
        s.assign_all_charge_states(ChargeState::Neutral).unwrap();
        s.assign_charge_state(0, ChargeState::Negative, UpdateMode::Deferred)
            .unwrap();
        s.update_after_charge_change(DependentCellMode::Fixed, EnergyCalculation::Update);
        let mut rng = StdRng::seed_from_u64(3);
        assert!(s.adjacent_search(0.9, &mut rng));
        assert_eq!(s.charge_state(2), Some(ChargeState::Negative));
        assert_eq!(s.charge_state(1), Some(ChargeState::Neutral));
        assert!(s.adjacent_search(0.9, &mut rng));
        assert!(!s.adjacent_search(0.9, &mut rng));
    }

    #[test]
    fn positive_candidates_and_required_negatives_follow_local_potential() {
        let close = surface(&[(0, 0, 0), (1, 0, 0), (2, 0, 0)], SimulationParameters::default());
        assert!(close.positive_candidates().contains(&1));
        let isolated = surface(&[(0, 0, 0), (40, 0, 0)], SimulationParameters::default());
        assert!(isolated.positive_candidates().is_empty());
        assert_eq!(isolated.required_negative_sites(), vec![0, 1]);
    }

    #[test]
    fn external_potentials_shift_local_potentials() {
        let mut s = surface(&[(0, 0, 0)], SimulationParameters::default());
        s.assign_local_external_potential(0, 0.1).unwrap();
        assert!(f64_approx_equal(s.local_potential(0).unwrap(), 0.1));
        assert!(f64_approx_equal(s.system_energy(), -0.1));
        s.assign_global_external_potential(-0.05);
        assert!(f64_approx_equal(s.local_potential(0).unwrap(), 0.05));
        assert_eq!(s.model().coord(0), SiteCoord::new(0, 0, 0));
    }

    #[test]
    fn set_base_neutralises_positive_sites() {
        let mut s = surface(&[(0, 0, 0)], SimulationParameters::default());
        s.assign_charge_state(0, ChargeState::Positive, UpdateMode::Immediate)
            .unwrap();
        s.set_base(2).unwrap();
        assert_eq!(s.charge_state(0), Some(ChargeState::Neutral));
        assert_eq!(s.base(), 2);
        assert!(s.set_base(5).is_err());
    }
}
