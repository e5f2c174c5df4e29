use super::error::EngineError;
use crate::core::models::coord::SiteCoord;
use crate::core::models::layout::SidbLayout;
use crate::core::physics::params::SimulationParameters;
use crate::core::physics::potentials::screened_coulomb;
use nalgebra::{DMatrix, Point2};
use tracing::trace;

/// Precomputed electrostatics of one layout under one parameter set.
///
/// Holds the pairwise distance and potential matrices and the fixed potential
/// of every site (local external + global + defects). Surfaces share a model
/// through an `Arc`; a surface that changes external potentials gets its own
/// copy.
#[derive(Debug, Clone)]
pub struct PotentialModel {
    params: SimulationParameters,
    coords: Vec<SiteCoord>,
    positions: Vec<Point2<f64>>,
    distances: DMatrix<f64>,
    potentials: DMatrix<f64>,
    external: Vec<f64>,
    global_potential: f64,
    defect_potentials: Vec<f64>,
}

impl PotentialModel {
    pub fn new(layout: &SidbLayout, params: SimulationParameters) -> Result<Self, EngineError> {
        params.validate()?;
        let orientation = layout.orientation();
        let n = layout.num_sites();

        let coords: Vec<SiteCoord> = layout.sites().iter().map(|s| s.coord).collect();
        let positions: Vec<Point2<f64>> =
            coords.iter().map(|&c| orientation.nm_position(c)).collect();

        let distances =
            DMatrix::from_fn(n, n, |i, j| nalgebra::distance(&positions[i], &positions[j]));
        let potentials = DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                0.0
            } else {
                screened_coulomb(distances[(i, j)], params.epsilon_r, params.lambda_tf)
            }
        });

        let external = coords
            .iter()
            .map(|&c| layout.external_potential(c))
            .collect();

        let defect_potentials = positions
            .iter()
            .map(|pos| {
                layout
                    .defects()
                    .iter()
                    .filter(|d| d.is_charged())
                    .map(|d| {
                        let dist = nalgebra::distance(pos, &orientation.nm_position(d.coord));
                        d.charge as f64 * screened_coulomb(dist, d.epsilon_r, d.lambda_tf)
                    })
                    .sum()
            })
            .collect();

        trace!(
            sites = n,
            defects = layout.defects().len(),
            "Potential model precomputed."
        );

        Ok(Self {
            params,
            coords,
            positions,
            distances,
            potentials,
            external,
            global_potential: layout.global_potential(),
            defect_potentials,
        })
    }

    #[inline]
    pub fn num_sites(&self) -> usize {
        self.coords.len()
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    pub fn coord(&self, site: usize) -> SiteCoord {
        self.coords[site]
    }

    pub fn coords(&self) -> &[SiteCoord] {
        &self.coords
    }

    pub fn nm_position(&self, site: usize) -> Point2<f64> {
        self.positions[site]
    }

    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distances[(i, j)]
    }

    /// Screened Coulomb potential between two sites in V; zero on the diagonal.
    #[inline]
    pub fn potential(&self, i: usize, j: usize) -> f64 {
        self.potentials[(i, j)]
    }

    /// Potential at `site` that does not depend on any site's charge.
    #[inline]
    pub fn fixed_potential(&self, site: usize) -> f64 {
        self.external[site] + self.global_potential + self.defect_potentials[site]
    }

    pub fn local_external_potential(&self, site: usize) -> f64 {
        self.external[site]
    }

    pub fn global_potential(&self) -> f64 {
        self.global_potential
    }

    pub(crate) fn set_local_external_potential(&mut self, site: usize, potential: f64) {
        self.external[site] = potential;
    }

    pub(crate) fn set_global_potential(&mut self, potential: f64) {
        self.global_potential = potential;
    }

    pub(crate) fn set_base(&mut self, base: u8) {
        self.params.base = base;
    }
}
