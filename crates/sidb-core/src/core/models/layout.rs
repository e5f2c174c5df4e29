use super::coord::SiteCoord;
use crate::core::lattice::{Lattice, LatticeOrientation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Duplicate site at {0}")]
    DuplicateSite(SiteCoord),

    #[error("Invalid dimer index {z} at ({x}, {y}): expected 0 or 1")]
    InvalidDimerIndex { x: i64, y: i64, z: u8 },

    #[error("Unknown lattice orientation '{0}'")]
    UnknownLattice(String),

    #[error("No site exists at {0}")]
    UnknownSite(SiteCoord),

    #[error("Invalid defect at {coord}: {reason}")]
    InvalidDefect { coord: SiteCoord, reason: String },

    #[error("Invalid truth table '{table}': {reason}")]
    InvalidTruthTable { table: String, reason: String },

    #[error("Invalid gate description: {0}")]
    InvalidGate(String),

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SiteRole {
    #[default]
    Normal,
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Site {
    pub coord: SiteCoord,
    pub role: SiteRole,
}

/// A fixed charge embedded in the surface.
///
/// Its potential is screened with its own permittivity and screening length,
/// which may differ from the values used between dangling bonds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Defect {
    pub coord: SiteCoord,
    /// Charge in units of the elementary charge.
    pub charge: i32,
    pub epsilon_r: f64,
    /// Thomas-Fermi screening length in nm.
    pub lambda_tf: f64,
}

impl Defect {
    pub fn new(coord: SiteCoord, charge: i32, epsilon_r: f64, lambda_tf: f64) -> Self {
        Self {
            coord,
            charge,
            epsilon_r,
            lambda_tf,
        }
    }

    #[inline]
    pub fn is_charged(&self) -> bool {
        self.charge != 0
    }
}

/// Read-only view of a dangling-bond layout: sites, lattice orientation and
/// every externally injected potential source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SidbLayout {
    lattice: Lattice,
    sites: Vec<Site>,
    index: HashMap<SiteCoord, usize>,
    defects: Vec<Defect>,
    external_potentials: HashMap<SiteCoord, f64>,
    global_potential: f64,
}

impl SidbLayout {
    pub fn new(lattice: Lattice) -> Self {
        Self {
            lattice,
            ..Default::default()
        }
    }

    /// Builds a layout of normal sites from plain coordinates.
    pub fn from_coords<I>(lattice: Lattice, coords: I) -> Result<Self, LayoutError>
    where
        I: IntoIterator<Item = (i64, i64, u8)>,
    {
        let mut layout = Self::new(lattice);
        for coord in coords {
            layout.add_site(coord.into(), SiteRole::Normal)?;
        }
        Ok(layout)
    }

    pub fn add_site(&mut self, coord: SiteCoord, role: SiteRole) -> Result<usize, LayoutError> {
        check_dimer_index(coord)?;
        if self.index.contains_key(&coord) {
            return Err(LayoutError::DuplicateSite(coord));
        }
        if self.defects.iter().any(|d| d.coord == coord) {
            return Err(LayoutError::InvalidDefect {
                coord,
                reason: "a defect already occupies this position".to_string(),
            });
        }
        let idx = self.sites.len();
        self.sites.push(Site { coord, role });
        self.index.insert(coord, idx);
        Ok(idx)
    }

    pub fn add_defect(&mut self, defect: Defect) -> Result<(), LayoutError> {
        check_dimer_index(defect.coord)?;
        if self.index.contains_key(&defect.coord) || self.defects.iter().any(|d| d.coord == defect.coord)
        {
            return Err(LayoutError::InvalidDefect {
                coord: defect.coord,
                reason: "position is already occupied".to_string(),
            });
        }
        if defect.is_charged() && !(defect.epsilon_r > 0.0 && defect.lambda_tf > 0.0) {
            return Err(LayoutError::InvalidDefect {
                coord: defect.coord,
                reason: "charged defects need positive epsilon_r and lambda_tf".to_string(),
            });
        }
        self.defects.push(defect);
        Ok(())
    }

    /// Injects a fixed local potential (in V) at an existing site.
    pub fn set_external_potential(
        &mut self,
        coord: SiteCoord,
        potential: f64,
    ) -> Result<(), LayoutError> {
        if !self.index.contains_key(&coord) {
            return Err(LayoutError::UnknownSite(coord));
        }
        self.external_potentials.insert(coord, potential);
        Ok(())
    }

    pub fn set_global_potential(&mut self, potential: f64) {
        self.global_potential = potential;
    }

    /// Returns a copy of the layout with the given sites appended.
    pub fn with_additional_sites(
        &self,
        extra: impl IntoIterator<Item = (SiteCoord, SiteRole)>,
    ) -> Result<Self, LayoutError> {
        let mut layout = self.clone();
        for (coord, role) in extra {
            layout.add_site(coord, role)?;
        }
        Ok(layout)
    }

    pub fn lattice(&self) -> Lattice {
        self.lattice
    }

    pub fn orientation(&self) -> &'static dyn LatticeOrientation {
        self.lattice.orientation()
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn num_sites(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn coord(&self, index: usize) -> Option<SiteCoord> {
        self.sites.get(index).map(|s| s.coord)
    }

    pub fn index_of(&self, coord: SiteCoord) -> Option<usize> {
        self.index.get(&coord).copied()
    }

    pub fn sites_with_role(&self, role: SiteRole) -> impl Iterator<Item = (usize, &Site)> {
        self.sites
            .iter()
            .enumerate()
            .filter(move |(_, s)| s.role == role)
    }

    pub fn defects(&self) -> &[Defect] {
        &self.defects
    }

    pub fn external_potential(&self, coord: SiteCoord) -> f64 {
        self.external_potentials.get(&coord).copied().unwrap_or(0.0)
    }

    pub fn global_potential(&self) -> f64 {
        self.global_potential
    }
}

fn check_dimer_index(coord: SiteCoord) -> Result<(), LayoutError> {
    if coord.z > 1 {
        return Err(LayoutError::InvalidDimerIndex {
            x: coord.x,
            y: coord.y,
            z: coord.z,
        });
    }
    Ok(())
}
