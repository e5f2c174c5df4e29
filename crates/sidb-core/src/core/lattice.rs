//! Lattice orientation strategies.
//!
//! The potential engine never inspects the crystal orientation directly. It asks an
//! injected [`LatticeOrientation`] for nanometer positions and distances, so one
//! implementation of the physics serves every supported surface.

use crate::core::models::coord::SiteCoord;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lattice vectors of a hydrogen-passivated silicon surface, in Ångström.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeConstants {
    /// Spacing between columns (x direction).
    pub a: f64,
    /// Spacing between dimer rows (y direction).
    pub b: f64,
    /// Offset of the second dimer atom (`z = 1`).
    pub c: (f64, f64),
}

pub trait LatticeOrientation: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn constants(&self) -> LatticeConstants;

    fn nm_position(&self, coord: SiteCoord) -> Point2<f64> {
        let LatticeConstants { a, b, c } = self.constants();
        let z = coord.z as f64;
        Point2::new(
            (coord.x as f64 * a + z * c.0) * 0.1,
            (coord.y as f64 * b + z * c.1) * 0.1,
        )
    }

    fn nm_distance(&self, lhs: SiteCoord, rhs: SiteCoord) -> f64 {
        nalgebra::distance(&self.nm_position(lhs), &self.nm_position(rhs))
    }
}

/// H-Si(100)-2x1 surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct Si100;

impl LatticeOrientation for Si100 {
    fn name(&self) -> &'static str {
        "Si(100)"
    }

    fn constants(&self) -> LatticeConstants {
        LatticeConstants {
            a: 3.84,
            b: 7.68,
            c: (0.0, 2.25),
        }
    }
}

/// H-Si(111)-1x1 surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct Si111;

impl LatticeOrientation for Si111 {
    fn name(&self) -> &'static str {
        "Si(111)"
    }

    fn constants(&self) -> LatticeConstants {
        LatticeConstants {
            a: 6.65,
            b: 3.84,
            c: (3.3255, 1.92),
        }
    }
}

/// Serializable selector for the built-in orientations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Lattice {
    #[default]
    #[serde(rename = "si-100")]
    Si100,
    #[serde(rename = "si-111")]
    Si111,
}

impl Lattice {
    pub fn orientation(self) -> &'static dyn LatticeOrientation {
        match self {
            Lattice::Si100 => &Si100,
            Lattice::Si111 => &Si111,
        }
    }
}
