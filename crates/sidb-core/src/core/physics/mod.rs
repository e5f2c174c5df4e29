//! Electrostatic model of charged dangling bonds on a screened surface.
//!
//! - [`constants`] - Physical constants and default model values
//! - [`params`] - The validated parameter set every simulation is run with
//! - [`potentials`] - Screened Coulomb interaction between two point charges

pub mod constants;
pub mod params;
pub mod potentials;
