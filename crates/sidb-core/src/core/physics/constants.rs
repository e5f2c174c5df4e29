/// Vacuum permittivity in F/m.
pub const EPSILON_0: f64 = 8.854_187_817e-12;

/// Elementary charge in C.
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;

/// Boltzmann constant in eV/K.
pub const BOLTZMANN_EV: f64 = 8.617e-5;

pub const DEFAULT_EPSILON_R: f64 = 5.6;
/// Thomas-Fermi screening length in nm.
pub const DEFAULT_LAMBDA_TF: f64 = 5.0;
/// Charge transition level (0/-) in eV.
pub const DEFAULT_MU_MINUS: f64 = -0.32;
/// Energy separation between the (0/-) and (+/0) transition levels in eV.
pub const DEFAULT_CHARGE_TRANSITION_GAP: f64 = 0.59;
pub const DEFAULT_BASE: u8 = 3;
pub const DEFAULT_STABILITY_TOLERANCE: f64 = 1e-6;

/// Energies closer than this (in eV) are treated as degenerate.
pub const ENERGY_DEGENERACY_TOLERANCE: f64 = 1e-6;
