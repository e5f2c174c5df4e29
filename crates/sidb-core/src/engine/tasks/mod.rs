//! Ground-state search algorithms.
//!
//! Each task takes a layout and a parameter set and returns a
//! [`SimulationResult`](crate::engine::result::SimulationResult) holding the
//! physically valid configurations it found:
//!
//! - [`exhaustive`] - Every configuration of the charge index space
//! - [`quicksim`] - Randomized local search; fast, not guaranteed to be complete
//! - [`quickexact`] - Exact search that pins and prunes sites using bounds on the local potential

pub mod exhaustive;
pub mod quickexact;
pub mod quicksim;
