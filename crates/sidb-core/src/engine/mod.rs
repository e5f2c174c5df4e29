//! # Engine Module
//!
//! Stateful machinery of the simulator: the charge distribution surface with its
//! incrementally maintained potentials, the ground-state search tasks and their
//! configuration.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Engine selection, search settings and exploration strategies
//! - **Potential Model** ([`model`]) - Precomputed distance and potential matrices shared between surfaces
//! - **Charge Distribution Surface** ([`surface`]) - Mutable charge configuration, stability checks and the charge index
//! - **Gray Code** ([`gray_code`]) - Single-step traversal of mixed-radix configuration spaces
//! - **Search Tasks** ([`tasks`]) - Exhaustive, QuickSim and QuickExact ground-state searches
//! - **Results** ([`result`]) - Valid configurations, energy distributions and search statistics
//! - **Progress Monitoring** ([`progress`]) - Progress events for front ends
//! - **Error Handling** ([`error`]) - Engine-level error type
//!
//! Search tasks split their search space into disjoint ranges. With the
//! `parallel` feature every range is processed on the rayon pool with its own
//! surface; results are merged once all ranges are done.

pub mod config;
pub mod error;
pub mod gray_code;
pub mod model;
pub mod progress;
pub mod result;
pub mod surface;
pub mod tasks;
pub(crate) mod utils;
