//! # Workflows Module
//!
//! High-level entry points that tie the [`core`](crate::core) models and the
//! [`engine`](crate::engine) searches together into complete analyses.
//!
//! ## Architecture
//!
//! - **Simulation** ([`simulate`]) - Ground-state search of a layout with any engine
//! - **Operational Check** ([`operational`]) - Verifies a gate against its truth tables
//! - **Operational Domain** ([`operational_domain`]) - Explores a two-dimensional parameter
//!   grid with grid search, random sampling, flood fill or contour tracing
//! - **Critical Temperature** ([`temperature`]) - Highest temperature at which correct
//!   states still dominate the Boltzmann occupation
//!
//! Every workflow reports its phases through a
//! [`ProgressReporter`](crate::engine::progress::ProgressReporter) and returns
//! [`EngineError`](crate::engine::error::EngineError) on failure.

pub mod operational;
pub mod operational_domain;
pub mod simulate;
pub mod temperature;
