//! # sidbsim
//!
//! Charge-distribution simulation for silicon dangling bond (SiDB) logic:
//! physically valid charge configurations, ground states, operational checks
//! of gates and their operational domains over physical parameters.
//!
//! ## Architecture
//!
//! The library is split into three layers.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`SidbLayout`, `GateDesign`,
//!   `OperationalDomain`), lattice orientations, the screened Coulomb potential,
//!   simulation parameters and file I/O.
//!
//! - **[`engine`]: The Logic Core.** The stateful `ChargeDistributionSurface` with its
//!   incrementally maintained local potentials and energy, the charge index and Gray-code
//!   traversal, and the ground-state searches (exhaustive, QuickSim, QuickExact).
//!
//! - **[`workflows`]: The Public API.** Complete analyses built on the engine: simulation,
//!   operational checks, operational-domain exploration and critical temperature.

pub mod core;
pub mod engine;
pub mod workflows;
