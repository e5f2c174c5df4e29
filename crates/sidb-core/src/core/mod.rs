//! # Core Module
//!
//! Stateless building blocks of the simulator: the data model of dangling-bond
//! layouts and gate designs, the electrostatic model, lattice orientation
//! strategies and file I/O.
//!
//! - **Data Model** ([`models`]) - Sites, charge states, layouts, gate designs and operational domains
//! - **Physics** ([`physics`]) - Physical constants, simulation parameters and the screened Coulomb potential
//! - **Lattice Orientation** ([`lattice`]) - Strategies mapping lattice coordinates to nanometer positions
//! - **File I/O** ([`io`]) - TOML layout descriptions and CSV export of operational domains
//!
//! Nothing in this module keeps mutable simulation state; that lives in
//! [`crate::engine`].

pub mod io;
pub mod lattice;
pub mod models;
pub mod physics;
pub mod utils;
