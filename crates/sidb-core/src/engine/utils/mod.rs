//! Helpers shared by the search tasks.

pub mod partition;
