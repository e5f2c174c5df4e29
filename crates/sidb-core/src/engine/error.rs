use thiserror::Error;

use super::config::ConfigError;
use crate::core::models::charge::ChargeState;
use crate::core::models::layout::LayoutError;
use crate::core::physics::params::ParameterError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid simulation parameters: {source}")]
    Parameters {
        #[from]
        source: ParameterError,
    },

    #[error("Invalid layout: {source}")]
    Layout {
        #[from]
        source: LayoutError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Charge state {state:?} is not available with {base} charge states")]
    UnsupportedChargeState { state: ChargeState, base: u8 },

    #[error("Charge index {index} exceeds the maximum index {max}")]
    ChargeIndexOutOfRange { index: u64, max: u64 },

    #[error("Site index {index} is out of range for a layout with {num_sites} sites")]
    SiteOutOfRange { index: usize, num_sites: usize },

    #[error("Site {0} is the dependent cell and can only be assigned in deferred mode")]
    DependentCellAssignment(usize),

    #[error(
        "The charge index space of {num_sites} sites with {base} charge states does not fit into 64 bits"
    )]
    IndexSpaceOverflow { num_sites: usize, base: u8 },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
