use sidbsim::engine::config::{
    DEFAULT_CONFIDENCE_LEVEL, DEFAULT_MAX_TEMPERATURE, DEFAULT_QUICKSIM_ALPHA,
    DEFAULT_QUICKSIM_ITERATION_STEPS,
};

/// Values used when neither the configuration file nor the command line sets them.
pub struct DefaultsConfig {
    pub engine: &'static str,
    pub iteration_steps: u64,
    pub alpha: f64,
    pub automatic_base_detection: bool,
    pub strategy: &'static str,
    pub samples: usize,
    pub confidence_level: f64,
    pub max_temperature: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            engine: "quickexact",
            iteration_steps: DEFAULT_QUICKSIM_ITERATION_STEPS,
            alpha: DEFAULT_QUICKSIM_ALPHA,
            automatic_base_detection: true,
            strategy: "grid",
            samples: 1000,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            max_temperature: DEFAULT_MAX_TEMPERATURE,
        }
    }
}
