use super::constants::{
    DEFAULT_BASE, DEFAULT_CHARGE_TRANSITION_GAP, DEFAULT_EPSILON_R, DEFAULT_LAMBDA_TF,
    DEFAULT_MU_MINUS, DEFAULT_STABILITY_TOLERANCE,
};
use crate::core::models::domain::SweepParameter;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("Relative permittivity must be positive, got {0}")]
    NonPositivePermittivity(f64),
    #[error("Screening length must be positive, got {0} nm")]
    NonPositiveScreeningLength(f64),
    #[error("Number of charge states must be 2 or 3, got {0}")]
    UnsupportedBase(u8),
    #[error("Charge transition gap must not be negative, got {0} eV")]
    NegativeTransitionGap(f64),
    #[error("Stability tolerance must not be negative, got {0}")]
    NegativeTolerance(f64),
    #[error("Parameter '{0}' must be finite")]
    NonFinite(&'static str),
}

/// Physical parameters shared by every simulation engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParameters {
    pub epsilon_r: f64,
    /// Thomas-Fermi screening length in nm.
    pub lambda_tf: f64,
    /// (0/-) charge transition level in eV.
    pub mu_minus: f64,
    /// Number of charge states a site may take: 2 (negative, neutral) or 3.
    pub base: u8,
    /// Distance between the (0/-) and (+/0) transition levels in eV.
    pub charge_transition_gap: f64,
    pub stability_tolerance: f64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            epsilon_r: DEFAULT_EPSILON_R,
            lambda_tf: DEFAULT_LAMBDA_TF,
            mu_minus: DEFAULT_MU_MINUS,
            base: DEFAULT_BASE,
            charge_transition_gap: DEFAULT_CHARGE_TRANSITION_GAP,
            stability_tolerance: DEFAULT_STABILITY_TOLERANCE,
        }
    }
}

impl SimulationParameters {
    pub fn new(
        epsilon_r: f64,
        lambda_tf: f64,
        mu_minus: f64,
        base: u8,
    ) -> Result<Self, ParameterError> {
        let params = Self {
            epsilon_r,
            lambda_tf,
            mu_minus,
            base,
            ..Default::default()
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        let finite = [
            ("epsilon_r", self.epsilon_r),
            ("lambda_tf", self.lambda_tf),
            ("mu_minus", self.mu_minus),
            ("charge_transition_gap", self.charge_transition_gap),
            ("stability_tolerance", self.stability_tolerance),
        ];
        if let Some((name, _)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ParameterError::NonFinite(*name));
        }
        if self.epsilon_r <= 0.0 {
            return Err(ParameterError::NonPositivePermittivity(self.epsilon_r));
        }
        if self.lambda_tf <= 0.0 {
            return Err(ParameterError::NonPositiveScreeningLength(self.lambda_tf));
        }
        if !(2..=3).contains(&self.base) {
            return Err(ParameterError::UnsupportedBase(self.base));
        }
        if self.charge_transition_gap < 0.0 {
            return Err(ParameterError::NegativeTransitionGap(
                self.charge_transition_gap,
            ));
        }
        if self.stability_tolerance < 0.0 {
            return Err(ParameterError::NegativeTolerance(self.stability_tolerance));
        }
        Ok(())
    }

    /// (+/0) charge transition level in eV.
    #[inline]
    pub fn mu_plus(&self) -> f64 {
        self.mu_minus - self.charge_transition_gap
    }

    pub fn with_base(mut self, base: u8) -> Self {
        self.base = base;
        self
    }

    /// Returns a copy with one swept parameter replaced.
    pub fn with_sweep_value(mut self, parameter: SweepParameter, value: f64) -> Self {
        match parameter {
            SweepParameter::EpsilonR => self.epsilon_r = value,
            SweepParameter::LambdaTf => self.lambda_tf = value,
            SweepParameter::MuMinus => self.mu_minus = value,
        }
        self
    }
}
