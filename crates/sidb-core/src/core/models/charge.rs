use serde::{Deserialize, Serialize};
use std::fmt;

/// Charge state of a single dangling bond.
///
/// The variant order follows the charge-index digit assignment: a negatively
/// charged site contributes digit `0`, a neutral site `1` and a positive site `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChargeState {
    Negative,
    Neutral,
    Positive,
}

impl ChargeState {
    pub const ALL: [ChargeState; 3] = [
        ChargeState::Negative,
        ChargeState::Neutral,
        ChargeState::Positive,
    ];

    #[inline]
    pub fn sign(self) -> i8 {
        match self {
            ChargeState::Negative => -1,
            ChargeState::Neutral => 0,
            ChargeState::Positive => 1,
        }
    }

    #[inline]
    pub fn sign_f64(self) -> f64 {
        self.sign() as f64
    }

    #[inline]
    pub fn digit(self) -> u8 {
        (self.sign() + 1) as u8
    }

    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            0 => Some(ChargeState::Negative),
            1 => Some(ChargeState::Neutral),
            2 => Some(ChargeState::Positive),
            _ => None,
        }
    }

    pub fn from_sign(sign: i8) -> Option<Self> {
        match sign {
            -1 => Some(ChargeState::Negative),
            0 => Some(ChargeState::Neutral),
            1 => Some(ChargeState::Positive),
            _ => None,
        }
    }

    /// Whether this state belongs to the alphabet of the given base number.
    #[inline]
    pub fn is_supported_by(self, base: u8) -> bool {
        self.digit() < base
    }

    pub fn symbol(self) -> char {
        match self {
            ChargeState::Negative => '-',
            ChargeState::Neutral => '0',
            ChargeState::Positive => '+',
        }
    }
}

impl fmt::Display for ChargeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Renders a charge configuration as a compact string such as `-0-0`.
pub fn format_charges(charges: &[ChargeState]) -> String {
    charges.iter().map(|c| c.symbol()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_follow_sign_plus_one() {
        assert_eq!(ChargeState::Negative.digit(), 0);
        assert_eq!(ChargeState::Neutral.digit(), 1);
        assert_eq!(ChargeState::Positive.digit(), 2);
        for state in ChargeState::ALL {
            assert_eq!(ChargeState::from_digit(state.digit()), Some(state));
            assert_eq!(ChargeState::from_sign(state.sign()), Some(state));
        }
    }

    #[test]
    fn from_digit_rejects_values_outside_alphabet() {
        assert_eq!(ChargeState::from_digit(3), None);
        assert_eq!(ChargeState::from_sign(2), None);
    }

    #[test]
    fn positive_state_is_not_supported_by_base_two() {
        assert!(ChargeState::Negative.is_supported_by(2));
        assert!(ChargeState::Neutral.is_supported_by(2));
        assert!(!ChargeState::Positive.is_supported_by(2));
        assert!(ChargeState::Positive.is_supported_by(3));
    }

    #[test]
    fn format_charges_renders_symbols_in_order() {
        let charges = [
            ChargeState::Negative,
            ChargeState::Neutral,
            ChargeState::Positive,
        ];
        assert_eq!(format_charges(&charges), "-0+");
    }
}
