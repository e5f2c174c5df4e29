use super::constants::{ELEMENTARY_CHARGE, EPSILON_0};
use std::f64::consts::PI;

/// Screened Coulomb potential (in V) at `distance_nm` from a unit point charge.
///
/// Returns `0.0` for a zero distance, which is how a site's self-interaction
/// is excluded.
#[inline]
pub fn screened_coulomb(distance_nm: f64, epsilon_r: f64, lambda_tf: f64) -> f64 {
    if distance_nm <= 0.0 {
        return 0.0;
    }
    let prefactor = ELEMENTARY_CHARGE / (4.0 * PI * EPSILON_0 * epsilon_r);
    prefactor * (-distance_nm / lambda_tf).exp() / (distance_nm * 1e-9)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-6;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn screened_coulomb_matches_reference_value() {
        // e / (4 pi eps0 * 5.6) * exp(-0.768 / 5) / 0.768e-9
        let v = screened_coulomb(0.768, 5.6, 5.0);
        assert!(f64_approx_equal(v, 0.287141), "got {}", v);
    }

    #[test]
    fn screened_coulomb_is_zero_at_zero_distance() {
        assert_eq!(screened_coulomb(0.0, 5.6, 5.0), 0.0);
    }

    #[test]
    fn screened_coulomb_decreases_with_distance_and_permittivity() {
        let near = screened_coulomb(1.0, 5.6, 5.0);
        let far = screened_coulomb(2.0, 5.6, 5.0);
        let screened = screened_coulomb(1.0, 8.0, 5.0);
        assert!(near > far);
        assert!(near > screened);
    }

    #[test]
    fn shorter_screening_length_weakens_potential() {
        assert!(screened_coulomb(3.0, 5.6, 1.0) < screened_coulomb(3.0, 5.6, 5.0));
    }
}
