//! Small numeric helpers shared across the crate

use crate::imports::*;

/// Default relative tolerance for [almost_eq] and friends
pub const DEFAULT_TOL: f64 = 1e-8;

/// Returns true if `val1` and `val2` are within relative tolerance `tol`
/// (defaults to [DEFAULT_TOL]) of each other. Values near zero are compared
/// with the same tolerance as an absolute bound.
pub fn almost_eq(val1: f64, val2: f64, tol: Option<f64>) -> bool {
    let tol = tol.unwrap_or(DEFAULT_TOL);
    ((val2 - val1) / (val1 + val2)).abs() < tol || (val1.abs() < tol && val2.abs() < tol)
}

/// Returns true if `val1` is less than or almost equal to `val2`
pub fn almost_le(val1: f64, val2: f64, tol: Option<f64>) -> bool {
    val1 < val2 || almost_eq(val1, val2, tol)
}

/// [almost_eq] for uom quantities of the same kind
pub fn almost_eq_uom<D, U>(
    val1: &uom::si::Quantity<D, U, f64>,
    val2: &uom::si::Quantity<D, U, f64>,
    tol: Option<f64>,
) -> bool
where
    D: uom::si::Dimension + ?Sized,
    U: uom::si::Units<f64> + ?Sized,
{
    almost_eq(val1.value, val2.value, tol)
}

/// Linear blend between `a` and `b` with `frac` clamped to [0, 1]
pub fn lerp(a: f64, b: f64, frac: f64) -> f64 {
    let frac = frac.clamp(0.0, 1.0);
    a + (b - a) * frac
}

/// Sign function returning 0 for 0, unlike [f64::signum]
pub fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_almost_eq() {
        assert!(almost_eq(1.0, 1.0 + 1e-10, None));
        assert!(!almost_eq(1.0, 1.1, None));
        assert!(almost_eq(0.0, 1e-12, None));
        assert!(almost_le(0.5, 1.0, None));
        assert!(!almost_le(1.5, 1.0, None));
    }

    #[test]
    fn test_almost_eq_uom() {
        assert!(almost_eq_uom(&(1.0 * uc::PSI), &(6894.757293168361 * uc::PA), None));
    }

    #[test]
    fn test_sign() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-3.0), -1.0);
        assert_eq!(sign(2.0), 1.0);
    }
}
