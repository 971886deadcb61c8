//! Normal (Gaussian) distribution.

use ql_core::Real;
use statrs::function::erf::erfc;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// The standard normal probability density function.
///
/// `φ(x) = exp(-x²/2) / √(2π)`
#[inline]
pub fn normal_pdf(x: Real) -> Real {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// The standard normal cumulative distribution function Φ(x).
///
/// Computed as `erfc(-x/√2) / 2`, which keeps full relative accuracy in the
/// lower tail (deep out-of-the-money option legs depend on it).
#[inline]
pub fn normal_cdf(x: Real) -> Real {
    0.5 * erfc(-x * FRAC_1_SQRT_2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn normal_pdf_at_zero() {
        let expected = 1.0 / (2.0 * PI).sqrt();
        assert_abs_diff_eq!(normal_pdf(0.0), expected, epsilon = 1e-15);
    }

    #[test]
    fn normal_cdf_at_zero() {
        assert_abs_diff_eq!(normal_cdf(0.0), 0.5, epsilon = 1e-15);
    }

    #[test]
    fn normal_cdf_reference_values() {
        assert_abs_diff_eq!(normal_cdf(1.0), 0.841_344_746_068_542_9, epsilon = 1e-14);
        assert_abs_diff_eq!(normal_cdf(-1.96), 0.024_997_895_148_220_4, epsilon = 1e-14);
    }

    #[test]
    fn normal_cdf_tails() {
        assert_abs_diff_eq!(normal_cdf(10.0), 1.0, epsilon = 1e-15);
        let lower = normal_cdf(-10.0);
        assert!(lower > 0.0 && lower < 1e-22, "got {lower}");
    }

    #[test]
    fn normal_cdf_symmetry() {
        for x in [0.1, 0.5, 1.3, 2.7, 4.0] {
            assert_abs_diff_eq!(normal_cdf(x) + normal_cdf(-x), 1.0, epsilon = 1e-15);
        }
    }
}
