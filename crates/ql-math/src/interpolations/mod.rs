//! 1D interpolation trait and implementations.
//!
//! Piecewise curves never depend on a concrete scheme: they hold an
//! [`Interpolator`] (a builder) and rebuild an [`Interpolation1D`] from their
//! nodes whenever a node changes.  Every scheme here reproduces the node
//! values *exactly* at the node abscissae, which is what lets a bootstrapped
//! curve reprice its calibrating instruments.

use ql_core::{errors::Result, Real};

/// A 1D interpolation function `f: R → R` defined by a set of known points.
pub trait Interpolation1D: std::fmt::Debug {
    /// Evaluate the interpolation at `x`.
    ///
    /// Outside the node range the scheme extrapolates (linearly for the
    /// linear schemes, flat for the step schemes); range checks are the
    /// caller's business.
    fn value(&self, x: Real) -> Real;
}

/// Trait for creating an interpolation from `(xs, ys)` slices.
///
/// This lets curves choose the interpolation method (linear, log-linear,
/// etc.) without knowing the concrete type.
pub trait Interpolator: std::fmt::Debug {
    /// Build an interpolation from the given x and y values.
    fn build(&self, xs: &[Real], ys: &[Real]) -> Result<Box<dyn Interpolation1D>>;

    /// Minimum number of points the scheme needs.
    fn required_points(&self) -> usize {
        2
    }

    /// `true` if the scheme only accepts strictly positive ordinates.
    fn requires_positive_values(&self) -> bool {
        false
    }
}

/// Validate abscissae / ordinates shared by all schemes.
fn check_points(xs: &[Real], ys: &[Real], required: usize) -> Result<()> {
    ql_core::ensure!(
        xs.len() >= required,
        "need at least {required} points for interpolation, got {}",
        xs.len()
    );
    ql_core::ensure!(
        xs.len() == ys.len(),
        "xs and ys must have the same length ({} != {})",
        xs.len(),
        ys.len()
    );
    ql_core::ensure!(
        xs.windows(2).all(|w| w[0] < w[1]),
        "interpolation abscissae must be strictly increasing"
    );
    Ok(())
}

/// Index of `x` if it is exactly one of the nodes.
fn node_index(xs: &[Real], x: Real) -> Option<usize> {
    xs.binary_search_by(|p| p.total_cmp(&x)).ok()
}

/// Index `i` of the interval `[xs[i], xs[i+1]]` containing `x`, clamped to
/// the first / last interval.
fn locate(xs: &[Real], x: Real) -> usize {
    let n = xs.len();
    if x <= xs[0] {
        return 0;
    }
    if x >= xs[n - 1] {
        return n - 2;
    }
    // first index with xs[i] > x, minus one
    xs.partition_point(|&p| p <= x) - 1
}

// ── Linear ────────────────────────────────────────────────────────────────────

/// Linear interpolation.
///
/// `f(x) = y[i] + (y[i+1] - y[i]) * (x - x[i]) / (x[i+1] - x[i])`
#[derive(Debug, Clone)]
pub struct LinearInterpolation {
    xs: Vec<Real>,
    ys: Vec<Real>,
}

impl LinearInterpolation {
    /// Construct a linear interpolation from sorted `xs` and corresponding `ys`.
    ///
    /// # Errors
    /// Returns an error if the slices have different lengths, fewer than 2
    /// points, or abscissae that are not strictly increasing.
    pub fn new(xs: &[Real], ys: &[Real]) -> Result<Self> {
        check_points(xs, ys, 2)?;
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
        })
    }
}

impl Interpolation1D for LinearInterpolation {
    fn value(&self, x: Real) -> Real {
        if let Some(i) = node_index(&self.xs, x) {
            return self.ys[i];
        }
        let i = locate(&self.xs, x);
        let dx = self.xs[i + 1] - self.xs[i];
        self.ys[i] + (x - self.xs[i]) * (self.ys[i + 1] - self.ys[i]) / dx
    }
}

// ── Log-linear ────────────────────────────────────────────────────────────────

/// Log-linear interpolation.
///
/// Interpolates `log(y)` linearly and exponentiates the result.  On a
/// discount-factor curve this is piecewise-flat instantaneous forwards.
#[derive(Debug, Clone)]
pub struct LogLinearInterpolation {
    inner: LinearInterpolation,
    ys: Vec<Real>,
}

impl LogLinearInterpolation {
    /// Construct a log-linear interpolation.
    ///
    /// All `ys` values must be strictly positive.
    pub fn new(xs: &[Real], ys: &[Real]) -> Result<Self> {
        ql_core::ensure!(
            ys.iter().all(|&y| y > 0.0),
            "all y values must be positive for log-linear interpolation"
        );
        let log_ys: Vec<Real> = ys.iter().map(|&y| y.ln()).collect();
        Ok(Self {
            inner: LinearInterpolation::new(xs, &log_ys)?,
            ys: ys.to_vec(),
        })
    }
}

impl Interpolation1D for LogLinearInterpolation {
    fn value(&self, x: Real) -> Real {
        match node_index(&self.inner.xs, x) {
            Some(i) => self.ys[i],
            None => self.inner.value(x).exp(),
        }
    }
}

// ── Flat (step functions) ────────────────────────────────────────────────────

/// Backward-flat interpolation: on `(x[i-1], x[i]]` the value is `y[i]`.
///
/// This is the natural step scheme for bootstrapping: a node only governs
/// the segment that ends at it.
#[derive(Debug, Clone)]
pub struct BackwardFlatInterpolation {
    xs: Vec<Real>,
    ys: Vec<Real>,
}

impl BackwardFlatInterpolation {
    /// Construct a backward-flat interpolation.
    pub fn new(xs: &[Real], ys: &[Real]) -> Result<Self> {
        check_points(xs, ys, 1)?;
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
        })
    }
}

impl Interpolation1D for BackwardFlatInterpolation {
    fn value(&self, x: Real) -> Real {
        // first node at or after x
        let i = self.xs.partition_point(|&p| p < x);
        self.ys[i.min(self.ys.len() - 1)]
    }
}

/// Forward-flat interpolation: on `[x[i], x[i+1])` the value is `y[i]`.
#[derive(Debug, Clone)]
pub struct ForwardFlatInterpolation {
    xs: Vec<Real>,
    ys: Vec<Real>,
}

impl ForwardFlatInterpolation {
    /// Construct a forward-flat interpolation.
    pub fn new(xs: &[Real], ys: &[Real]) -> Result<Self> {
        check_points(xs, ys, 1)?;
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
        })
    }
}

impl Interpolation1D for ForwardFlatInterpolation {
    fn value(&self, x: Real) -> Real {
        // last node at or before x
        let i = self.xs.partition_point(|&p| p <= x);
        self.ys[i.saturating_sub(1)]
    }
}

// ── Builders ──────────────────────────────────────────────────────────────────

/// Linear interpolation builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Linear;

impl Interpolator for Linear {
    fn build(&self, xs: &[Real], ys: &[Real]) -> Result<Box<dyn Interpolation1D>> {
        Ok(Box::new(LinearInterpolation::new(xs, ys)?))
    }
}

/// Log-linear interpolation builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLinear;

impl Interpolator for LogLinear {
    fn build(&self, xs: &[Real], ys: &[Real]) -> Result<Box<dyn Interpolation1D>> {
        Ok(Box::new(LogLinearInterpolation::new(xs, ys)?))
    }

    fn requires_positive_values(&self) -> bool {
        true
    }
}

/// Backward-flat interpolation builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackwardFlat;

impl Interpolator for BackwardFlat {
    fn build(&self, xs: &[Real], ys: &[Real]) -> Result<Box<dyn Interpolation1D>> {
        Ok(Box::new(BackwardFlatInterpolation::new(xs, ys)?))
    }

    fn required_points(&self) -> usize {
        1
    }
}

/// Forward-flat interpolation builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardFlat;

impl Interpolator for ForwardFlat {
    fn build(&self, xs: &[Real], ys: &[Real]) -> Result<Box<dyn Interpolation1D>> {
        Ok(Box::new(ForwardFlatInterpolation::new(xs, ys)?))
    }

    fn required_points(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn linear_interpolation() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [0.0, 1.0, 4.0];
        let interp = LinearInterpolation::new(&xs, &ys).unwrap();
        assert_abs_diff_eq!(interp.value(0.5), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(interp.value(1.5), 2.5, epsilon = 1e-12);
        // extrapolation continues the last segment
        assert_abs_diff_eq!(interp.value(3.0), 7.0, epsilon = 1e-12);
    }

    #[test]
    fn log_linear_interpolation() {
        let xs = [0.0, 1.0];
        let ys = [1.0, std::f64::consts::E];
        let interp = LogLinearInterpolation::new(&xs, &ys).unwrap();
        // At x=0.5, log(y)=0.5 → y = e^0.5
        let expected = std::f64::consts::E.sqrt();
        assert_abs_diff_eq!(interp.value(0.5), expected, epsilon = 1e-12);
    }

    #[test]
    fn log_linear_rejects_non_positive() {
        assert!(LogLinearInterpolation::new(&[0.0, 1.0], &[1.0, 0.0]).is_err());
    }

    #[test]
    fn backward_flat_interpolation() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [1.0, 2.0, 3.0];
        let interp = BackwardFlatInterpolation::new(&xs, &ys).unwrap();
        assert_eq!(interp.value(-1.0), 1.0);
        assert_eq!(interp.value(0.5), 2.0);
        assert_eq!(interp.value(1.0), 2.0);
        assert_eq!(interp.value(1.5), 3.0);
        assert_eq!(interp.value(5.0), 3.0);
    }

    #[test]
    fn forward_flat_interpolation() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [1.0, 2.0, 3.0];
        let interp = ForwardFlatInterpolation::new(&xs, &ys).unwrap();
        assert_eq!(interp.value(-1.0), 1.0);
        assert_eq!(interp.value(0.5), 1.0);
        assert_eq!(interp.value(1.5), 2.0);
        assert_eq!(interp.value(2.0), 3.0);
    }

    #[test]
    fn builders_report_their_needs() {
        assert_eq!(Linear.required_points(), 2);
        assert_eq!(ForwardFlat.required_points(), 1);
        assert!(BackwardFlat.build(&[0.5], &[0.03]).is_ok());
        assert!(Linear.build(&[0.5], &[0.03]).is_err());
        assert!(LogLinear.requires_positive_values());
        assert!(!Linear.requires_positive_values());
    }

    #[test]
    fn unsorted_abscissae_rejected() {
        assert!(Linear.build(&[0.0, 2.0, 1.0], &[1.0, 2.0, 3.0]).is_err());
        assert!(BackwardFlat.build(&[0.0, 0.0], &[1.0, 2.0]).is_err());
    }

    fn nodes() -> impl Strategy<Value = (Vec<Real>, Vec<Real>)> {
        prop::collection::vec((0.01f64..2.0, 0.05f64..1.5), 2..12).prop_map(|steps| {
            let mut x = 0.0;
            let mut xs = Vec::with_capacity(steps.len());
            let mut ys = Vec::with_capacity(steps.len());
            for (dx, y) in steps {
                xs.push(x);
                ys.push(y);
                x += dx;
            }
            (xs, ys)
        })
    }

    proptest! {
        #[test]
        fn every_scheme_reproduces_its_nodes((xs, ys) in nodes()) {
            let builders: [&dyn Interpolator; 4] =
                [&Linear, &LogLinear, &BackwardFlat, &ForwardFlat];
            for builder in builders {
                let interp = builder.build(&xs, &ys).unwrap();
                for (x, y) in xs.iter().zip(&ys) {
                    prop_assert_eq!(interp.value(*x), *y);
                }
            }
        }
    }
}
