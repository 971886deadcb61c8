//! Safeguarded 1D root finding.
//!
//! A single solver serves every calibration in the workspace: implied
//! volatility inversion and curve bootstrapping both reduce to finding the
//! root of an [`ObjectiveFunction`] inside a known interval.
//!
//! The iteration is Newton-Raphson kept inside a bracket.  The bracket is
//! seeded from the search bounds and shrinks by residual sign after every
//! evaluation; a Newton step is taken only when it lands inside the bracket
//! and shrinks the residual fast enough, otherwise the step is a bisection.
//! Objectives without an analytic derivative get the secant slope across
//! the current bracket instead.

use ql_core::{
    errors::{Error, Result},
    Real,
};

/// Default cap on objective evaluations per solve.
pub const DEFAULT_MAX_EVALUATIONS: usize = 100;

// ── Objective functions ──────────────────────────────────────────────────────

/// A scalar function whose root is sought.
///
/// `derivative` is optional: return `None` when no analytic slope exists
/// (or when it is unusable at `x`) and the solver will estimate one.
pub trait ObjectiveFunction {
    /// The residual at `x`.
    fn value(&self, x: Real) -> Real;

    /// The analytic derivative at `x`, if available.
    fn derivative(&self, _x: Real) -> Option<Real> {
        None
    }
}

impl<T: ObjectiveFunction + ?Sized> ObjectiveFunction for &T {
    fn value(&self, x: Real) -> Real {
        (**self).value(x)
    }

    fn derivative(&self, x: Real) -> Option<Real> {
        (**self).derivative(x)
    }
}

/// Adapter turning a closure `x -> f(x)` into an objective.
#[derive(Debug, Clone, Copy)]
pub struct Function<F>(pub F);

impl<F: Fn(Real) -> Real> ObjectiveFunction for Function<F> {
    fn value(&self, x: Real) -> Real {
        (self.0)(x)
    }
}

/// Adapter turning a closure `x -> (f(x), f'(x))` into an objective.
#[derive(Debug, Clone, Copy)]
pub struct FunctionWithDerivative<F>(pub F);

impl<F: Fn(Real) -> (Real, Real)> ObjectiveFunction for FunctionWithDerivative<F> {
    fn value(&self, x: Real) -> Real {
        (self.0)(x).0
    }

    fn derivative(&self, x: Real) -> Option<Real> {
        Some((self.0)(x).1)
    }
}

// ── Configuration ────────────────────────────────────────────────────────────

/// What a solve measures its `accuracy` against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StoppingRule {
    /// Stop as soon as `|f(x)| < accuracy`, or once the bracket or the last
    /// step is narrower than `accuracy`.
    #[default]
    Residual,
    /// Stop only once the bracket or the last step is narrower than
    /// `accuracy`; a residual stops the solve only when it is exactly zero.
    /// `accuracy` is then in units of `x`.
    Step,
}

/// Solver settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig {
    /// Maximum number of objective evaluations, bound evaluations included.
    pub max_evaluations: usize,
    /// Enforced lower bound; the search interval is clipped to it.
    pub lower_bound: Option<Real>,
    /// Enforced upper bound; the search interval is clipped to it.
    pub upper_bound: Option<Real>,
    /// Stopping rule.
    pub stopping_rule: StoppingRule,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_evaluations: DEFAULT_MAX_EVALUATIONS,
            lower_bound: None,
            upper_bound: None,
            stopping_rule: StoppingRule::Residual,
        }
    }
}

impl SolverConfig {
    /// Set the evaluation cap.
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }

    /// Enforce a lower bound on the search interval.
    pub fn with_lower_bound(mut self, lower_bound: Real) -> Self {
        self.lower_bound = Some(lower_bound);
        self
    }

    /// Enforce an upper bound on the search interval.
    pub fn with_upper_bound(mut self, upper_bound: Real) -> Self {
        self.upper_bound = Some(upper_bound);
        self
    }

    /// Choose the stopping rule.
    pub fn with_stopping_rule(mut self, stopping_rule: StoppingRule) -> Self {
        self.stopping_rule = stopping_rule;
        self
    }
}

/// Outcome of a successful solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverReport {
    /// The root.
    pub root: Real,
    /// Objective evaluations spent.
    pub evaluations: usize,
    /// `f(root)`.
    pub residual: Real,
}

// ── Solver ───────────────────────────────────────────────────────────────────

/// Newton-Raphson with a bracketing fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafeguardedSolver {
    config: SolverConfig,
}

impl SafeguardedSolver {
    /// Create a solver with the given settings.
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Find `x` in `[x_min, x_max]` with `f(x) ≈ 0`, starting from `guess`.
    ///
    /// # Errors
    /// * [`Error::InvalidArgument`] if `accuracy` is not positive, the
    ///   interval is empty, or `guess` lies outside it.
    /// * [`Error::Convergence`] if the bounds do not bracket a root or the
    ///   evaluation cap is hit first.
    pub fn solve<F>(
        &self,
        f: &F,
        accuracy: Real,
        guess: Real,
        x_min: Real,
        x_max: Real,
    ) -> Result<Real>
    where
        F: ObjectiveFunction + ?Sized,
    {
        self.solve_with_report(f, accuracy, guess, x_min, x_max)
            .map(|report| report.root)
    }

    /// Like [`solve`](Self::solve), also returning evaluation count and
    /// final residual.
    pub fn solve_with_report<F>(
        &self,
        f: &F,
        accuracy: Real,
        guess: Real,
        x_min: Real,
        x_max: Real,
    ) -> Result<SolverReport>
    where
        F: ObjectiveFunction + ?Sized,
    {
        ql_core::ensure!(accuracy > 0.0, "accuracy ({accuracy}) must be positive");
        let x_min = self.config.lower_bound.map_or(x_min, |lb| x_min.max(lb));
        let x_max = self.config.upper_bound.map_or(x_max, |ub| x_max.min(ub));
        ql_core::ensure!(
            x_min < x_max,
            "invalid range: x_min ({x_min}) >= x_max ({x_max})"
        );
        ql_core::ensure!(
            (x_min..=x_max).contains(&guess),
            "guess ({guess}) outside range [{x_min}, {x_max}]"
        );
        let accuracy = accuracy.max(f64::EPSILON);

        let mut evaluations = 0;
        let f_min = self.evaluate(f, x_min, &mut evaluations)?;
        if self.is_root(f_min, accuracy) {
            return Ok(self.converged(x_min, f_min, evaluations));
        }
        let f_max = self.evaluate(f, x_max, &mut evaluations)?;
        if self.is_root(f_max, accuracy) {
            return Ok(self.converged(x_max, f_max, evaluations));
        }
        if f_min * f_max > 0.0 {
            return Err(Error::Convergence {
                evaluations,
                reason: format!(
                    "root not bracketed: f({x_min}) = {f_min}, f({x_max}) = {f_max}"
                ),
            });
        }

        // Orient so that f(xl) < 0 < f(xh)
        let (mut xl, mut fl, mut xh, mut fh) = if f_min < 0.0 {
            (x_min, f_min, x_max, f_max)
        } else {
            (x_max, f_max, x_min, f_min)
        };

        let mut x = guess;
        let mut fx = self.evaluate(f, x, &mut evaluations)?;
        let mut dx_old = x_max - x_min;
        let mut dx = dx_old;

        loop {
            if self.is_root(fx, accuracy) {
                return Ok(self.converged(x, fx, evaluations));
            }
            if fx < 0.0 {
                xl = x;
                fl = fx;
            } else {
                xh = x;
                fh = fx;
            }

            let tolerance = accuracy.max(4.0 * f64::EPSILON * x.abs());
            if (xh - xl).abs() < tolerance {
                return Ok(self.converged(x, fx, evaluations));
            }

            let slope = f
                .derivative(x)
                .filter(|d| d.is_finite() && *d != 0.0)
                .unwrap_or((fh - fl) / (xh - xl));

            let newton_out_of_range = ((x - xh) * slope - fx) * ((x - xl) * slope - fx) > 0.0;
            let bisection_faster = (2.0 * fx).abs() > (dx_old * slope).abs();

            dx_old = dx;
            if !slope.is_finite() || slope == 0.0 || newton_out_of_range || bisection_faster {
                dx = 0.5 * (xh - xl);
                x = xl + dx;
                tracing::trace!(x, fx, dx, "bisection step");
            } else {
                dx = fx / slope;
                x -= dx;
                tracing::trace!(x, fx, dx, slope, "newton step");
            }

            fx = self.evaluate(f, x, &mut evaluations)?;
            if dx.abs() < tolerance {
                return Ok(self.converged(x, fx, evaluations));
            }
        }
    }

    fn is_root(&self, fx: Real, accuracy: Real) -> bool {
        match self.config.stopping_rule {
            StoppingRule::Residual => fx.abs() < accuracy,
            StoppingRule::Step => fx == 0.0,
        }
    }

    fn evaluate<F>(&self, f: &F, x: Real, evaluations: &mut usize) -> Result<Real>
    where
        F: ObjectiveFunction + ?Sized,
    {
        if *evaluations >= self.config.max_evaluations {
            return Err(Error::Convergence {
                evaluations: *evaluations,
                reason: format!("evaluation cap reached at x = {x}"),
            });
        }
        *evaluations += 1;
        let fx = f.value(x);
        if fx.is_finite() {
            Ok(fx)
        } else {
            Err(Error::Convergence {
                evaluations: *evaluations,
                reason: format!("objective is not finite at x = {x}"),
            })
        }
    }

    fn converged(&self, root: Real, residual: Real, evaluations: usize) -> SolverReport {
        tracing::debug!(root, residual, evaluations, "solver converged");
        SolverReport {
            root,
            evaluations,
            residual,
        }
    }
}
