//! # ql-math
//!
//! Mathematical utilities behind the calibration machinery: the safeguarded
//! 1D solver and its objective-function capability, the interpolation
//! strategies used by piecewise curves, and the normal distribution (via
//! statrs).

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Probability distributions.
pub mod distributions;

/// 1D interpolation schemes and the builders that create them.
pub mod interpolations;

/// 1D root-finding solvers.
pub mod solvers1d;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use distributions::{normal_cdf, normal_pdf};
pub use interpolations::{
    BackwardFlat, ForwardFlat, Interpolation1D, Interpolator, Linear, LogLinear,
};
pub use solvers1d::{
    Function, FunctionWithDerivative, ObjectiveFunction, SafeguardedSolver, SolverConfig,
    SolverReport, StoppingRule,
};
