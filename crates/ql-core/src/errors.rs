//! Error types for qlcalib.
//!
//! Every fallible operation in the workspace returns [`Result`], whose error
//! side is the single `thiserror`-derived [`Error`] enum below.  The macros
//! [`ensure!`](crate::ensure), [`ensure_post!`](crate::ensure_post) and
//! [`fail!`](crate::fail) cover the three ways a computation bails out:
//! a violated precondition, a violated postcondition, and a plain failure.

use thiserror::Error;

/// The top-level error type used throughout qlcalib.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// General runtime error (e.g. a re-entrant read of a curve that is
    /// being bootstrapped).
    #[error("{0}")]
    Runtime(String),

    /// A precondition on the inputs of an operation was violated.
    ///
    /// Always reported before any computation (or solver state) is set up.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A root finder exhausted its evaluation budget, or could not bracket
    /// a root, without meeting the requested accuracy.
    #[error("convergence failure after {evaluations} evaluations: {reason}")]
    Convergence {
        /// Number of objective evaluations performed before giving up.
        evaluations: usize,
        /// What went wrong.
        reason: String,
    },

    /// Two calibrating instruments share the same maturity.
    #[error("more than one instrument with maturity {maturity} (t = {time})")]
    DuplicateMaturity {
        /// Display form of the shared maturity date.
        maturity: String,
        /// The shared maturity as a year fraction.
        time: f64,
    },

    /// A postcondition failed: the computed result is inconsistent
    /// (for instance a negative option price).
    #[error("numerical inconsistency: {0}")]
    NumericalInconsistency(String),

    /// An operation was requested on a null / unset value.
    #[error("null value: {0}")]
    NullValue(String),
}

impl Error {
    /// Return `true` for [`Error::Convergence`].
    pub fn is_convergence(&self) -> bool {
        matches!(self, Error::Convergence { .. })
    }

    /// Prefix the message of this error with `context`, keeping its kind.
    ///
    /// Used by the bootstrapper to say which instrument failed without
    /// turning a convergence failure into a generic runtime error.
    pub fn with_context(self, context: impl std::fmt::Display) -> Self {
        match self {
            Error::Runtime(m) => Error::Runtime(format!("{context}: {m}")),
            Error::InvalidArgument(m) => Error::InvalidArgument(format!("{context}: {m}")),
            Error::Convergence {
                evaluations,
                reason,
            } => Error::Convergence {
                evaluations,
                reason: format!("{context}: {reason}"),
            },
            Error::NumericalInconsistency(m) => {
                Error::NumericalInconsistency(format!("{context}: {m}"))
            }
            Error::NullValue(m) => Error::NullValue(format!("{context}: {m}")),
            e @ Error::DuplicateMaturity { .. } => e,
        }
    }
}

/// Shorthand `Result` type used throughout qlcalib.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Check a precondition.
///
/// Returns `Err(Error::InvalidArgument(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use ql_core::{ensure, errors::Error};
/// fn positive(x: f64) -> ql_core::errors::Result<f64> {
///     ensure!(x > 0.0, "x must be positive, got {x}");
///     Ok(x)
/// }
/// assert!(positive(1.0).is_ok());
/// assert!(matches!(positive(-1.0), Err(Error::InvalidArgument(_))));
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::InvalidArgument(
                format!($($msg)*)
            ));
        }
    };
}

/// Check a postcondition.
///
/// Returns `Err(Error::NumericalInconsistency(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use ql_core::{ensure_post, errors::Error};
/// fn compute(x: f64) -> ql_core::errors::Result<f64> {
///     let result = x * 2.0;
///     ensure_post!(result > 0.0, "result must be positive, got {result}");
///     Ok(result)
/// }
/// assert!(compute(1.0).is_ok());
/// assert!(matches!(compute(-1.0), Err(Error::NumericalInconsistency(_))));
/// ```
#[macro_export]
macro_rules! ensure_post {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::NumericalInconsistency(
                format!($($msg)*)
            ));
        }
    };
}

/// Fail immediately.
///
/// Returns `Err(Error::Runtime(...))`.
///
/// # Example
/// ```
/// use ql_core::{fail, errors::Error};
/// fn always_err() -> ql_core::errors::Result<()> {
///     fail!("something went wrong");
/// }
/// assert!(always_err().is_err());
/// ```
#[macro_export]
macro_rules! fail {
    ($($msg:tt)*) => {
        return Err($crate::errors::Error::Runtime(format!($($msg)*)))
    };
}
