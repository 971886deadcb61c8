//! # ql-termstructures
//!
//! Yield term structures and the machinery that fits them to market
//! instruments: calibrating instruments (deposits, FRAs, futures, swaps),
//! curve traits, the sequential bootstrap, and the lazily recalculated
//! [`PiecewiseCurve`].

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Dates and day-count conventions.
pub mod day_counter;

/// `TermStructure` — base trait for all term structures.
pub mod term_structure;

/// `YieldTermStructure` — yield / interest-rate term structures.
pub mod yield_term_structure;

/// Curve traits: discount-factor and zero-rate node semantics.
pub mod bootstrap_traits;

/// Calibrating instruments (rate helpers).
pub mod rate_helpers;

/// The sequential bootstrap and the curves it produces.
pub mod bootstrap;

/// `PiecewiseCurve` — lazily bootstrapped yield curve.
pub mod piecewise_curve;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use bootstrap::{BootstrapConfig, InterpolatedCurve, IterativeBootstrap};
pub use bootstrap_traits::{CurveTraits, Discount, ZeroYield};
pub use day_counter::{Actual360, Actual365Fixed, Date, DayCounter};
pub use piecewise_curve::PiecewiseCurve;
pub use rate_helpers::{
    CalibratingInstrument, DepositRateHelper, FraRateHelper, FuturesRateHelper, SwapRateHelper,
};
pub use term_structure::TermStructure;
pub use yield_term_structure::YieldTermStructure;
