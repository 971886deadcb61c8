//! # qlcalib
//!
//! Calibration building blocks: a safeguarded Newton solver, lazily
//! bootstrapped piecewise yield curves, and Black implied volatility
//! inversion.
//!
//! This crate is a **façade** that re-exports the workspace crates.
//! Application code should depend on this crate rather than the individual
//! `ql-*` crates.
//!
//! ## Quick start
//!
//! ```rust
//! use std::rc::Rc;
//! use qlcalib::math::LogLinear;
//! use qlcalib::pricingengines::{black_formula, black_formula_implied_std_dev, OptionType};
//! use qlcalib::quotes::SimpleQuote;
//! use qlcalib::termstructures::{
//!     Actual360, Actual365Fixed, CalibratingInstrument, Date, DepositRateHelper, Discount,
//!     PiecewiseCurve, YieldTermStructure,
//! };
//!
//! let today = Date::from_ymd_opt(2025, 1, 2).unwrap();
//! let expiry = Date::from_ymd_opt(2025, 7, 2).unwrap();
//! let rate = Rc::new(SimpleQuote::new(0.04));
//! let instruments: Vec<Rc<dyn CalibratingInstrument>> = vec![Rc::new(
//!     DepositRateHelper::new(rate.clone(), today, expiry, Actual360).unwrap(),
//! )];
//! let curve = PiecewiseCurve::new(today, instruments, Actual365Fixed, Discount, LogLinear);
//!
//! let discount = curve.discount_date(expiry).unwrap();
//! let price = black_formula(OptionType::Call, 100.0, 102.0, 0.14, discount, 0.0).unwrap();
//! let std_dev = black_formula_implied_std_dev(
//!     OptionType::Call, 100.0, 102.0, price, discount, None, 1e-12, 0.0,
//! )
//! .unwrap();
//! assert!((std_dev - 0.14).abs() < 1e-8);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Core types, aliases, errors, and the observer / lazy-object patterns.
pub use ql_core as core;

/// Safeguarded root finding, interpolation, and the normal distribution.
pub use ql_math as math;

/// Observable market quotes.
pub use ql_quotes as quotes;

/// Calibrating instruments and piecewise yield curves.
pub use ql_termstructures as termstructures;

/// Black-family formulas and implied volatility.
pub use ql_pricingengines as pricingengines;
