//! # ql-pricingengines
//!
//! The Black (shifted log-normal) and Bachelier closed forms, plus the
//! inversion of Black prices into implied standard deviations and
//! volatilities through the safeguarded solver, seeded by a closed-form
//! approximation.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Black-family formulas and implied volatility inversion.
pub mod black_formula;

/// Option type and the plain vanilla payoff.
pub mod payoff;

pub use black_formula::{
    approximate_implied_std_dev, approximate_implied_volatility, bachelier_black_formula,
    black_formula, black_formula_cash_itm_probability, black_formula_implied_std_dev,
    black_formula_implied_std_dev_approximation, black_formula_std_dev_derivative,
    implied_volatility, BlackImpliedStdDevHelper, StdDevSeed, DEFAULT_IMPLIED_ACCURACY,
};
pub use payoff::{OptionType, PlainVanillaPayoff};
