//! Black (shifted log-normal) and Bachelier formulas, and the inversion of
//! Black prices into implied standard deviations.
//!
//! All functions work on *forward* prices: `forward` is the forward of the
//! underlying, `discount` the discount factor to payment, and `std_dev` the
//! total standard deviation `σ√T`.  A non-zero `displacement` shifts both
//! forward and strike (shifted log-normal model).
//!
//! The inversion solves `black_formula(σ√T) = price` with the safeguarded
//! Newton solver on `[0, 3]`, seeded either by the caller or by the
//! Brenner–Subrahmanyan / Corrado–Miller closed-form approximation.

use crate::payoff::{OptionType, PlainVanillaPayoff};
use ql_core::{errors::Result, Real, Time, Volatility};
use ql_math::{
    normal_cdf, normal_pdf, ObjectiveFunction, SafeguardedSolver, SolverConfig, StoppingRule,
};
use std::f64::consts::PI;

/// Default accuracy, in standard deviation units, of the implied solve.
pub const DEFAULT_IMPLIED_ACCURACY: Real = 1.0e-6;

/// Search interval for the implied standard deviation.
const MIN_STD_DEV: Real = 0.0;
const MAX_STD_DEV: Real = 3.0;

/// Evaluation cap for the implied standard deviation solve.
const MAX_EVALUATIONS: usize = 100;

/// Relative size of a negative price attributed to cancellation error.
const ROUND_OFF: Real = 1.0e-13;

fn check_market(strike: Real, forward: Real, discount: Real, displacement: Real) -> Result<()> {
    ql_core::ensure!(strike >= 0.0, "strike ({strike}) must be non-negative");
    ql_core::ensure!(forward > 0.0, "forward ({forward}) must be positive");
    ql_core::ensure!(
        discount > 0.0,
        "positive discount required: {discount} not allowed"
    );
    ql_core::ensure!(
        displacement >= 0.0,
        "displacement ({displacement}) must be non-negative"
    );
    Ok(())
}

/// Floor a price that is negative only through round-off.
fn floor_round_off(value: Real, scale: Real) -> Real {
    if value < 0.0 && value > -ROUND_OFF * scale {
        0.0
    } else {
        value
    }
}

// ── Black formula ─────────────────────────────────────────────────────────────

/// Black formula for a call or put.
///
/// `price = D·φ·(F·N(φ·d1) − K·N(φ·d2))`, `d1,2 = ln(F/K)/s ± s/2`, with
/// `F` and `K` displaced and `s = std_dev`.
///
/// # Errors
/// [`InvalidArgument`](ql_core::Error::InvalidArgument) on a negative
/// strike, std_dev or displacement, or a non-positive forward or discount;
/// [`NumericalInconsistency`](ql_core::Error::NumericalInconsistency) if
/// the result comes out negative.
pub fn black_formula(
    option_type: OptionType,
    strike: Real,
    forward: Real,
    std_dev: Real,
    discount: Real,
    displacement: Real,
) -> Result<Real> {
    check_market(strike, forward, discount, displacement)?;
    ql_core::ensure!(std_dev >= 0.0, "stdDev ({std_dev}) must be non-negative");

    let forward = forward + displacement;
    let strike = strike + displacement;
    let phi = option_type.sign();

    if std_dev == 0.0 {
        return Ok((phi * (forward - strike)).max(0.0) * discount);
    }
    // strike == 0 only without displacement
    if strike == 0.0 {
        return Ok(match option_type {
            OptionType::Call => forward * discount,
            OptionType::Put => 0.0,
        });
    }

    let d1 = (forward / strike).ln() / std_dev + 0.5 * std_dev;
    let d2 = d1 - std_dev;
    let result = discount * phi * (forward * normal_cdf(phi * d1) - strike * normal_cdf(phi * d2));
    let result = floor_round_off(result, discount * forward.max(strike));
    ql_core::ensure_post!(
        result >= 0.0,
        "negative value ({result}) for a {std_dev} stdDev {option_type} option struck at \
         {strike} on a {forward} forward"
    );
    Ok(result)
}

/// Probability that the option finishes in the money under the Black
/// measure, `N(φ·d2)`.
pub fn black_formula_cash_itm_probability(
    option_type: OptionType,
    strike: Real,
    forward: Real,
    std_dev: Real,
    displacement: Real,
) -> Result<Real> {
    check_market(strike, forward, 1.0, displacement)?;
    ql_core::ensure!(std_dev >= 0.0, "stdDev ({std_dev}) must be non-negative");

    let forward = forward + displacement;
    let strike = strike + displacement;
    let phi = option_type.sign();

    if std_dev == 0.0 {
        return Ok(if phi * forward > phi * strike { 1.0 } else { 0.0 });
    }
    if strike == 0.0 {
        return Ok(match option_type {
            OptionType::Call => 1.0,
            OptionType::Put => 0.0,
        });
    }
    let d1 = (forward / strike).ln() / std_dev + 0.5 * std_dev;
    let d2 = d1 - std_dev;
    Ok(normal_cdf(phi * d2))
}

/// Sensitivity of the Black price to `std_dev`: `D·F·φ(d1)`.
///
/// Identical for calls and puts.
pub fn black_formula_std_dev_derivative(
    strike: Real,
    forward: Real,
    std_dev: Real,
    discount: Real,
    displacement: Real,
) -> Result<Real> {
    check_market(strike, forward, discount, displacement)?;
    ql_core::ensure!(std_dev >= 0.0, "stdDev ({std_dev}) must be non-negative");

    let forward = forward + displacement;
    let strike = strike + displacement;

    if std_dev == 0.0 {
        // limit of φ(d1) as std_dev → 0
        return Ok(if forward == strike {
            discount * forward * normal_pdf(0.0)
        } else {
            0.0
        });
    }
    let d1 = (forward / strike).ln() / std_dev + 0.5 * std_dev;
    Ok(discount * forward * normal_pdf(d1))
}

// ── Bachelier ─────────────────────────────────────────────────────────────────

/// Bachelier (normal) formula for a call or put.
///
/// `price = D·(s·φ(h) + d·N(h))` with `d = φ(F − K)`, `h = d/s`, and
/// `s = std_dev` in price units.
pub fn bachelier_black_formula(
    option_type: OptionType,
    strike: Real,
    forward: Real,
    std_dev: Real,
    discount: Real,
) -> Result<Real> {
    ql_core::ensure!(std_dev >= 0.0, "stdDev ({std_dev}) must be non-negative");
    ql_core::ensure!(
        discount > 0.0,
        "positive discount required: {discount} not allowed"
    );

    let d = option_type.sign() * (forward - strike);
    if std_dev == 0.0 {
        return Ok(discount * d.max(0.0));
    }
    let h = d / std_dev;
    let result = discount * (std_dev * normal_pdf(h) + d * normal_cdf(h));
    let result = floor_round_off(result, discount * std_dev.max(d.abs()));
    ql_core::ensure_post!(
        result >= 0.0,
        "negative value ({result}) for a {std_dev} stdDev {option_type} option struck at \
         {strike} on a {forward} forward (Bachelier model)"
    );
    Ok(result)
}

// ── Closed-form approximation ─────────────────────────────────────────────────

/// Closed-form implied standard deviation, with a note on how it was found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StdDevSeed {
    /// The approximated `σ√T`.
    pub std_dev: Real,
    /// `true` if the Corrado–Miller discriminant was negative and clamped to
    /// zero, i.e. the approximation is outside its domain and only usable
    /// as a solver seed.
    pub discriminant_clamped: bool,
}

/// Approximate the implied standard deviation of a Black price.
///
/// At the money (after displacement) this is the Brenner–Subrahmanyan /
/// Feinstein formula `price/D·√(2π)/F`; elsewhere the Corrado–Miller
/// extended-moneyness formula, whose discriminant is clamped to zero when
/// negative.
pub fn approximate_implied_std_dev(
    option_type: OptionType,
    strike: Real,
    forward: Real,
    black_price: Real,
    discount: Real,
    displacement: Real,
) -> Result<StdDevSeed> {
    check_market(strike, forward, discount, displacement)?;
    ql_core::ensure!(
        black_price >= 0.0,
        "blackPrice ({black_price}) must be non-negative"
    );

    let forward = forward + displacement;
    let strike = strike + displacement;
    let sqrt_two_pi = (2.0 * PI).sqrt();

    let seed = if strike == forward {
        StdDevSeed {
            std_dev: black_price / discount * sqrt_two_pi / forward,
            discriminant_clamped: false,
        }
    } else {
        let moneyness_delta = option_type.sign() * (forward - strike);
        let temp = black_price / discount - 0.5 * moneyness_delta;
        let discriminant = temp * temp - moneyness_delta * moneyness_delta / PI;
        let clamped = discriminant < 0.0;
        if clamped {
            tracing::debug!(
                %option_type,
                strike,
                forward,
                black_price,
                discriminant,
                "Corrado-Miller discriminant negative, clamped to zero"
            );
        }
        StdDevSeed {
            std_dev: (temp + discriminant.max(0.0).sqrt()) * sqrt_two_pi / (forward + strike),
            discriminant_clamped: clamped,
        }
    };

    ql_core::ensure_post!(
        seed.std_dev.is_finite() && seed.std_dev >= 0.0,
        "stdDev ({}) must be non-negative",
        seed.std_dev
    );
    Ok(seed)
}

/// Approximate implied standard deviation (see
/// [`approximate_implied_std_dev`]), returning the number only.
pub fn black_formula_implied_std_dev_approximation(
    option_type: OptionType,
    strike: Real,
    forward: Real,
    black_price: Real,
    discount: Real,
    displacement: Real,
) -> Result<Real> {
    approximate_implied_std_dev(
        option_type,
        strike,
        forward,
        black_price,
        discount,
        displacement,
    )
    .map(|seed| seed.std_dev)
}

/// Approximate implied volatility: the approximate standard deviation over
/// `√T`.
pub fn approximate_implied_volatility(
    option_type: OptionType,
    strike: Real,
    forward: Real,
    black_price: Real,
    discount: Real,
    time_to_expiry: Time,
    displacement: Real,
) -> Result<Volatility> {
    ql_core::ensure!(
        time_to_expiry > 0.0,
        "time to expiry ({time_to_expiry}) must be positive"
    );
    let std_dev = black_formula_implied_std_dev_approximation(
        option_type,
        strike,
        forward,
        black_price,
        discount,
        displacement,
    )?;
    Ok(std_dev / time_to_expiry.sqrt())
}

// ── Inversion ─────────────────────────────────────────────────────────────────

/// Objective for the implied standard deviation solve: undiscounted Black
/// price at `std_dev` minus the undiscounted target price.
#[derive(Debug, Clone, Copy)]
pub struct BlackImpliedStdDevHelper {
    half_option_type: Real,
    signed_strike: Real,
    signed_forward: Real,
    forward: Real,
    signed_moneyness: Real,
    undiscounted_price: Real,
}

impl BlackImpliedStdDevHelper {
    /// Build the objective; `undiscounted_price` is the target price divided
    /// by the discount factor.
    pub fn new(
        option_type: OptionType,
        strike: Real,
        forward: Real,
        undiscounted_price: Real,
        displacement: Real,
    ) -> Result<Self> {
        check_market(strike, forward, 1.0, displacement)?;
        ql_core::ensure!(
            undiscounted_price >= 0.0,
            "undiscounted Black price ({undiscounted_price}) must be non-negative"
        );
        let phi = option_type.sign();
        let forward = forward + displacement;
        let strike = strike + displacement;
        Ok(Self {
            half_option_type: 0.5 * phi,
            signed_strike: phi * strike,
            signed_forward: phi * forward,
            forward,
            signed_moneyness: phi * (forward / strike).ln(),
            undiscounted_price,
        })
    }
}

impl ObjectiveFunction for BlackImpliedStdDevHelper {
    fn value(&self, std_dev: Real) -> Real {
        if std_dev == 0.0 {
            return (self.signed_forward - self.signed_strike).max(0.0) - self.undiscounted_price;
        }
        let temp = self.half_option_type * std_dev;
        let d = self.signed_moneyness / std_dev;
        let signed_d1 = d + temp;
        let signed_d2 = d - temp;
        let result = self.signed_forward * normal_cdf(signed_d1)
            - self.signed_strike * normal_cdf(signed_d2);
        // numerical inaccuracies can yield a negative answer
        result.max(0.0) - self.undiscounted_price
    }

    fn derivative(&self, std_dev: Real) -> Option<Real> {
        if std_dev <= 0.0 {
            return None;
        }
        let signed_d1 = self.signed_moneyness / std_dev + self.half_option_type * std_dev;
        Some(self.forward * normal_pdf(signed_d1))
    }
}

/// Implied standard deviation `σ√T` of a Black price.
///
/// `guess` seeds the solver; when `None` the closed-form approximation is
/// used (clamped into the search interval `[0, 3]`).  `accuracy` is
/// measured on the standard deviation, not on the price.
///
/// # Errors
/// * [`InvalidArgument`](ql_core::Error::InvalidArgument) if an input is
///   out of domain, the price is below intrinsic or not below the
///   no-arbitrage bound (forward for calls, strike for puts), or the guess
///   is negative or above 3.
/// * [`Convergence`](ql_core::Error::Convergence) if the solver runs out
///   of evaluations.
#[allow(clippy::too_many_arguments)]
pub fn black_formula_implied_std_dev(
    option_type: OptionType,
    strike: Real,
    forward: Real,
    black_price: Real,
    discount: Real,
    guess: Option<Real>,
    accuracy: Real,
    displacement: Real,
) -> Result<Real> {
    check_market(strike, forward, discount, displacement)?;
    ql_core::ensure!(
        black_price >= 0.0,
        "blackPrice ({black_price}) must be non-negative"
    );
    ql_core::ensure!(accuracy > 0.0, "accuracy ({accuracy}) must be positive");

    let undiscounted = black_price / discount;
    let phi = option_type.sign();
    let shifted_forward = forward + displacement;
    let shifted_strike = strike + displacement;
    let intrinsic = (phi * (shifted_forward - shifted_strike)).max(0.0);
    let upper = match option_type {
        OptionType::Call => shifted_forward,
        OptionType::Put => shifted_strike,
    };
    ql_core::ensure!(
        undiscounted >= intrinsic - accuracy,
        "option price ({black_price}) below intrinsic value ({})",
        intrinsic * discount
    );
    ql_core::ensure!(
        undiscounted < upper,
        "option price ({black_price}) not below the no-arbitrage bound ({})",
        upper * discount
    );

    let guess = match guess {
        Some(g) => {
            ql_core::ensure!(g >= 0.0, "stdDev guess ({g}) must be non-negative");
            g
        }
        None => black_formula_implied_std_dev_approximation(
            option_type,
            strike,
            forward,
            black_price,
            discount,
            displacement,
        )?
        .clamp(MIN_STD_DEV, MAX_STD_DEV),
    };

    let helper =
        BlackImpliedStdDevHelper::new(option_type, strike, forward, undiscounted, displacement)?;
    let solver = SafeguardedSolver::new(
        SolverConfig::default()
            .with_max_evaluations(MAX_EVALUATIONS)
            .with_stopping_rule(StoppingRule::Step),
    );
    let report = solver.solve_with_report(&helper, accuracy, guess, MIN_STD_DEV, MAX_STD_DEV)?;

    tracing::debug!(
        %option_type,
        strike,
        forward,
        black_price,
        std_dev = report.root,
        evaluations = report.evaluations,
        "implied stdDev found"
    );
    ql_core::ensure_post!(
        report.root >= 0.0,
        "stdDev ({}) must be non-negative",
        report.root
    );
    Ok(report.root)
}

/// Implied Black volatility: the implied standard deviation over `√T`.
///
/// `guess` is a volatility (not a standard deviation).
#[allow(clippy::too_many_arguments)]
pub fn implied_volatility(
    option_type: OptionType,
    strike: Real,
    forward: Real,
    black_price: Real,
    discount: Real,
    time_to_expiry: Time,
    guess: Option<Volatility>,
    accuracy: Real,
    displacement: Real,
) -> Result<Volatility> {
    ql_core::ensure!(
        time_to_expiry > 0.0,
        "time to expiry ({time_to_expiry}) must be positive"
    );
    let sqrt_t = time_to_expiry.sqrt();
    let std_dev = black_formula_implied_std_dev(
        option_type,
        strike,
        forward,
        black_price,
        discount,
        guess.map(|vol| vol * sqrt_t),
        accuracy,
        displacement,
    )?;
    Ok(std_dev / sqrt_t)
}

// ── Payoff overloads ──────────────────────────────────────────────────────────

impl PlainVanillaPayoff {
    /// [`black_formula`] for this payoff.
    pub fn black_price(
        &self,
        forward: Real,
        std_dev: Real,
        discount: Real,
        displacement: Real,
    ) -> Result<Real> {
        black_formula(
            self.option_type,
            self.strike,
            forward,
            std_dev,
            discount,
            displacement,
        )
    }

    /// [`black_formula_implied_std_dev_approximation`] for this payoff.
    pub fn black_implied_std_dev_approximation(
        &self,
        forward: Real,
        black_price: Real,
        discount: Real,
        displacement: Real,
    ) -> Result<Real> {
        black_formula_implied_std_dev_approximation(
            self.option_type,
            self.strike,
            forward,
            black_price,
            discount,
            displacement,
        )
    }

    /// [`black_formula_implied_std_dev`] for this payoff.
    pub fn black_implied_std_dev(
        &self,
        forward: Real,
        black_price: Real,
        discount: Real,
        guess: Option<Real>,
        accuracy: Real,
        displacement: Real,
    ) -> Result<Real> {
        black_formula_implied_std_dev(
            self.option_type,
            self.strike,
            forward,
            black_price,
            discount,
            guess,
            accuracy,
            displacement,
        )
    }

    /// [`black_formula_cash_itm_probability`] for this payoff.
    pub fn black_cash_itm_probability(
        &self,
        forward: Real,
        std_dev: Real,
        displacement: Real,
    ) -> Result<Real> {
        black_formula_cash_itm_probability(
            self.option_type,
            self.strike,
            forward,
            std_dev,
            displacement,
        )
    }

    /// [`black_formula_std_dev_derivative`] for this payoff.
    pub fn black_std_dev_derivative(
        &self,
        forward: Real,
        std_dev: Real,
        discount: Real,
        displacement: Real,
    ) -> Result<Real> {
        black_formula_std_dev_derivative(self.strike, forward, std_dev, discount, displacement)
    }

    /// [`bachelier_black_formula`] for this payoff.
    pub fn bachelier_price(&self, forward: Real, std_dev: Real, discount: Real) -> Result<Real> {
        bachelier_black_formula(self.option_type, self.strike, forward, std_dev, discount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ql_core::Error;

    #[test]
    fn atm_call_reference_value() {
        // F (2 N(0.1) - 1)
        let price = black_formula(OptionType::Call, 100.0, 100.0, 0.2, 1.0, 0.0).unwrap();
        assert_abs_diff_eq!(price, 7.965_567_455_405_804, epsilon = 1e-10);
    }

    #[test]
    fn put_call_parity() {
        let (k, f, s, d) = (95.0, 100.0, 0.3, 0.97);
        let call = black_formula(OptionType::Call, k, f, s, d, 0.0).unwrap();
        let put = black_formula(OptionType::Put, k, f, s, d, 0.0).unwrap();
        assert_abs_diff_eq!(call - put, d * (f - k), epsilon = 1e-10);
    }

    #[test]
    fn zero_strike() {
        assert_eq!(
            black_formula(OptionType::Call, 0.0, 100.0, 0.2, 0.9, 0.0).unwrap(),
            90.0
        );
        assert_eq!(
            black_formula(OptionType::Put, 0.0, 100.0, 0.2, 0.9, 0.0).unwrap(),
            0.0
        );
    }

    #[test]
    fn displacement_shifts_forward_and_strike() {
        let shifted = black_formula(OptionType::Call, 0.01, 0.02, 0.3, 1.0, 0.03).unwrap();
        let plain = black_formula(OptionType::Call, 0.04, 0.05, 0.3, 1.0, 0.0).unwrap();
        assert_abs_diff_eq!(shifted, plain, epsilon = 1e-15);
    }

    #[test]
    fn invalid_inputs_rejected() {
        let cases = [
            black_formula(OptionType::Call, -1.0, 100.0, 0.2, 1.0, 0.0),
            black_formula(OptionType::Call, 100.0, 0.0, 0.2, 1.0, 0.0),
            black_formula(OptionType::Call, 100.0, 100.0, -0.2, 1.0, 0.0),
            black_formula(OptionType::Call, 100.0, 100.0, 0.2, 0.0, 0.0),
            black_formula(OptionType::Call, 100.0, 100.0, 0.2, 1.0, -0.1),
        ];
        for case in cases {
            assert!(matches!(case, Err(Error::InvalidArgument(_))), "{case:?}");
        }
    }

    #[test]
    fn std_dev_derivative_matches_finite_difference() {
        let (k, f, s, d) = (110.0, 100.0, 0.25, 0.95);
        let h = 1e-6;
        let up = black_formula(OptionType::Put, k, f, s + h, d, 0.0).unwrap();
        let down = black_formula(OptionType::Put, k, f, s - h, d, 0.0).unwrap();
        let analytic = black_formula_std_dev_derivative(k, f, s, d, 0.0).unwrap();
        assert_abs_diff_eq!(analytic, (up - down) / (2.0 * h), epsilon = 1e-6);
    }

    #[test]
    fn helper_derivative_is_vega_for_both_signs() {
        for option_type in [OptionType::Call, OptionType::Put] {
            let helper =
                BlackImpliedStdDevHelper::new(option_type, 90.0, 100.0, 12.0, 0.0).unwrap();
            let s = 0.3;
            let h = 1e-6;
            let fd = (helper.value(s + h) - helper.value(s - h)) / (2.0 * h);
            let analytic = helper.derivative(s).unwrap();
            assert!(analytic > 0.0);
            assert_abs_diff_eq!(analytic, fd, epsilon = 1e-5);
        }
    }

    #[test]
    fn helper_at_zero_std_dev() {
        let helper =
            BlackImpliedStdDevHelper::new(OptionType::Call, 90.0, 100.0, 12.0, 0.0).unwrap();
        assert_abs_diff_eq!(helper.value(0.0), -2.0, epsilon = 1e-15);
        assert!(helper.derivative(0.0).is_none());
    }

    #[test]
    fn cash_itm_probability() {
        let p_call =
            black_formula_cash_itm_probability(OptionType::Call, 100.0, 100.0, 0.2, 0.0).unwrap();
        let p_put =
            black_formula_cash_itm_probability(OptionType::Put, 100.0, 100.0, 0.2, 0.0).unwrap();
        assert_abs_diff_eq!(p_call + p_put, 1.0, epsilon = 1e-15);
        assert!(p_call < 0.5);
        assert_eq!(
            black_formula_cash_itm_probability(OptionType::Call, 90.0, 100.0, 0.0, 0.0).unwrap(),
            1.0
        );
    }

    #[test]
    fn bachelier_atm() {
        // ATM: D s / √(2π)
        let price = bachelier_black_formula(OptionType::Call, 100.0, 100.0, 10.0, 0.9).unwrap();
        assert_abs_diff_eq!(price, 0.9 * 10.0 / (2.0 * PI).sqrt(), epsilon = 1e-12);
        let itm = bachelier_black_formula(OptionType::Put, 110.0, 100.0, 0.0, 0.9).unwrap();
        assert_abs_diff_eq!(itm, 9.0, epsilon = 1e-12);
    }

    #[test]
    fn bachelier_put_call_parity() {
        let call = bachelier_black_formula(OptionType::Call, 95.0, 100.0, 8.0, 0.9).unwrap();
        let put = bachelier_black_formula(OptionType::Put, 95.0, 100.0, 8.0, 0.9).unwrap();
        assert_abs_diff_eq!(call - put, 0.9 * 5.0, epsilon = 1e-12);
    }

    #[test]
    fn atm_approximation_is_brenner_subrahmanyan() {
        let price = black_formula(OptionType::Call, 100.0, 100.0, 0.2, 0.9, 0.0).unwrap();
        let seed =
            approximate_implied_std_dev(OptionType::Call, 100.0, 100.0, price, 0.9, 0.0).unwrap();
        assert!(!seed.discriminant_clamped);
        assert_abs_diff_eq!(seed.std_dev, price / 0.9 * (2.0 * PI).sqrt() / 100.0, epsilon = 1e-15);
        assert_abs_diff_eq!(seed.std_dev, 0.2, epsilon = 1e-3);
    }

    #[test]
    fn corrado_miller_clamp_is_reported() {
        // deep in the money call priced at intrinsic: the discriminant goes negative
        let seed =
            approximate_implied_std_dev(OptionType::Call, 50.0, 100.0, 50.0, 1.0, 0.0).unwrap();
        assert!(seed.discriminant_clamped);
        assert!(seed.std_dev.is_finite() && seed.std_dev >= 0.0);
    }

    #[test]
    fn implied_std_dev_round_trip() {
        let price = black_formula(OptionType::Put, 105.0, 100.0, 0.35, 0.95, 0.0).unwrap();
        let std_dev = black_formula_implied_std_dev(
            OptionType::Put,
            105.0,
            100.0,
            price,
            0.95,
            None,
            1e-12,
            0.0,
        )
        .unwrap();
        assert_abs_diff_eq!(std_dev, 0.35, epsilon = 1e-9);
    }

    #[test]
    fn implied_std_dev_at_intrinsic_is_zero() {
        let std_dev = black_formula_implied_std_dev(
            OptionType::Call,
            90.0,
            100.0,
            10.0,
            1.0,
            None,
            1e-10,
            0.0,
        )
        .unwrap();
        assert_eq!(std_dev, 0.0);
    }

    #[test]
    fn implied_std_dev_rejects_arbitrage_prices() {
        let below = black_formula_implied_std_dev(
            OptionType::Call,
            90.0,
            100.0,
            5.0,
            1.0,
            None,
            1e-10,
            0.0,
        );
        assert!(matches!(below, Err(Error::InvalidArgument(_))));
        let above = black_formula_implied_std_dev(
            OptionType::Call,
            90.0,
            100.0,
            100.0,
            1.0,
            None,
            1e-10,
            0.0,
        );
        assert!(matches!(above, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn implied_std_dev_rejects_bad_guess() {
        let price = black_formula(OptionType::Call, 100.0, 100.0, 0.2, 1.0, 0.0).unwrap();
        for guess in [-0.1, 3.5] {
            let result = black_formula_implied_std_dev(
                OptionType::Call,
                100.0,
                100.0,
                price,
                1.0,
                Some(guess),
                1e-10,
                0.0,
            );
            assert!(matches!(result, Err(Error::InvalidArgument(_))), "{guess}");
        }
    }

    #[test]
    fn implied_volatility_scales_by_sqrt_t() {
        let t: Real = 2.0;
        let vol = 0.25;
        let price =
            black_formula(OptionType::Call, 110.0, 100.0, vol * t.sqrt(), 0.9, 0.0).unwrap();
        let implied = implied_volatility(
            OptionType::Call,
            110.0,
            100.0,
            price,
            0.9,
            t,
            Some(0.3),
            1e-12,
            0.0,
        )
        .unwrap();
        assert_abs_diff_eq!(implied, vol, epsilon = 1e-9);
        let approx =
            approximate_implied_volatility(OptionType::Call, 110.0, 100.0, price, 0.9, t, 0.0)
                .unwrap();
        assert_abs_diff_eq!(approx, vol, epsilon = 0.02);
    }

    #[test]
    fn payoff_overloads_delegate() {
        let payoff = PlainVanillaPayoff::new(OptionType::Put, 95.0);
        let price = payoff.black_price(100.0, 0.2, 0.97, 0.0).unwrap();
        assert_eq!(
            price,
            black_formula(OptionType::Put, 95.0, 100.0, 0.2, 0.97, 0.0).unwrap()
        );
        let std_dev = payoff
            .black_implied_std_dev(100.0, price, 0.97, None, 1e-12, 0.0)
            .unwrap();
        assert_abs_diff_eq!(std_dev, 0.2, epsilon = 1e-8);
        assert!(payoff.bachelier_price(100.0, 5.0, 0.97).unwrap() > 0.0);

        let seed = payoff
            .black_implied_std_dev_approximation(100.0, price, 0.97, 0.0)
            .unwrap();
        let direct = black_formula_implied_std_dev_approximation(
            OptionType::Put,
            95.0,
            100.0,
            price,
            0.97,
            0.0,
        );
        assert_eq!(seed, direct.unwrap());
        assert_eq!(
            payoff.black_cash_itm_probability(100.0, 0.2, 0.0).unwrap(),
            black_formula_cash_itm_probability(OptionType::Put, 95.0, 100.0, 0.2, 0.0).unwrap()
        );
        assert_eq!(
            payoff.black_std_dev_derivative(100.0, 0.2, 0.97, 0.0).unwrap(),
            black_formula_std_dev_derivative(95.0, 100.0, 0.2, 0.97, 0.0).unwrap()
        );
    }

    #[test]
    fn payoff_greeks_are_consistent_with_price() {
        let payoff = PlainVanillaPayoff::new(OptionType::Call, 0.012);
        let (forward, s, d) = (0.01, 0.3, 0.98);
        let h = 1e-6;
        let up = payoff.black_price(forward, s + h, d, 0.0).unwrap();
        let down = payoff.black_price(forward, s - h, d, 0.0).unwrap();
        let vega = payoff.black_std_dev_derivative(forward, s, d, 0.0).unwrap();
        assert_abs_diff_eq!(vega, (up - down) / (2.0 * h), epsilon = 1e-9);

        // out of the money call; the put on the same strike takes the rest
        let p = payoff.black_cash_itm_probability(forward, s, 0.0).unwrap();
        assert!(p > 0.0 && p < 0.5, "{p}");
        let put = PlainVanillaPayoff::new(OptionType::Put, 0.012);
        let q = put.black_cash_itm_probability(forward, s, 0.0).unwrap();
        assert_abs_diff_eq!(p + q, 1.0, epsilon = 1e-15);
    }

    #[test]
    fn implied_std_dev_accuracy_holds_for_small_forwards() {
        // vega scales with the forward; the solve must not stop on the seed
        let (strike, forward) = (0.001, 0.001);
        let price = black_formula(OptionType::Call, strike, forward, 0.2, 1.0, 0.0).unwrap();
        let seed = black_formula_implied_std_dev_approximation(
            OptionType::Call,
            strike,
            forward,
            price,
            1.0,
            0.0,
        )
        .unwrap();
        assert!((seed - 0.2).abs() > DEFAULT_IMPLIED_ACCURACY);

        let std_dev = black_formula_implied_std_dev(
            OptionType::Call,
            strike,
            forward,
            price,
            1.0,
            None,
            DEFAULT_IMPLIED_ACCURACY,
            0.0,
        )
        .unwrap();
        assert_abs_diff_eq!(std_dev, 0.2, epsilon = DEFAULT_IMPLIED_ACCURACY);
    }
}
