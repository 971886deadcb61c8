//! Calibrating instruments for yield-curve bootstrapping.
//!
//! A *rate helper* pairs an observable market quote (a deposit rate, FRA
//! rate, futures price or par swap rate) with the conventions needed to
//! reprice it off a curve.  The bootstrapper adjusts the curve node at each
//! helper's pillar date until the helper's implied quote matches its market
//! quote.
//!
//! Helpers hold their quotes through `Rc<dyn Quote>`: the same quote object
//! is shared with the market-data side, and a curve built on the helper
//! registers with it to learn about changes.

use crate::day_counter::{Date, DayCounter};
use crate::yield_term_structure::YieldTermStructure;
use ql_core::{
    errors::{Error, Result},
    Observable, Observer, Rate, Real, Time,
};
use ql_quotes::{Quote, SimpleQuote};
use std::rc::{Rc, Weak};

// ── CalibratingInstrument trait ───────────────────────────────────────────────

/// A market instrument that constrains a curve at its pillar date.
pub trait CalibratingInstrument: std::fmt::Debug {
    /// The pillar (maturity) date: the latest date this instrument
    /// constrains.
    fn pillar_date(&self) -> Date;

    /// The market quote.
    fn quote(&self) -> &Rc<dyn Quote>;

    /// The quote the instrument would have if `curve` were the market curve.
    fn implied_quote(&self, curve: &dyn YieldTermStructure) -> Result<Real>;

    /// The current market value of the quote.
    ///
    /// # Errors
    /// [`Error::NullValue`] if the quote is not set.
    fn quote_value(&self) -> Result<Real> {
        self.quote().value().ok_or_else(|| {
            Error::NullValue(format!(
                "no quote value for instrument maturing on {}",
                self.pillar_date()
            ))
        })
    }

    /// Market quote minus implied quote; zero when `curve` reprices the
    /// instrument.
    fn quote_error(&self, curve: &dyn YieldTermStructure) -> Result<Real> {
        Ok(self.quote_value()? - self.implied_quote(curve)?)
    }

    /// Time from `reference` to the pillar date.
    fn maturity_time(&self, reference: Date, day_counter: &dyn DayCounter) -> Time {
        day_counter.year_fraction(reference, self.pillar_date())
    }

    /// Register `observer` with the quote so it is invalidated on changes.
    fn register_with_quote(&self, observer: Weak<dyn Observer>) {
        self.quote().register_observer(observer);
    }
}

fn simple_forward_rate(
    curve: &dyn YieldTermStructure,
    start: Date,
    end: Date,
    tau: Time,
) -> Result<Rate> {
    let df_start = curve.discount_date(start)?;
    let df_end = curve.discount_date(end)?;
    Ok((df_start / df_end - 1.0) / tau)
}

// ── DepositRateHelper ─────────────────────────────────────────────────────────

/// A deposit (money-market) rate helper.
///
/// The implied quote is the simple forward rate over `[settlement,
/// maturity]`.
#[derive(Debug)]
pub struct DepositRateHelper {
    quote: Rc<dyn Quote>,
    settlement_date: Date,
    maturity_date: Date,
    day_counter: Box<dyn DayCounter>,
}

impl DepositRateHelper {
    /// Create a deposit rate helper from explicit settlement and maturity
    /// dates.
    ///
    /// # Errors
    /// Returns an error unless the accrual period is positive.
    pub fn new(
        quote: Rc<dyn Quote>,
        settlement_date: Date,
        maturity_date: Date,
        day_counter: impl DayCounter + 'static,
    ) -> Result<Self> {
        ql_core::ensure!(
            day_counter.year_fraction(settlement_date, maturity_date) > 0.0,
            "deposit maturity ({maturity_date}) must follow settlement ({settlement_date})"
        );
        Ok(Self {
            quote,
            settlement_date,
            maturity_date,
            day_counter: Box::new(day_counter),
        })
    }

    /// Create a deposit helper on a fixed rate (a fresh quote).
    pub fn from_rate(
        rate: Rate,
        settlement_date: Date,
        maturity_date: Date,
        day_counter: impl DayCounter + 'static,
    ) -> Result<Self> {
        Self::new(
            Rc::new(SimpleQuote::new(rate)),
            settlement_date,
            maturity_date,
            day_counter,
        )
    }

    /// The settlement date of the deposit.
    pub fn settlement_date(&self) -> Date {
        self.settlement_date
    }

    /// The maturity date of the deposit.
    pub fn maturity_date(&self) -> Date {
        self.maturity_date
    }
}

impl CalibratingInstrument for DepositRateHelper {
    fn pillar_date(&self) -> Date {
        self.maturity_date
    }

    fn quote(&self) -> &Rc<dyn Quote> {
        &self.quote
    }

    fn implied_quote(&self, curve: &dyn YieldTermStructure) -> Result<Real> {
        // R = (P(t_settle) / P(t_maturity) - 1) / tau
        let tau = self
            .day_counter
            .year_fraction(self.settlement_date, self.maturity_date);
        simple_forward_rate(curve, self.settlement_date, self.maturity_date, tau)
    }
}

// ── FraRateHelper ─────────────────────────────────────────────────────────────

/// A forward-rate-agreement (FRA) rate helper.
///
/// The implied quote is the simple forward rate between the FRA's value
/// date and maturity.
#[derive(Debug)]
pub struct FraRateHelper {
    quote: Rc<dyn Quote>,
    value_date: Date,
    maturity_date: Date,
    day_counter: Box<dyn DayCounter>,
}

impl FraRateHelper {
    /// Create a FRA rate helper from explicit value and maturity dates.
    pub fn new(
        quote: Rc<dyn Quote>,
        value_date: Date,
        maturity_date: Date,
        day_counter: impl DayCounter + 'static,
    ) -> Result<Self> {
        ql_core::ensure!(
            day_counter.year_fraction(value_date, maturity_date) > 0.0,
            "FRA maturity ({maturity_date}) must follow value date ({value_date})"
        );
        Ok(Self {
            quote,
            value_date,
            maturity_date,
            day_counter: Box::new(day_counter),
        })
    }

    /// The FRA value (start) date.
    pub fn value_date(&self) -> Date {
        self.value_date
    }

    /// The FRA maturity (end) date.
    pub fn maturity_date(&self) -> Date {
        self.maturity_date
    }
}

impl CalibratingInstrument for FraRateHelper {
    fn pillar_date(&self) -> Date {
        self.maturity_date
    }

    fn quote(&self) -> &Rc<dyn Quote> {
        &self.quote
    }

    fn implied_quote(&self, curve: &dyn YieldTermStructure) -> Result<Real> {
        let tau = self
            .day_counter
            .year_fraction(self.value_date, self.maturity_date);
        simple_forward_rate(curve, self.value_date, self.maturity_date, tau)
    }
}

// ── FuturesRateHelper ─────────────────────────────────────────────────────────

/// An interest-rate-futures helper (e.g. SOFR, Euribor futures).
///
/// The quote is the futures *price* (`100 − rate` in percent); the implied
/// quote is `100·(1 − (F + c))` where `F` is the simple forward rate over
/// the contract period and `c` the convexity adjustment.
#[derive(Debug)]
pub struct FuturesRateHelper {
    quote: Rc<dyn Quote>,
    value_date: Date,
    maturity_date: Date,
    day_counter: Box<dyn DayCounter>,
    convexity_adjustment: Real,
}

impl FuturesRateHelper {
    /// Create a futures helper quoted by price.
    pub fn new(
        price: Rc<dyn Quote>,
        value_date: Date,
        maturity_date: Date,
        day_counter: impl DayCounter + 'static,
        convexity_adjustment: Real,
    ) -> Result<Self> {
        ql_core::ensure!(
            day_counter.year_fraction(value_date, maturity_date) > 0.0,
            "futures maturity ({maturity_date}) must follow value date ({value_date})"
        );
        ql_core::ensure!(
            convexity_adjustment >= 0.0,
            "negative convexity adjustment ({convexity_adjustment})"
        );
        Ok(Self {
            quote: price,
            value_date,
            maturity_date,
            day_counter: Box::new(day_counter),
            convexity_adjustment,
        })
    }

    /// The convexity adjustment.
    pub fn convexity_adjustment(&self) -> Real {
        self.convexity_adjustment
    }
}

impl CalibratingInstrument for FuturesRateHelper {
    fn pillar_date(&self) -> Date {
        self.maturity_date
    }

    fn quote(&self) -> &Rc<dyn Quote> {
        &self.quote
    }

    fn implied_quote(&self, curve: &dyn YieldTermStructure) -> Result<Real> {
        let tau = self
            .day_counter
            .year_fraction(self.value_date, self.maturity_date);
        let forward = simple_forward_rate(curve, self.value_date, self.maturity_date, tau)?;
        Ok(100.0 * (1.0 - (forward + self.convexity_adjustment)))
    }
}

// ── SwapRateHelper ────────────────────────────────────────────────────────────

/// A par-swap rate helper.
///
/// The implied quote is the par rate `(P(start) − P(end)) / annuity` on the
/// fixed-leg payment dates, the floating leg being worth par.
#[derive(Debug)]
pub struct SwapRateHelper {
    quote: Rc<dyn Quote>,
    /// Fixed-leg dates: start date followed by every payment date.
    fixed_dates: Vec<Date>,
    fixed_day_counter: Box<dyn DayCounter>,
}

impl SwapRateHelper {
    /// Create a swap-rate helper from the fixed-leg dates (start date, then
    /// every payment date; the last one is the maturity).
    pub fn new(
        quote: Rc<dyn Quote>,
        fixed_dates: Vec<Date>,
        fixed_day_counter: impl DayCounter + 'static,
    ) -> Result<Self> {
        ql_core::ensure!(
            fixed_dates.len() >= 2,
            "a swap needs a start date and at least one payment date"
        );
        ql_core::ensure!(
            fixed_dates.windows(2).all(|w| w[0] < w[1]),
            "fixed-leg dates must be strictly increasing"
        );
        Ok(Self {
            quote,
            fixed_dates,
            fixed_day_counter: Box::new(fixed_day_counter),
        })
    }

    /// The fixed-leg dates.
    pub fn fixed_dates(&self) -> &[Date] {
        &self.fixed_dates
    }

    fn annuity(&self, curve: &dyn YieldTermStructure) -> Result<Real> {
        self.fixed_dates.windows(2).try_fold(0.0, |acc, w| {
            let delta = self.fixed_day_counter.year_fraction(w[0], w[1]);
            Ok(acc + delta * curve.discount_date(w[1])?)
        })
    }
}

impl CalibratingInstrument for SwapRateHelper {
    fn pillar_date(&self) -> Date {
        self.fixed_dates[self.fixed_dates.len() - 1]
    }

    fn quote(&self) -> &Rc<dyn Quote> {
        &self.quote
    }

    fn implied_quote(&self, curve: &dyn YieldTermStructure) -> Result<Real> {
        let start = self.fixed_dates[0];
        let df_start = curve.discount_date(start)?;
        let df_end = curve.discount_date(self.pillar_date())?;
        Ok((df_start - df_end) / self.annuity(curve)?)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::day_counter::{Actual360, Actual365Fixed};
    use crate::term_structure::TermStructure;
    use approx::assert_abs_diff_eq;
    use ql_core::DiscountFactor;

    /// A flat continuously-compounded curve, enough to exercise the helpers.
    #[derive(Debug)]
    struct FlatCurve {
        reference_date: Date,
        rate: Rate,
    }

    impl TermStructure for FlatCurve {
        fn reference_date(&self) -> Date {
            self.reference_date
        }

        fn day_counter(&self) -> &dyn DayCounter {
            &Actual365Fixed
        }

        fn max_date(&self) -> Result<Date> {
            Ok(Date::MAX)
        }

        fn allows_extrapolation(&self) -> bool {
            true
        }
    }

    impl YieldTermStructure for FlatCurve {
        fn discount_impl(&self, t: Time) -> Result<DiscountFactor> {
            Ok((-self.rate * t).exp())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    fn flat(rate: Rate) -> FlatCurve {
        FlatCurve {
            reference_date: date(2025, 1, 2),
            rate,
        }
    }

    #[test]
    fn deposit_implied_quote_on_flat_curve() {
        let settle = date(2025, 1, 2);
        let mat = date(2025, 4, 2);
        let helper = DepositRateHelper::from_rate(0.0, settle, mat, Actual360).unwrap();
        let implied = helper.implied_quote(&flat(0.05)).unwrap();

        let t = Actual365Fixed.year_fraction(settle, mat);
        let tau = Actual360.year_fraction(settle, mat);
        let expected = ((0.05 * t).exp() - 1.0) / tau;
        assert_abs_diff_eq!(implied, expected, epsilon = 1e-12);
        assert_abs_diff_eq!(helper.quote_error(&flat(0.05)).unwrap(), -expected, epsilon = 1e-12);
    }

    #[test]
    fn fra_implied_quote_on_flat_curve() {
        let start = date(2025, 4, 2);
        let end = date(2025, 7, 2);
        let helper =
            FraRateHelper::new(Rc::new(SimpleQuote::new(0.03)), start, end, Actual360).unwrap();
        let implied = helper.implied_quote(&flat(0.03)).unwrap();

        let dt = Actual365Fixed.year_fraction(start, end);
        let tau = Actual360.year_fraction(start, end);
        assert_abs_diff_eq!(implied, ((0.03 * dt).exp() - 1.0) / tau, epsilon = 1e-12);
    }

    #[test]
    fn futures_implied_price() {
        let start = date(2025, 3, 19);
        let end = date(2025, 6, 18);
        let helper = FuturesRateHelper::new(
            Rc::new(SimpleQuote::new(96.0)),
            start,
            end,
            Actual360,
            0.001,
        )
        .unwrap();
        let implied = helper.implied_quote(&flat(0.04)).unwrap();
        let dt = Actual365Fixed.year_fraction(start, end);
        let tau = Actual360.year_fraction(start, end);
        let forward = ((0.04 * dt).exp() - 1.0) / tau;
        assert_abs_diff_eq!(implied, 100.0 * (1.0 - forward - 0.001), epsilon = 1e-10);
        assert_eq!(helper.quote_value().unwrap(), 96.0);
    }

    #[test]
    fn swap_par_rate_on_flat_curve() {
        let dates = vec![
            date(2025, 1, 2),
            date(2026, 1, 2),
            date(2027, 1, 4),
            date(2028, 1, 3),
        ];
        let helper =
            SwapRateHelper::new(Rc::new(SimpleQuote::new(0.04)), dates, Actual365Fixed).unwrap();
        let implied = helper.implied_quote(&flat(0.04)).unwrap();
        // annual compounding of a 4% continuous rate
        assert!((implied - 0.04).abs() < 0.002, "implied par rate {implied}");
        assert_eq!(helper.pillar_date(), date(2028, 1, 3));
    }

    #[test]
    fn empty_quote_is_null_value() {
        let helper = DepositRateHelper::new(
            Rc::new(SimpleQuote::empty()),
            date(2025, 1, 2),
            date(2025, 4, 2),
            Actual360,
        )
        .unwrap();
        assert!(matches!(helper.quote_value(), Err(Error::NullValue(_))));
    }

    #[test]
    fn invalid_schedules_rejected() {
        let d = date(2025, 1, 2);
        assert!(DepositRateHelper::from_rate(0.01, d, d, Actual360).is_err());
        assert!(SwapRateHelper::new(Rc::new(SimpleQuote::new(0.01)), vec![d], Actual360).is_err());
    }
}
