//! `YieldTermStructure` — yield / interest-rate term structures.
//!
//! Curves implement [`discount_impl`](YieldTermStructure::discount_impl);
//! zero and forward rates (continuously compounded) follow from it.

use crate::day_counter::Date;
use crate::term_structure::TermStructure;
use ql_core::{errors::Result, DiscountFactor, Rate, Real, Time};

/// Small time step used for instantaneous rate computations.
const DT: Real = 1.0e-4;

/// A yield (interest-rate) term structure.
pub trait YieldTermStructure: TermStructure {
    /// Discount factor for time `t`, without range checks.
    fn discount_impl(&self, t: Time) -> Result<DiscountFactor>;

    /// Discount factor for a time.
    fn discount(&self, t: Time) -> Result<DiscountFactor> {
        self.check_range(t)?;
        self.discount_impl(t)
    }

    /// Discount factor for a date.
    fn discount_date(&self, date: Date) -> Result<DiscountFactor> {
        self.discount(self.time_from_reference(date))
    }

    /// Continuously-compounded zero rate for time `t`.
    ///
    /// At `t = 0` the instantaneous rate over the first `DT` is returned.
    fn zero_rate(&self, t: Time) -> Result<Rate> {
        let t_eff = if t == 0.0 { DT } else { t };
        let df = self.discount(t_eff)?;
        Ok(-df.ln() / t_eff)
    }

    /// Continuously-compounded forward rate between `t1` and `t2`.
    ///
    /// When `t1 == t2` the instantaneous forward at `t1` is returned.
    fn forward_rate(&self, t1: Time, t2: Time) -> Result<Rate> {
        ql_core::ensure!(t2 >= t1, "t2 ({t2}) < t1 ({t1})");
        let (t1, t2) = if t2 == t1 {
            ((t1 - 0.5 * DT).max(0.0), t1 + 0.5 * DT)
        } else {
            (t1, t2)
        };
        let df1 = self.discount(t1)?;
        let df2 = self.discount(t2)?;
        Ok((df1 / df2).ln() / (t2 - t1))
    }
}
