//! `TermStructure` — base trait for all term structures.
//!
//! Every term structure has a **reference date**, a **day counter**, and a
//! **maximum date** (the furthest point it covers without extrapolation).
//! Reads are fallible: a lazily bootstrapped curve may fail to build.

use crate::day_counter::{Date, DayCounter};
use ql_core::{errors::Result, Time};

/// Relative slack when comparing a time against the maximum time.
const TIME_TOLERANCE: Time = 1.0e-12;

/// Base trait for all term structures.
pub trait TermStructure: std::fmt::Debug {
    /// The date at which discount = 1.0 and from which time is measured.
    fn reference_date(&self) -> Date;

    /// The day counter used for date → time-fraction conversions.
    fn day_counter(&self) -> &dyn DayCounter;

    /// The latest date for which the curve can be used.
    fn max_date(&self) -> Result<Date>;

    /// The latest time for which the curve can be used.
    fn max_time(&self) -> Result<Time> {
        Ok(self.time_from_reference(self.max_date()?))
    }

    /// Whether reads past [`max_time`](Self::max_time) are allowed.
    fn allows_extrapolation(&self) -> bool {
        false
    }

    /// Convert a date to a year fraction relative to the reference date.
    fn time_from_reference(&self, date: Date) -> Time {
        self.day_counter()
            .year_fraction(self.reference_date(), date)
    }

    /// Fail unless `t` lies in the range the curve covers.
    fn check_range(&self, t: Time) -> Result<()> {
        ql_core::ensure!(t >= 0.0, "negative time ({t}) given");
        if !self.allows_extrapolation() {
            let max_time = self.max_time()?;
            ql_core::ensure!(
                t - max_time <= TIME_TOLERANCE * max_time.max(1.0),
                "time ({t}) is past max curve time ({max_time})"
            );
        }
        Ok(())
    }
}
