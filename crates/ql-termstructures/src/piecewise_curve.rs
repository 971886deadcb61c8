//! `PiecewiseCurve` — a yield curve bootstrapped lazily from market
//! instruments.
//!
//! The curve observes the quotes of its instruments.  A quote change only
//! marks the curve dirty (and tells the curve's own observers); the
//! bootstrap runs on the next read, so any number of quote changes cost a
//! single rebuild.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use ql_quotes::SimpleQuote;
//! use ql_termstructures::{
//!     Actual360, CalibratingInstrument, Date, DepositRateHelper, Discount, PiecewiseCurve,
//!     YieldTermStructure,
//! };
//! use ql_math::LogLinear;
//!
//! let today = Date::from_ymd_opt(2025, 1, 2).unwrap();
//! let quote = Rc::new(SimpleQuote::new(0.04));
//! let maturity = Date::from_ymd_opt(2025, 7, 2).unwrap();
//! let instruments: Vec<Rc<dyn CalibratingInstrument>> = vec![Rc::new(
//!     DepositRateHelper::new(quote.clone(), today, maturity, Actual360).unwrap(),
//! )];
//! let curve = PiecewiseCurve::new(today, instruments, Actual360, Discount, LogLinear);
//! let df = curve.discount(0.25).unwrap();
//! assert!(df < 1.0);
//!
//! quote.set_value(0.05);
//! assert!(curve.discount(0.25).unwrap() < df);
//! ```

use crate::bootstrap::{BootstrapConfig, InterpolatedCurve, IterativeBootstrap};
use crate::bootstrap_traits::CurveTraits;
use crate::day_counter::{Date, DayCounter};
use crate::rate_helpers::CalibratingInstrument;
use crate::term_structure::TermStructure;
use crate::yield_term_structure::YieldTermStructure;
use ql_core::{
    errors::{Error, Result},
    DiscountFactor, LazyObject, LazyState, Observable, ObservableImpl, Observer, Real, Time,
};
use ql_math::Interpolator;
use std::cell::{Cell, Ref, RefCell};
use std::rc::{Rc, Weak};

/// A piecewise yield curve fitted to a set of calibrating instruments.
///
/// The node semantics come from the [`CurveTraits`] (discount factors, zero
/// rates) and the shape between nodes from the [`Interpolator`].  Always
/// handled through `Rc`, since the quotes hold weak references back to it.
#[derive(Debug)]
pub struct PiecewiseCurve {
    reference_date: Date,
    day_counter: Rc<dyn DayCounter>,
    instruments: Vec<Rc<dyn CalibratingInstrument>>,
    bootstrap: IterativeBootstrap,
    extrapolate: Cell<bool>,
    lazy: LazyState,
    observable: ObservableImpl,
    curve: RefCell<Option<InterpolatedCurve>>,
}

impl PiecewiseCurve {
    /// Create a curve with the default bootstrap settings.
    ///
    /// Nothing is computed here; validation and fitting happen on the first
    /// read.
    pub fn new(
        reference_date: Date,
        instruments: Vec<Rc<dyn CalibratingInstrument>>,
        day_counter: impl DayCounter + 'static,
        traits: impl CurveTraits + 'static,
        interpolator: impl Interpolator + 'static,
    ) -> Rc<Self> {
        Self::with_config(
            reference_date,
            instruments,
            day_counter,
            traits,
            interpolator,
            BootstrapConfig::default(),
        )
    }

    /// Create a curve with explicit bootstrap settings.
    pub fn with_config(
        reference_date: Date,
        instruments: Vec<Rc<dyn CalibratingInstrument>>,
        day_counter: impl DayCounter + 'static,
        traits: impl CurveTraits + 'static,
        interpolator: impl Interpolator + 'static,
        config: BootstrapConfig,
    ) -> Rc<Self> {
        let day_counter: Rc<dyn DayCounter> = Rc::new(day_counter);
        let bootstrap = IterativeBootstrap::new(
            reference_date,
            Rc::clone(&day_counter),
            Rc::new(traits),
            Rc::new(interpolator),
        )
        .with_config(config);

        Rc::new_cyclic(|weak: &Weak<Self>| {
            let observer: Weak<dyn Observer> = weak.clone();
            for instrument in &instruments {
                instrument.register_with_quote(observer.clone());
            }
            Self {
                reference_date,
                day_counter,
                instruments,
                bootstrap,
                extrapolate: Cell::new(false),
                lazy: LazyState::new(),
                observable: ObservableImpl::new(),
                curve: RefCell::new(None),
            }
        })
    }

    /// The calibrating instruments, in the order given.
    pub fn instruments(&self) -> &[Rc<dyn CalibratingInstrument>] {
        &self.instruments
    }

    /// The bootstrap settings.
    pub fn config(&self) -> &BootstrapConfig {
        self.bootstrap.config()
    }

    /// Allow or forbid reads past the last node.
    pub fn enable_extrapolation(&self, extrapolate: bool) {
        self.extrapolate.set(extrapolate);
    }

    /// Number of successful bootstraps so far.
    pub fn calculations(&self) -> u64 {
        self.lazy.calculations()
    }

    /// Mark the curve dirty and tell its observers.
    ///
    /// Called by the quotes it observes; nothing is recomputed until the next
    /// read.
    pub fn update(&self) {
        LazyObject::update(self);
    }

    /// Install a freshly bootstrapped node set.
    pub(crate) fn commit_nodes(&self, curve: InterpolatedCurve) {
        tracing::trace!(nodes = curve.dates().len(), "nodes committed");
        self.curve.replace(Some(curve));
    }

    fn fitted(&self) -> Result<Ref<'_, InterpolatedCurve>> {
        self.calculate()?;
        Ref::filter_map(self.curve.borrow(), Option::as_ref)
            .map_err(|_| Error::Runtime("no bootstrapped curve available".into()))
    }

    /// Node dates, node 0 being the reference date.
    pub fn dates(&self) -> Result<Vec<Date>> {
        Ok(self.fitted()?.dates().to_vec())
    }

    /// Node times.
    pub fn times(&self) -> Result<Vec<Time>> {
        Ok(self.fitted()?.times().to_vec())
    }

    /// Node values, in the units of the curve traits.
    pub fn data(&self) -> Result<Vec<Real>> {
        Ok(self.fitted()?.data().to_vec())
    }

    /// `(date, value)` pairs for every node.
    pub fn nodes(&self) -> Result<Vec<(Date, Real)>> {
        let curve = self.fitted()?;
        Ok(curve
            .dates()
            .iter()
            .copied()
            .zip(curve.data().iter().copied())
            .collect())
    }

    /// Interpolated node-space value at `t` (a discount factor or a zero
    /// rate, depending on the traits).
    pub fn value_at(&self, t: Time) -> Result<Real> {
        self.check_range(t)?;
        Ok(self.fitted()?.value(t))
    }
}

impl LazyObject for PiecewiseCurve {
    fn perform_calculations(&self) -> Result<()> {
        self.curve.replace(None);
        let curve = self.bootstrap.run(&self.instruments)?;
        self.commit_nodes(curve);
        Ok(())
    }

    fn lazy_state(&self) -> &LazyState {
        &self.lazy
    }

    fn dependents(&self) -> Option<&ObservableImpl> {
        Some(&self.observable)
    }
}

impl Observer for PiecewiseCurve {
    fn update(&self) {
        LazyObject::update(self);
    }
}

impl Observable for PiecewiseCurve {
    fn register_observer(&self, observer: Weak<dyn Observer>) {
        self.observable.register(observer);
    }

    fn unregister_observer(&self, observer: &Weak<dyn Observer>) {
        self.observable.unregister(observer);
    }

    fn notify_observers(&self) {
        self.observable.notify();
    }
}

impl TermStructure for PiecewiseCurve {
    fn reference_date(&self) -> Date {
        self.reference_date
    }

    fn day_counter(&self) -> &dyn DayCounter {
        &*self.day_counter
    }

    fn max_date(&self) -> Result<Date> {
        self.fitted()?.max_date()
    }

    fn max_time(&self) -> Result<Time> {
        self.fitted()?.max_time()
    }

    fn allows_extrapolation(&self) -> bool {
        self.extrapolate.get()
    }
}

impl YieldTermStructure for PiecewiseCurve {
    fn discount_impl(&self, t: Time) -> Result<DiscountFactor> {
        self.fitted()?.discount_impl(t)
    }
}
