//! Sequential bootstrap of a piecewise curve.
//!
//! Instruments are sorted by maturity; node 0 sits at the reference date and
//! node `i` at the maturity of the `i`-th instrument.  Each node is solved in
//! turn with the safeguarded solver so that its instrument reprices, with
//! every earlier node already fixed.  Interpolators are local, so a later
//! node never moves an earlier instrument and one pass suffices.

use crate::bootstrap_traits::CurveTraits;
use crate::day_counter::{Date, DayCounter};
use crate::rate_helpers::CalibratingInstrument;
use crate::term_structure::TermStructure;
use crate::yield_term_structure::YieldTermStructure;
use ql_core::{
    errors::{Error, Result},
    DiscountFactor, Real, Time,
};
use ql_math::{Interpolation1D, Interpolator, ObjectiveFunction, SafeguardedSolver, SolverConfig};
use std::cell::RefCell;
use std::rc::Rc;

/// Default accuracy on the quote error of each instrument.
pub const DEFAULT_BOOTSTRAP_ACCURACY: Real = 1.0e-12;

/// Smallest node value searched when the interpolator needs positive nodes.
const MIN_POSITIVE_NODE: Real = 1.0e-12;

/// Bootstrap settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BootstrapConfig {
    /// Solver accuracy for each node.
    pub accuracy: Real,
    /// Evaluation cap for each node.
    pub max_evaluations: usize,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            accuracy: DEFAULT_BOOTSTRAP_ACCURACY,
            max_evaluations: ql_math::solvers1d::DEFAULT_MAX_EVALUATIONS,
        }
    }
}

impl BootstrapConfig {
    /// Set the per-node accuracy.
    pub fn with_accuracy(mut self, accuracy: Real) -> Self {
        self.accuracy = accuracy;
        self
    }

    /// Set the per-node evaluation cap.
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }
}

// ── InterpolatedCurve ─────────────────────────────────────────────────────────

/// A yield curve interpolated over a fixed node set.
///
/// Produced by the bootstrap: trial curves during the solve (extrapolating,
/// covering the nodes fixed so far) and the final curve (all nodes).
#[derive(Debug)]
pub struct InterpolatedCurve {
    reference_date: Date,
    day_counter: Rc<dyn DayCounter>,
    traits: Rc<dyn CurveTraits>,
    dates: Vec<Date>,
    times: Vec<Time>,
    data: Vec<Real>,
    interpolation: Box<dyn Interpolation1D>,
    extrapolate: bool,
}

impl InterpolatedCurve {
    /// Build a curve from nodes; `times[i]` is the time of `dates[i]` from
    /// the reference date.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if the node vectors differ in length or
    /// hold fewer nodes than the interpolator needs; otherwise whatever the
    /// interpolator reports for the node set.
    pub fn new(
        reference_date: Date,
        day_counter: Rc<dyn DayCounter>,
        traits: Rc<dyn CurveTraits>,
        interpolator: &dyn Interpolator,
        dates: Vec<Date>,
        times: Vec<Time>,
        data: Vec<Real>,
    ) -> Result<Self> {
        ql_core::ensure!(
            dates.len() == times.len() && dates.len() == data.len(),
            "{} dates, {} times and {} node values",
            dates.len(),
            times.len(),
            data.len()
        );
        ql_core::ensure!(
            dates.len() >= interpolator.required_points(),
            "{} nodes given, the interpolator needs at least {}",
            dates.len(),
            interpolator.required_points()
        );
        let interpolation = interpolator.build(&times, &data)?;
        Ok(Self {
            reference_date,
            day_counter,
            traits,
            dates,
            times,
            data,
            interpolation,
            extrapolate: false,
        })
    }

    /// Allow or forbid reads past the last node.
    pub fn with_extrapolation(mut self, extrapolate: bool) -> Self {
        self.extrapolate = extrapolate;
        self
    }

    /// Node dates, node 0 being the reference date.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Node times.
    pub fn times(&self) -> &[Time] {
        &self.times
    }

    /// Node values, in the units of the curve traits.
    pub fn data(&self) -> &[Real] {
        &self.data
    }

    /// Interpolated node-space value at `t`.
    pub fn value(&self, t: Time) -> Real {
        self.interpolation.value(t)
    }
}

impl TermStructure for InterpolatedCurve {
    fn reference_date(&self) -> Date {
        self.reference_date
    }

    fn day_counter(&self) -> &dyn DayCounter {
        &*self.day_counter
    }

    fn max_date(&self) -> Result<Date> {
        self.dates
            .last()
            .copied()
            .ok_or_else(|| Error::Runtime("curve has no nodes".into()))
    }

    fn max_time(&self) -> Result<Time> {
        self.times
            .last()
            .copied()
            .ok_or_else(|| Error::Runtime("curve has no nodes".into()))
    }

    fn allows_extrapolation(&self) -> bool {
        self.extrapolate
    }
}

impl YieldTermStructure for InterpolatedCurve {
    fn discount_impl(&self, t: Time) -> Result<DiscountFactor> {
        Ok(self.traits.discount(self.interpolation.value(t), t))
    }
}

// ── Objective ─────────────────────────────────────────────────────────────────

/// Quote error of one instrument as a function of its node value.
///
/// Instrument failures cannot cross the solver as errors; they turn into a
/// NaN (which stops the solver) and are kept for the caller to report.
struct BootstrapError<'a> {
    bootstrap: &'a IterativeBootstrap,
    instrument: &'a dyn CalibratingInstrument,
    market_quote: Real,
    node: usize,
    dates: &'a [Date],
    times: &'a [Time],
    data: RefCell<Vec<Real>>,
    failure: RefCell<Option<Error>>,
}

impl BootstrapError<'_> {
    fn quote_error(&self, x: Real) -> Result<Real> {
        let mut data = self.data.borrow_mut();
        self.bootstrap.traits.update_guess(&mut data, x, self.node);
        let trial = self
            .bootstrap
            .curve(
                self.dates[..=self.node].to_vec(),
                self.times[..=self.node].to_vec(),
                data[..=self.node].to_vec(),
            )?
            .with_extrapolation(true);
        Ok(self.market_quote - self.instrument.implied_quote(&trial)?)
    }
}

impl ObjectiveFunction for BootstrapError<'_> {
    fn value(&self, x: Real) -> Real {
        match self.quote_error(x) {
            Ok(error) => error,
            Err(e) => {
                *self.failure.borrow_mut() = Some(e);
                Real::NAN
            }
        }
    }
}

// ── IterativeBootstrap ────────────────────────────────────────────────────────

/// Fits one node per instrument, earliest maturity first.
#[derive(Debug, Clone)]
pub struct IterativeBootstrap {
    reference_date: Date,
    day_counter: Rc<dyn DayCounter>,
    traits: Rc<dyn CurveTraits>,
    interpolator: Rc<dyn Interpolator>,
    config: BootstrapConfig,
}

impl IterativeBootstrap {
    /// Create a bootstrapper for curves of the given kind.
    pub fn new(
        reference_date: Date,
        day_counter: Rc<dyn DayCounter>,
        traits: Rc<dyn CurveTraits>,
        interpolator: Rc<dyn Interpolator>,
    ) -> Self {
        Self {
            reference_date,
            day_counter,
            traits,
            interpolator,
            config: BootstrapConfig::default(),
        }
    }

    /// Replace the solver settings.
    pub fn with_config(mut self, config: BootstrapConfig) -> Self {
        self.config = config;
        self
    }

    /// The solver settings.
    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    fn curve(
        &self,
        dates: Vec<Date>,
        times: Vec<Time>,
        data: Vec<Real>,
    ) -> Result<InterpolatedCurve> {
        InterpolatedCurve::new(
            self.reference_date,
            Rc::clone(&self.day_counter),
            Rc::clone(&self.traits),
            &*self.interpolator,
            dates,
            times,
            data,
        )
    }

    /// Instruments sorted by maturity, after the structural checks.
    fn sorted<'a>(
        &self,
        instruments: &'a [Rc<dyn CalibratingInstrument>],
    ) -> Result<Vec<&'a dyn CalibratingInstrument>> {
        ql_core::ensure!(
            !instruments.is_empty(),
            "no calibrating instruments given"
        );
        let mut sorted: Vec<&dyn CalibratingInstrument> =
            instruments.iter().map(|i| &**i).collect();
        sorted.sort_by_key(|i| i.pillar_date());

        let first = sorted[0].pillar_date();
        ql_core::ensure!(
            first > self.reference_date,
            "first instrument maturity ({first}) is not after the reference date ({})",
            self.reference_date
        );
        for pair in sorted.windows(2) {
            let maturity = pair[1].pillar_date();
            if pair[0].pillar_date() == maturity {
                return Err(Error::DuplicateMaturity {
                    maturity: maturity.to_string(),
                    time: pair[1].maturity_time(self.reference_date, &*self.day_counter),
                });
            }
        }
        Ok(sorted)
    }

    /// Fit the curve to `instruments`.
    ///
    /// # Errors
    /// * [`Error::InvalidArgument`] for an empty instrument set or a maturity
    ///   not after the reference date.
    /// * [`Error::DuplicateMaturity`] if two instruments share a maturity.
    /// * [`Error::NullValue`] if a quote is unset.
    /// * Solver and instrument errors, tagged with the failing instrument.
    pub fn run(
        &self,
        instruments: &[Rc<dyn CalibratingInstrument>],
    ) -> Result<InterpolatedCurve> {
        let sorted = self.sorted(instruments)?;
        let quotes = sorted
            .iter()
            .map(|i| i.quote_value())
            .collect::<Result<Vec<_>>>()?;

        let mut dates = Vec::with_capacity(sorted.len() + 1);
        dates.push(self.reference_date);
        dates.extend(sorted.iter().map(|i| i.pillar_date()));
        let mut times = Vec::with_capacity(dates.len());
        times.push(0.0);
        times.extend(
            sorted
                .iter()
                .map(|i| i.maturity_time(self.reference_date, &*self.day_counter)),
        );
        let mut data = vec![self.traits.initial_value(); dates.len()];

        tracing::debug!(
            traits = self.traits.name(),
            nodes = dates.len(),
            reference_date = %self.reference_date,
            "bootstrap started"
        );

        let solver = SafeguardedSolver::new(
            SolverConfig::default().with_max_evaluations(self.config.max_evaluations),
        );
        for (k, (instrument, &market_quote)) in sorted.iter().zip(&quotes).enumerate() {
            let i = k + 1;
            let mut min = self.traits.min_value_after(i, &data, &times);
            if self.interpolator.requires_positive_values() {
                min = min.max(MIN_POSITIVE_NODE);
            }
            let max = self.traits.max_value_after(i, &data, &times);
            let guess = self.traits.guess(i, &data, &times).clamp(min, max);

            let objective = BootstrapError {
                bootstrap: self,
                instrument: *instrument,
                market_quote,
                node: i,
                dates: &dates,
                times: &times,
                data: RefCell::new(data.clone()),
                failure: RefCell::new(None),
            };
            let root = solver
                .solve(&objective, self.config.accuracy, guess, min, max)
                .map_err(|e| {
                    let cause = objective.failure.borrow_mut().take().unwrap_or(e);
                    let e = cause.with_context(format!(
                        "instrument {k} maturing on {} (t = {:.6})",
                        dates[i], times[i]
                    ));
                    tracing::debug!(node = i, error = %e, "bootstrap failed");
                    e
                })?;
            self.traits.update_guess(&mut data, root, i);
            tracing::trace!(node = i, time = times[i], value = root, "node solved");
        }

        let curve = self.curve(dates, times, data)?;
        tracing::debug!(
            traits = self.traits.name(),
            nodes = curve.dates().len(),
            "bootstrap finished"
        );
        Ok(curve)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
