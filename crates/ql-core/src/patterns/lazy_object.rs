//! LazyObject pattern.
//!
//! A `LazyObject` caches an expensive computation and recalculates only when
//! one of its inputs has changed *and* somebody asks for a result.  Marking
//! dirty ([`LazyObject::update`]) is cheap and happens on every upstream
//! notification; recomputation ([`LazyObject::calculate`]) is deferred to the
//! next read, so any number of upstream changes coalesce into one
//! recalculation.
//!
//! The bookkeeping uses interior mutability (`Cell`) so that the calculation
//! can be triggered through an `&self` reference.

use crate::errors::{Error, Result};
use crate::patterns::observable::ObservableImpl;
use std::cell::Cell;

/// Where a lazy object stands in its recomputation cycle.
///
/// `Dirty → InProgress → Clean` on success, `Dirty → InProgress → Failed`
/// when [`LazyObject::perform_calculations`] returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalculationState {
    /// Inputs changed (or nothing was ever computed); results must not be read.
    Dirty,
    /// `perform_calculations` is running.
    InProgress,
    /// Results are consistent with the current inputs.
    Clean,
    /// The last recalculation failed; results must not be read.
    Failed,
}

/// Bookkeeping fields required by [`LazyObject`].
///
/// Embed this in your struct and return it from
/// [`LazyObject::lazy_state`].
#[derive(Debug)]
pub struct LazyState {
    state: Cell<CalculationState>,
    freeze_count: Cell<u32>,
    calculations: Cell<u64>,
}

impl LazyState {
    /// Create a new `LazyState`; the object starts dirty.
    pub fn new() -> Self {
        Self {
            state: Cell::new(CalculationState::Dirty),
            freeze_count: Cell::new(0),
            calculations: Cell::new(0),
        }
    }

    /// Current state.
    pub fn state(&self) -> CalculationState {
        self.state.get()
    }

    /// Number of successful recalculations performed so far.
    pub fn calculations(&self) -> u64 {
        self.calculations.get()
    }

    /// Mark the results stale.  Returns `true` if they were clean before,
    /// i.e. if the change must be forwarded to dependents.
    fn invalidate(&self) -> bool {
        match self.state.get() {
            CalculationState::Clean => {
                self.state.set(CalculationState::Dirty);
                true
            }
            CalculationState::Failed => {
                self.state.set(CalculationState::Dirty);
                false
            }
            CalculationState::Dirty | CalculationState::InProgress => false,
        }
    }
}

impl Default for LazyState {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for objects that lazily compute and cache their results.
///
/// Implementors provide [`perform_calculations`][Self::perform_calculations]
/// and [`lazy_state`][Self::lazy_state]; the provided methods handle the
/// dirty flag, freezing, and failure bookkeeping.
///
/// # Example
/// ```
/// use std::cell::Cell;
/// use ql_core::patterns::lazy_object::{LazyObject, LazyState};
///
/// struct MyLazy {
///     state: LazyState,
///     result: Cell<f64>,
/// }
///
/// impl LazyObject for MyLazy {
///     fn perform_calculations(&self) -> ql_core::errors::Result<()> {
///         self.result.set(42.0);
///         Ok(())
///     }
///     fn lazy_state(&self) -> &LazyState { &self.state }
/// }
///
/// let obj = MyLazy { state: LazyState::new(), result: Cell::new(0.0) };
/// assert!(!obj.is_calculated());
/// obj.calculate().unwrap();
/// assert_eq!(obj.result.get(), 42.0);
/// assert!(obj.is_calculated());
/// ```
pub trait LazyObject {
    /// Perform the actual (expensive) calculation.
    ///
    /// Called by [`calculate`][Self::calculate] when the cache is stale.
    fn perform_calculations(&self) -> Result<()>;

    /// The embedded bookkeeping.
    fn lazy_state(&self) -> &LazyState;

    /// Observers to forward invalidations to, if this object has dependents.
    fn dependents(&self) -> Option<&ObservableImpl> {
        None
    }

    /// Ensure results are up-to-date.
    ///
    /// A frozen object that has results keeps serving them; a frozen object
    /// that never calculated successfully still calculates once.
    fn calculate(&self) -> Result<()> {
        let lazy = self.lazy_state();
        match lazy.state.get() {
            CalculationState::Clean => Ok(()),
            CalculationState::InProgress => Err(Error::Runtime(
                "recursive read of an object whose calculation is in progress".into(),
            )),
            CalculationState::Dirty | CalculationState::Failed => {
                if self.is_frozen() && lazy.calculations.get() > 0 {
                    return Ok(());
                }
                lazy.state.set(CalculationState::InProgress);
                match self.perform_calculations() {
                    Ok(()) => {
                        lazy.state.set(CalculationState::Clean);
                        lazy.calculations.set(lazy.calculations.get() + 1);
                        Ok(())
                    }
                    Err(e) => {
                        lazy.state.set(CalculationState::Failed);
                        Err(e)
                    }
                }
            }
        }
    }

    /// Mark the cached result as stale without triggering a recalculation,
    /// and forward the notification to dependents if they may hold results
    /// derived from ours.
    fn update(&self) {
        if self.lazy_state().invalidate() && !self.is_frozen() {
            if let Some(dependents) = self.dependents() {
                dependents.notify();
            }
        }
    }

    /// Force a recalculation, even if frozen.
    fn recalculate(&self) -> Result<()> {
        let lazy = self.lazy_state();
        let frozen = lazy.freeze_count.replace(0);
        lazy.invalidate();
        let result = self.calculate();
        lazy.freeze_count.set(frozen);
        if let Some(dependents) = self.dependents() {
            dependents.notify();
        }
        result
    }

    /// Prevent automatic recalculation until [`unfreeze`][Self::unfreeze] is
    /// called.
    fn freeze(&self) {
        let count = &self.lazy_state().freeze_count;
        count.set(count.get() + 1);
    }

    /// Undo one call to [`freeze`][Self::freeze].
    ///
    /// When the freeze count reaches zero dependents are notified, since
    /// they may have been computed from stale data.
    fn unfreeze(&self) {
        let count = &self.lazy_state().freeze_count;
        if count.get() > 0 {
            count.set(count.get() - 1);
            if count.get() == 0 {
                if let Some(dependents) = self.dependents() {
                    dependents.notify();
                }
            }
        }
    }

    /// Return `true` if the cache is currently valid.
    fn is_calculated(&self) -> bool {
        self.lazy_state().state.get() == CalculationState::Clean
    }

    /// Return `true` if recalculation is currently deferred.
    fn is_frozen(&self) -> bool {
        self.lazy_state().freeze_count.get() > 0
    }
}
