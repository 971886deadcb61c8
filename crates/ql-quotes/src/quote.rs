//! `Quote` trait and `SimpleQuote` implementation.

use ql_core::{Observable, ObservableImpl, Observer, Real};
use std::cell::Cell;
use std::rc::Weak;

/// A market-observable value.
///
/// Every quote is [`Observable`]: objects computed from it register as
/// observers and are invalidated when the value changes.
pub trait Quote: Observable + std::fmt::Debug {
    /// Return the current value.
    ///
    /// Returns `None` if the quote is not currently valid / set.
    fn value(&self) -> Option<Real>;

    /// Return `true` if the quote is currently valid.
    fn is_valid(&self) -> bool {
        self.value().is_some()
    }
}

/// A simple, mutable market quote.
///
/// Mutation goes through `&self` so a quote can be shared (`Rc`) between the
/// market-data side that updates it and the instruments that read it.
#[derive(Debug, Default)]
pub struct SimpleQuote {
    value: Cell<Option<Real>>,
    observable: ObservableImpl,
}

impl SimpleQuote {
    /// Create a new quote with the given value.
    pub fn new(value: Real) -> Self {
        Self {
            value: Cell::new(Some(value)),
            observable: ObservableImpl::new(),
        }
    }

    /// Create an empty (invalid) quote.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set a new value, notifying observers if it changed.
    ///
    /// Returns the difference between the new and the old value (`0` if the
    /// quote was empty).
    pub fn set_value(&self, value: Real) -> Real {
        let old = self.value.replace(Some(value));
        if old != Some(value) {
            tracing::trace!(?old, new = value, "quote changed");
            self.observable.notify();
        }
        old.map_or(0.0, |o| value - o)
    }

    /// Clear the value, making the quote invalid.
    pub fn reset(&self) {
        if self.value.replace(None).is_some() {
            self.observable.notify();
        }
    }

    /// Number of live observers registered with this quote.
    pub fn observer_count(&self) -> usize {
        self.observable.observer_count()
    }
}

impl Observable for SimpleQuote {
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

impl Quote for SimpleQuote {
    fn value(&self) -> Option<Real> {
        self.value.get()
    }
}
