//! Observer / Observable pattern.
//!
//! The invalidation chain of the library:
//! * An **Observable** (a quote, a curve) notifies registered **Observer**s
//!   whenever it changes state.
//! * Observers react in [`Observer::update`], usually by marking themselves
//!   dirty and forwarding the notification to their own observers.
//!
//! Notifications only *invalidate*; nothing is recomputed until somebody
//! reads.  Everything here is single-threaded: observers are held through
//! `std::rc::Weak` and the observer list sits in a `RefCell`, so registration
//! and notification work through `&self`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// An object that can notify interested parties when it changes.
pub trait Observable {
    /// Register an observer to receive future change notifications.
    fn register_observer(&self, observer: Weak<dyn Observer>);

    /// Remove a previously registered observer.
    fn unregister_observer(&self, observer: &Weak<dyn Observer>);

    /// Notify all currently registered observers that this object has changed.
    fn notify_observers(&self);
}

/// An object that reacts to changes in [`Observable`]s it has subscribed to.
pub trait Observer {
    /// Called by every observable this observer is registered with when that
    /// observable changes state.
    fn update(&self);
}

/// Observer-list management that can be embedded in any observable type.
#[derive(Default)]
pub struct ObservableImpl {
    observers: RefCell<Vec<Weak<dyn Observer>>>,
}

impl std::fmt::Debug for ObservableImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableImpl")
            .field("observers", &self.observers.borrow().len())
            .finish()
    }
}

impl ObservableImpl {
    /// Create a new, empty observable implementation.
    pub fn new() -> Self {
        Self {
            observers: RefCell::new(Vec::new()),
        }
    }

    /// Register an observer.  Registering the same observer twice is a no-op.
    pub fn register(&self, observer: Weak<dyn Observer>) {
        let mut observers = self.observers.borrow_mut();
        if !observers.iter().any(|o| Weak::ptr_eq(o, &observer)) {
            observers.push(observer);
        }
    }

    /// Remove an observer (by pointer equality of the `Weak`).
    pub fn unregister(&self, observer: &Weak<dyn Observer>) {
        self.observers
            .borrow_mut()
            .retain(|o| !Weak::ptr_eq(o, observer));
    }

    /// Number of observers still alive.
    pub fn observer_count(&self) -> usize {
        self.observers
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Notify all live observers, removing dead `Weak` references as we go.
    pub fn notify(&self) {
        // Collect live observers first, then call update outside the borrow:
        // an observer may register or unregister while being notified.
        let observers: Vec<Rc<dyn Observer>> = {
            let mut list = self.observers.borrow_mut();
            list.retain(|w| w.strong_count() > 0);
            list.iter().filter_map(|w| w.upgrade()).collect()
        };
        tracing::trace!(observers = observers.len(), "notifying observers");
        for obs in observers {
            obs.update();
        }
    }
}

impl Observable for ObservableImpl {
    fn register_observer(&self, observer: Weak<dyn Observer>) {
        self.register(observer);
    }

    fn unregister_observer(&self, observer: &Weak<dyn Observer>) {
        self.unregister(observer);
    }

    fn notify_observers(&self) {
        self.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingObserver {
        count: Cell<u32>,
    }

    impl Observer for CountingObserver {
        fn update(&self) {
            self.count.set(self.count.get() + 1);
        }
    }

    fn counting() -> Rc<CountingObserver> {
        Rc::new(CountingObserver {
            count: Cell::new(0),
        })
    }

    #[test]
    fn register_and_notify() {
        let obs = counting();
        let observable = ObservableImpl::new();
        observable.register(Rc::downgrade(&obs) as Weak<dyn Observer>);
        observable.notify();
        assert_eq!(obs.count.get(), 1);
        observable.notify();
        assert_eq!(obs.count.get(), 2);
    }

    #[test]
    fn duplicate_registration_notifies_once() {
        let obs = counting();
        let observable = ObservableImpl::new();
        let weak = Rc::downgrade(&obs) as Weak<dyn Observer>;
        observable.register(weak.clone());
        observable.register(weak);
        observable.notify();
        assert_eq!(obs.count.get(), 1);
    }

    #[test]
    fn dead_observer_pruned() {
        let observable = ObservableImpl::new();
        {
            let obs = counting();
            observable.register(Rc::downgrade(&obs) as Weak<dyn Observer>);
            assert_eq!(observable.observer_count(), 1);
        }
        // obs dropped; notify should prune it
        observable.notify();
        assert_eq!(observable.observers.borrow().len(), 0);
    }

    #[test]
    fn unregister() {
        let obs = counting();
        let weak = Rc::downgrade(&obs) as Weak<dyn Observer>;
        let observable = ObservableImpl::new();
        observable.register(weak.clone());
        observable.unregister(&weak);
        observable.notify();
        assert_eq!(obs.count.get(), 0);
    }
}
