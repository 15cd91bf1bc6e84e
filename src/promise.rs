//! Deferred, memoizing computations.
//!
//! A [`Promise`] wraps a nullary computation that runs at most once. The
//! computation may itself produce another promise; forcing collapses the chain to
//! the innermost value and caches that value on the outermost promise.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use once_cell::unsync::OnceCell;

type Computation<T> = Box<dyn FnOnce() -> Lazy<T>>;

/// The result of a deferred computation: a terminal value or another promise.
pub enum Lazy<T> {
    Value(T),
    Deferred(Promise<T>),
}

impl<T: Clone> Lazy<T> {
    /// Resolve to the terminal value. Non-promises pass through untouched.
    pub fn force(self) -> T {
        match self {
            Lazy::Value(v) => v,
            Lazy::Deferred(p) => p.force().clone(),
        }
    }
}

impl<T> From<Promise<T>> for Lazy<T> {
    fn from(p: Promise<T>) -> Self {
        Lazy::Deferred(p)
    }
}

struct PromiseState<T> {
    value: OnceCell<T>,
    // Taken (and dropped) the first time the promise is forced.
    computation: Cell<Option<Computation<T>>>,
}

/// A deferred computation with a cached result.
///
/// Promises are cheap to clone (an `Rc` increment); clones share the cached
/// value. They are not `Send`: forcing the same promise from several threads is
/// outside the engine's contract.
pub struct Promise<T> {
    state: Rc<PromiseState<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Promise {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: 'static> Promise<T> {
    /// A pending promise for `f`.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> T + 'static,
    {
        Self::deferred(move || Lazy::Value(f()))
    }

    /// A pending promise whose computation may hand back another promise.
    pub fn deferred<F>(f: F) -> Self
    where
        F: FnOnce() -> Lazy<T> + 'static,
    {
        Promise {
            state: Rc::new(PromiseState {
                value: OnceCell::new(),
                computation: Cell::new(Some(Box::new(f))),
            }),
        }
    }
}

impl<T> Promise<T> {
    /// An already-forced promise.
    pub fn ready(value: T) -> Self {
        Promise {
            state: Rc::new(PromiseState {
                value: OnceCell::from(value),
                computation: Cell::new(None),
            }),
        }
    }

    pub fn is_forced(&self) -> bool {
        self.state.value.get().is_some()
    }

    /// The cached value, without forcing.
    pub fn peek(&self) -> Option<&T> {
        self.state.value.get()
    }

    /// True if both handles share the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// The cached value, if this is the last handle and it has been forced.
    pub(crate) fn into_value(self) -> Option<T> {
        Rc::try_unwrap(self.state)
            .ok()
            .and_then(|state| state.value.into_inner())
    }
}

impl<T: Clone> Promise<T> {
    /// Run the computation once, collapsing nested promises, and cache the result.
    ///
    /// # Panics
    ///
    /// Panics if the promise is forced from inside its own computation, or if an
    /// earlier force panicked part-way through the computation.
    pub fn force(&self) -> &T {
        if let Some(v) = self.state.value.get() {
            return v;
        }
        let Some(computation) = self.state.computation.take() else {
            tracing::error!("promise forced while its computation was running");
            panic!("promise forced re-entrantly or after its computation panicked");
        };
        let value = match computation() {
            Lazy::Value(v) => v,
            Lazy::Deferred(inner) => inner.force().clone(),
        };
        self.state.value.get_or_init(|| value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            Some(v) => f.debug_tuple("Promise").field(v).finish(),
            None => f.write_str("Promise(<pending>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_runs_computation_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let p = Promise::new(move || {
            counter.set(counter.get() + 1);
            42
        });
        assert!(!p.is_forced());
        assert_eq!(*p.force(), 42);
        assert_eq!(*p.force(), 42);
        assert_eq!(calls.get(), 1);
        assert!(p.is_forced());
    }

    #[test]
    fn test_clones_share_the_cache() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let p = Promise::new(move || {
            counter.set(counter.get() + 1);
            "value".to_string()
        });
        let q = p.clone();
        assert_eq!(q.force(), "value");
        assert_eq!(p.peek().map(String::as_str), Some("value"));
        assert_eq!(calls.get(), 1);
        assert!(p.ptr_eq(&q));
    }

    #[test]
    fn test_nested_promises_collapse() {
        let innermost = Promise::new(|| 7);
        let middle = Promise::deferred(move || Lazy::Deferred(innermost));
        let outer = Promise::deferred({
            let middle = middle.clone();
            move || middle.into()
        });
        assert_eq!(*outer.force(), 7);
        assert!(middle.is_forced());
    }

    #[test]
    fn test_lazy_force_passes_values_through() {
        assert_eq!(Lazy::Value(3).force(), 3);
        assert_eq!(Lazy::Deferred(Promise::ready(4)).force(), 4);
    }

    #[test]
    fn test_ready_is_forced() {
        let p = Promise::ready(1);
        assert!(p.is_forced());
        assert_eq!(format!("{p:?}"), "Promise(1)");
        assert_eq!(format!("{:?}", Promise::new(|| 1)), "Promise(<pending>)");
    }

    #[test]
    #[should_panic(expected = "re-entrantly")]
    fn test_reentrant_force_panics() {
        let slot: Rc<OnceCell<Promise<i32>>> = Rc::new(OnceCell::new());
        let inner = Rc::clone(&slot);
        let p = Promise::new(move || match inner.get() {
            Some(me) => *me.force() + 1,
            None => 0,
        });
        let _ = slot.set(p.clone());
        p.force();
    }
}
