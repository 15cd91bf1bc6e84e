//! Bridges from external sources into lazy lists.
//!
//! List constructors pull one element at a time. Sources that already support
//! pausable iteration (any Rust [`Iterator`]) are wrapped directly by
//! [`IterQueue`]. Sources that can only push every element through a callback
//! ([`PushSource`]) run on a worker thread behind [`HandshakeQueue`], which hands
//! elements over one at a time.

mod cooperative;
mod handshake;

use std::cell::RefCell;
use std::rc::Rc;

pub use cooperative::IterQueue;
pub use handshake::{HandshakeQueue, IterSource};

use crate::config::{self, Config};
use crate::error::{Result, SourceError};
use crate::list::LazyList;

/// Single-step pull access to a source.
pub trait ReadQueue {
    type Item;

    /// The next element, or `Ok(None)` once the source is exhausted. Exhaustion
    /// and failure are permanent: every later call returns `Ok(None)`.
    fn shift(&mut self) -> Result<Option<Self::Item>>;
}

/// Answer from a push callback telling the source whether to keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// A source that visits every element by calling back, with no way to pause.
///
/// Implementations should stop traversing once `visit` returns [`Flow::Stop`];
/// the consumer has gone away and further elements are discarded.
pub trait PushSource<T>: Send + 'static {
    fn traverse(self, visit: &mut dyn FnMut(T) -> Flow) -> std::result::Result<(), SourceError>;
}

/// Push source backed by a closure; see [`source_fn`].
pub struct FromFn<F>(F);

/// Wrap a closure that pushes every element through `visit` as a [`PushSource`].
pub fn source_fn<T, F>(f: F) -> FromFn<F>
where
    F: FnOnce(&mut dyn FnMut(T) -> Flow) -> std::result::Result<(), SourceError> + Send + 'static,
{
    FromFn(f)
}

impl<T, F> PushSource<T> for FromFn<F>
where
    F: FnOnce(&mut dyn FnMut(T) -> Flow) -> std::result::Result<(), SourceError> + Send + 'static,
{
    fn traverse(self, visit: &mut dyn FnMut(T) -> Flow) -> std::result::Result<(), SourceError> {
        (self.0)(visit)
    }
}

impl<T: Clone + 'static> LazyList<T> {
    /// A list drawing its elements from `iter` as cells are first observed.
    ///
    /// Element order is exactly the iterator's order. The iterator is advanced
    /// only as far as the list has been explored.
    pub fn from_iterator<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
    {
        pulled(Rc::new(RefCell::new(IterQueue::new(iter.into_iter()))))
    }
}

fn pulled<I>(queue: Rc<RefCell<IterQueue<I>>>) -> LazyList<I::Item>
where
    I: Iterator + 'static,
    I::Item: Clone + 'static,
{
    LazyList::delay(move || {
        let next = queue.borrow_mut().pull();
        match next {
            Some(value) => LazyList::cons_with(value, move || pulled(queue)),
            None => LazyList::empty(),
        }
    })
}

impl<T: Clone + 'static> LazyList<Result<T>> {
    /// A list over any pull queue. A failed pull becomes a final `Err` element.
    pub fn from_queue<Q>(queue: Q) -> Self
    where
        Q: ReadQueue<Item = T> + 'static,
    {
        queued(Rc::new(RefCell::new(queue)))
    }
}

impl<T: Clone + Send + 'static> LazyList<Result<T>> {
    /// A list over a push-only source, run on a worker thread configured from the
    /// process-wide [`Config`].
    pub fn from_push<S>(source: S) -> Self
    where
        S: PushSource<T>,
    {
        Self::from_push_with(source, &config::current())
    }

    /// Like [`LazyList::from_push`] with an explicit config. A worker that cannot
    /// be spawned yields a single `Err` element.
    pub fn from_push_with<S>(source: S, config: &Config) -> Self
    where
        S: PushSource<T>,
    {
        match HandshakeQueue::spawn(source, config) {
            Ok(queue) => LazyList::from_queue(queue),
            Err(e) => LazyList::cons(Err(e), LazyList::empty()),
        }
    }
}

fn queued<Q>(queue: Rc<RefCell<Q>>) -> LazyList<Result<Q::Item>>
where
    Q: ReadQueue + 'static,
    Q::Item: Clone + 'static,
{
    LazyList::delay(move || {
        let next = queue.borrow_mut().shift();
        match next {
            Ok(Some(value)) => LazyList::cons_with(Ok(value), move || queued(queue)),
            Ok(None) => LazyList::empty(),
            Err(e) => LazyList::cons(Err(e), LazyList::empty()),
        }
    })
}
