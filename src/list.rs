//! The lazy list cell.
//!
//! A [`LazyList`] is a shared handle to a node that is either empty, a head/tail
//! pair of promises, or a list whose shape is itself still deferred (the result
//! of [`LazyList::delay`] or of an unobserved concatenation). Observing a
//! deferred node forces it once and the node adopts the shape of the list it
//! produced.

use std::cell::RefCell;
use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::combinators;
use crate::config;
use crate::error::{Error, Result};
use crate::promise::Promise;

// ============================================================================
// Cells and nodes
// ============================================================================

pub(crate) enum Cell<T> {
    Empty,
    Cons {
        head: Promise<T>,
        tail: Promise<LazyList<T>>,
    },
    /// Shape not known until the promise is forced.
    Pending(Promise<LazyList<T>>),
    /// Concatenation of the parts, none of them observed yet. Kept as a flat
    /// list of parts so appends to an unobserved concatenation can be spliced.
    Joined(Rc<Vec<LazyList<T>>>),
}

enum Unresolved<T> {
    Deferred(Promise<LazyList<T>>),
    Joined(Rc<Vec<LazyList<T>>>),
}

/// Offset -> cell memo for `cell_at`.
struct RefCache<T> {
    enabled: Option<bool>,
    cells: FxHashMap<usize, LazyList<T>>,
    furthest: Option<usize>,
}

impl<T> RefCache<T> {
    fn new() -> Self {
        RefCache {
            enabled: None,
            cells: FxHashMap::default(),
            furthest: None,
        }
    }

    fn enabled(&self) -> bool {
        self.enabled.unwrap_or_else(config::cache_refs_default)
    }

    fn clear(&mut self) {
        self.cells.clear();
        self.furthest = None;
    }
}

pub(crate) struct Node<T> {
    cell: RefCell<Cell<T>>,
    refs: RefCell<RefCache<T>>,
}

impl<T> Drop for Node<T> {
    // Forced tails and nested concatenations form long chains of uniquely owned
    // nodes; unlink them one at a time so dropping them cannot overflow the stack.
    fn drop(&mut self) {
        let mut orphans = Vec::new();
        detach(self.cell.get_mut(), &mut orphans);
        while let Some(list) = orphans.pop() {
            if let Ok(mut node) = Rc::try_unwrap(list.node) {
                detach(node.cell.get_mut(), &mut orphans);
            }
        }
    }
}

fn detach<T>(cell: &mut Cell<T>, orphans: &mut Vec<LazyList<T>>) {
    match std::mem::replace(cell, Cell::Empty) {
        Cell::Cons { tail, .. } | Cell::Pending(tail) => orphans.extend(tail.into_value()),
        Cell::Joined(parts) => {
            if let Ok(parts) = Rc::try_unwrap(parts) {
                orphans.extend(parts);
            }
        }
        Cell::Empty => {}
    }
}

// ============================================================================
// LazyList
// ============================================================================

/// A lazily evaluated, memoizing cons list.
///
/// Cloning is an `Rc` increment; clones observe the same memoized elements.
pub struct LazyList<T> {
    pub(crate) node: Rc<Node<T>>,
}

impl<T> Clone for LazyList<T> {
    fn clone(&self) -> Self {
        LazyList {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T> Default for LazyList<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> LazyList<T> {
    pub(crate) fn from_cell(cell: Cell<T>) -> Self {
        LazyList {
            node: Rc::new(Node {
                cell: RefCell::new(cell),
                refs: RefCell::new(RefCache::new()),
            }),
        }
    }

    /// The empty list.
    pub fn empty() -> Self {
        Self::from_cell(Cell::Empty)
    }

    /// A node built from already-constructed head and tail promises.
    pub fn from_promises(head: Promise<T>, tail: Promise<LazyList<T>>) -> Self {
        Self::from_cell(Cell::Cons { head, tail })
    }

    /// A value followed by an explicit tail.
    pub fn cons(head: T, tail: LazyList<T>) -> Self {
        Self::from_promises(Promise::ready(head), Promise::ready(tail))
    }

    /// Start building a node whose head and tail may each be eager or deferred.
    pub fn node() -> NodeBuilder<T> {
        NodeBuilder {
            head: None,
            tail: None,
            tail_with: None,
        }
    }

    /// True if both handles point at the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    /// Whether `cell_at` lookups are memoized for this list.
    pub fn is_cached(&self) -> bool {
        self.node.refs.borrow().enabled()
    }

    /// Turn the offset memo on or off. Turning it off drops anything memoized.
    pub fn set_cached(&self, cached: bool) {
        let mut refs = self.node.refs.borrow_mut();
        refs.enabled = Some(cached);
        if !cached {
            refs.clear();
        }
    }

    /// The head/tail promises of a node whose shape is already known, following
    /// deferred nodes that have been forced. Never forces anything.
    fn peek_cons(&self) -> Option<(Promise<T>, Promise<LazyList<T>>)> {
        let pending = match &*self.node.cell.borrow() {
            Cell::Empty | Cell::Joined(_) => return None,
            Cell::Cons { head, tail } => return Some((head.clone(), tail.clone())),
            Cell::Pending(p) => p.clone(),
        };
        pending.peek().and_then(|target| target.peek_cons())
    }

    /// True only if the list is already known to be empty. Never forces anything.
    fn is_known_empty(&self) -> bool {
        let pending = match &*self.node.cell.borrow() {
            Cell::Empty => return true,
            Cell::Cons { .. } | Cell::Joined(_) => return false,
            Cell::Pending(p) => p.clone(),
        };
        pending.peek().is_some_and(|target| target.is_known_empty())
    }

    /// The parts of a concatenation nobody has observed yet.
    pub(crate) fn joined_parts(&self) -> Option<Rc<Vec<LazyList<T>>>> {
        match &*self.node.cell.borrow() {
            Cell::Joined(parts) => Some(Rc::clone(parts)),
            _ => None,
        }
    }

    pub(crate) fn replace_cell(&self, cell: Cell<T>) {
        *self.node.cell.borrow_mut() = cell;
        self.node.refs.borrow_mut().clear();
    }
}

impl<T: 'static> LazyList<T> {
    /// A value followed by a tail computed on first access.
    pub fn cons_with<F>(head: T, tail: F) -> Self
    where
        F: FnOnce() -> LazyList<T> + 'static,
    {
        Self::from_promises(Promise::ready(head), Promise::new(tail))
    }

    /// A list whose entire shape, emptiness included, is computed on first access.
    pub fn delay<F>(f: F) -> Self
    where
        F: FnOnce() -> LazyList<T> + 'static,
    {
        Self::from_cell(Cell::Pending(Promise::new(f)))
    }

    /// Resolve this node's shape and hand back its head and tail promises, or
    /// `None` for the empty list.
    pub fn uncons(&self) -> Option<(Promise<T>, Promise<LazyList<T>>)> {
        loop {
            let unresolved = match &*self.node.cell.borrow() {
                Cell::Empty => return None,
                Cell::Cons { head, tail } => return Some((head.clone(), tail.clone())),
                Cell::Pending(p) => Unresolved::Deferred(p.clone()),
                Cell::Joined(parts) => Unresolved::Joined(Rc::clone(parts)),
            };
            let target = match unresolved {
                Unresolved::Deferred(p) => p.force().clone(),
                Unresolved::Joined(parts) => combinators::joined(parts.iter().cloned().collect()),
            };
            if target.ptr_eq(self) {
                panic!("lazy list is defined as itself");
            }
            let adopted = match target.uncons() {
                None => Cell::Empty,
                Some((head, tail)) => Cell::Cons { head, tail },
            };
            *self.node.cell.borrow_mut() = adopted;
        }
    }

    /// True if the list has no elements. Forces a deferred shape, never a head.
    pub fn is_empty(&self) -> bool {
        self.uncons().is_none()
    }

    /// The list after the first element; empty stays empty.
    pub fn tail(&self) -> LazyList<T> {
        match self.uncons() {
            Some((_, tail)) => tail.force().clone(),
            None => LazyList::empty(),
        }
    }
}

impl<T: Clone + 'static> LazyList<T> {
    /// Walk `n` steps, forcing each visited head, and return the node at offset
    /// `n`, or `None` if the list ends before reaching it.
    fn reach(&self, n: usize) -> Option<LazyList<T>> {
        if n == 0 {
            return Some(self.clone());
        }
        let (mut s, mut offset) = {
            let mut refs = self.node.refs.borrow_mut();
            let enabled = *refs.enabled.get_or_insert_with(config::cache_refs_default);
            if enabled {
                if let Some(hit) = refs.cells.get(&n) {
                    tracing::trace!(offset = n, "ref cache hit");
                    return Some(hit.clone());
                }
                match refs.furthest {
                    Some(f) if f < n => match refs.cells.get(&f) {
                        Some(cell) => (cell.clone(), f),
                        None => (self.clone(), 0),
                    },
                    _ => (self.clone(), 0),
                }
            } else {
                (self.clone(), 0)
            }
        };
        while offset < n {
            let (head, tail) = s.uncons()?;
            head.force();
            s = tail.force().clone();
            offset += 1;
        }
        let mut refs = self.node.refs.borrow_mut();
        if refs.enabled == Some(true) {
            tracing::trace!(offset = n, "ref cache fill");
            refs.cells.insert(n, s.clone());
            if refs.furthest.is_none_or(|f| f < n) {
                refs.furthest = Some(n);
            }
        }
        Some(s)
    }

    /// The node at offset `n`, or the empty list if the list ends first.
    pub fn cell_at(&self, n: usize) -> LazyList<T> {
        self.reach(n).unwrap_or_default()
    }

    /// Lazily the first `m` elements starting at offset `n`.
    pub fn sublist(&self, n: usize, m: usize) -> LazyList<T> {
        let source = self.clone();
        LazyList::delay(move || prefix(source.cell_at(n), m))
    }

    /// Walk at most `limit` elements (all of them for `None`), passing each to
    /// `f`, and return what is left.
    pub fn each<F>(&self, limit: Option<usize>, mut f: F) -> LazyList<T>
    where
        F: FnMut(T),
    {
        let mut s = self.clone();
        let mut remaining = limit;
        while remaining != Some(0) {
            let Some((head, tail)) = s.uncons() else {
                break;
            };
            f(head.force().clone());
            s = tail.force().clone();
            remaining = remaining.map(|r| r - 1);
        }
        s
    }

    /// The list after skipping `n` elements (each skipped head is still forced).
    pub fn drop(&self, n: usize) -> LazyList<T> {
        let mut s = self.clone();
        for _ in 0..n {
            let Some((head, tail)) = s.uncons() else {
                break;
            };
            head.force();
            s = tail.force().clone();
        }
        s
    }

    /// The first element, forcing it.
    pub fn head(&self) -> Option<T> {
        self.uncons().map(|(head, _)| head.force().clone())
    }

    /// The first element and the rest of the list.
    pub fn split(&self) -> Option<(T, LazyList<T>)> {
        self.uncons()
            .map(|(head, tail)| (head.force().clone(), tail.force().clone()))
    }

    /// The element at offset `n`. Negative offsets are never end-relative: they
    /// and offsets past the end give `None`.
    pub fn get(&self, n: isize) -> Option<T> {
        let n = usize::try_from(n).ok()?;
        self.reach(n)?.head()
    }

    /// `m` elements starting at offset `n`, or `None` if `n` is negative or the
    /// list ends before offset `n + m`.
    pub fn slice(&self, n: isize, m: usize) -> Option<Vec<T>> {
        let n = usize::try_from(n).ok()?;
        let start = self.reach(n)?;
        let items = start.take(m);
        (items.len() == m).then_some(items)
    }

    /// The elements addressed by an offset range. A negative start gives `None`;
    /// an inverted range gives an empty slice; an unbounded end reads to the end
    /// of the list and never returns for infinite lists.
    pub fn range<R>(&self, range: R) -> Option<Vec<T>>
    where
        R: RangeBounds<isize>,
    {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.checked_add(1)?,
            Bound::Unbounded => 0,
        };
        if start < 0 {
            return None;
        }
        let end = match range.end_bound() {
            Bound::Included(&e) => e.checked_add(1)?,
            Bound::Excluded(&e) => e,
            Bound::Unbounded => {
                let from = self.reach(start as usize)?;
                return Some(from.to_vec());
            }
        };
        if end <= start {
            return Some(Vec::new());
        }
        self.slice(start, (end - start) as usize)
    }

    /// The elements at each offset in `offsets`, stopping early where the list
    /// ends. Unlike [`LazyList::range`] a short list is not an error.
    pub fn take_range<R>(&self, offsets: R) -> Vec<T>
    where
        R: RangeBounds<usize>,
    {
        let start = match offsets.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let items = self.cell_at(start).iter();
        match offsets.end_bound() {
            Bound::Included(&e) => items.take(e.saturating_add(1).saturating_sub(start)).collect(),
            Bound::Excluded(&e) => items.take(e.saturating_sub(start)).collect(),
            Bound::Unbounded => items.collect(),
        }
    }

    /// The next `n` elements as a vector. Does not change the list.
    pub fn take(&self, n: usize) -> Vec<T> {
        self.iter().take(n).collect()
    }

    /// Every element. Only returns for finite lists.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    /// The number of elements. Only returns for finite lists.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// The last `n` elements. Only returns for finite lists.
    pub fn last(&self, n: usize) -> Vec<T> {
        let mut all = self.to_vec();
        let keep = all.len().saturating_sub(n);
        all.split_off(keep)
    }

    pub fn iter(&self) -> Iter<T> {
        Iter {
            next: Promise::ready(self.clone()),
        }
    }
}

fn prefix<T: 'static>(list: LazyList<T>, m: usize) -> LazyList<T> {
    if m == 0 {
        return LazyList::empty();
    }
    LazyList::delay(move || match list.uncons() {
        None => LazyList::empty(),
        Some((head, tail)) => {
            LazyList::from_promises(head, Promise::new(move || prefix(tail.force().clone(), m - 1)))
        }
    })
}

// ============================================================================
// Node builder
// ============================================================================

/// Builds a single node from a head and either an explicit or a deferred tail.
pub struct NodeBuilder<T> {
    head: Option<Promise<T>>,
    tail: Option<LazyList<T>>,
    tail_with: Option<Box<dyn FnOnce() -> LazyList<T>>>,
}

impl<T: 'static> NodeBuilder<T> {
    pub fn head(mut self, value: T) -> Self {
        self.head = Some(Promise::ready(value));
        self
    }

    /// A head computed on first access.
    pub fn head_with<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> T + 'static,
    {
        self.head = Some(Promise::new(f));
        self
    }

    pub fn tail(mut self, tail: LazyList<T>) -> Self {
        self.tail = Some(tail);
        self
    }

    /// A tail computed on first access.
    pub fn tail_with<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> LazyList<T> + 'static,
    {
        self.tail_with = Some(Box::new(f));
        self
    }

    /// Assemble the node. No head and no tail is the empty list; a head with no
    /// tail is a one-element list.
    ///
    /// # Errors
    ///
    /// [`Error::ConflictingTail`] if both an explicit and a deferred tail were
    /// given, [`Error::MissingHead`] if a tail was given without a head.
    pub fn finish(self) -> Result<LazyList<T>> {
        let tail = match (self.tail, self.tail_with) {
            (Some(_), Some(_)) => return Err(Error::ConflictingTail),
            (Some(tail), None) => Some(Promise::ready(tail)),
            (None, Some(f)) => Some(Promise::new(f)),
            (None, None) => None,
        };
        match (self.head, tail) {
            (None, None) => Ok(LazyList::empty()),
            (None, Some(_)) => Err(Error::MissingHead),
            (Some(head), tail) => Ok(LazyList::from_promises(
                head,
                tail.unwrap_or_else(|| Promise::ready(LazyList::empty())),
            )),
        }
    }
}

// ============================================================================
// Iteration
// ============================================================================

/// Iterator over a list's elements, forcing each head as it is reached.
///
/// A tail is forced only when the element after it is requested.
pub struct Iter<T> {
    next: Promise<LazyList<T>>,
}

impl<T: Clone + 'static> Iterator for Iter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let list = self.next.force().clone();
        let (head, tail) = list.uncons()?;
        self.next = tail;
        Some(head.force().clone())
    }
}

impl<T: Clone + 'static> IntoIterator for &LazyList<T> {
    type Item = T;
    type IntoIter = Iter<T>;

    fn into_iter(self) -> Iter<T> {
        self.iter()
    }
}

impl<T: Clone + 'static> IntoIterator for LazyList<T> {
    type Item = T;
    type IntoIter = Iter<T>;

    fn into_iter(self) -> Iter<T> {
        Iter {
            next: Promise::ready(self),
        }
    }
}

// ============================================================================
// Equality and rendering
// ============================================================================

/// Element-wise equality. Both lists must be finite unless they share a node.
impl<T: Clone + PartialEq + 'static> PartialEq for LazyList<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let mut left = self.iter();
        let mut right = other.iter();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some(a), Some(b)) if a == b => {}
                _ => return false,
            }
        }
    }
}

impl<T> LazyList<T> {
    // Shows only what has been forced so far: `[]`, `[... ]`, `[1, 2,... ]`, `[1, 2]`.
    fn render(
        &self,
        f: &mut fmt::Formatter<'_>,
        item: impl Fn(&T, &mut fmt::Formatter<'_>) -> fmt::Result,
    ) -> fmt::Result {
        if self.is_known_empty() {
            return f.write_str("[]");
        }
        f.write_str("[")?;
        let mut first = true;
        let mut seen = FxHashSet::default();
        let mut s = self.clone();
        while let Some((head, tail)) = s.peek_cons() {
            if !seen.insert(Rc::as_ptr(&s.node) as usize) {
                break;
            }
            let Some(value) = head.peek() else {
                break;
            };
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            item(value, f)?;
            match tail.peek() {
                Some(next) => s = next.clone(),
                None => break,
            }
        }
        if first {
            f.write_str("... ")?;
        } else if !s.is_known_empty() {
            f.write_str(",... ")?;
        }
        f.write_str("]")
    }
}

impl<T: fmt::Debug> fmt::Debug for LazyList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, |v, f| write!(f, "{v:?}"))
    }
}

impl<T: fmt::Display> fmt::Display for LazyList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, |v, f| write!(f, "{v}"))
    }
}
