//! Lazy structural combinators.
//!
//! Every combinator returns at once with a list whose shape is deferred; no
//! source element is touched until the result is observed. Functions passed in
//! are shared between cells behind an `Rc`, so they may be called many times
//! but never for the same cell twice.

use std::collections::VecDeque;
use std::ops::Add;
use std::rc::Rc;

use crate::list::{Cell, LazyList};
use crate::promise::Promise;

// ============================================================================
// Verdicts
// ============================================================================

/// What a [`LazyList::select`] predicate decided about an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Skip,
    /// End the result here, before this element.
    Stop,
}

impl From<bool> for Verdict {
    fn from(keep: bool) -> Self {
        if keep { Verdict::Keep } else { Verdict::Skip }
    }
}

type Predicate<T> = Rc<dyn Fn(&T) -> Verdict>;
type Less<T> = Rc<dyn Fn(&T, &T) -> bool>;
type Combine<A, B, C> = Rc<dyn Fn(A, B) -> C>;

// ============================================================================
// Element-wise
// ============================================================================

impl<T: Clone + 'static> LazyList<T> {
    /// `f` applied to every element. Each result is computed on first access.
    pub fn map<U, F>(&self, f: F) -> LazyList<U>
    where
        U: Clone + 'static,
        F: Fn(T) -> U + 'static,
    {
        mapped(self.clone(), Rc::new(f))
    }

    /// The elements for which `predicate` answers `true` or [`Verdict::Keep`].
    ///
    /// Non-matching elements are skipped when the result's shape is observed.
    /// [`Verdict::Stop`] ends the result, which turns an infinite source into a
    /// finite list.
    ///
    /// ```
    /// use lazylist::{LazyList, Verdict};
    ///
    /// let small_odds = LazyList::count_from(1u32).select(|&x| match x {
    ///     x if x > 7 => Verdict::Stop,
    ///     x => (x % 2 == 1).into(),
    /// });
    /// assert_eq!(small_odds.to_vec(), vec![1, 3, 5, 7]);
    /// ```
    pub fn select<V, P>(&self, predicate: P) -> LazyList<T>
    where
        V: Into<Verdict>,
        P: Fn(&T) -> V + 'static,
    {
        selected(self.clone(), Rc::new(move |x: &T| -> Verdict { predicate(x).into() }))
    }

    /// The elements for which `predicate` is false.
    pub fn reject<P>(&self, predicate: P) -> LazyList<T>
    where
        P: Fn(&T) -> bool + 'static,
    {
        self.select(move |x: &T| !predicate(x))
    }

    /// `(select(p), reject(p))`. Each side walks the source independently.
    pub fn partition<P>(&self, predicate: P) -> (LazyList<T>, LazyList<T>)
    where
        P: Fn(&T) -> bool + 'static,
    {
        let keep = Rc::new(predicate);
        let skip = Rc::clone(&keep);
        (
            self.select(move |x: &T| keep(x)),
            self.reject(move |x: &T| skip(x)),
        )
    }

    /// Each element paired with its offset.
    pub fn enumerate(&self) -> LazyList<(T, usize)> {
        self.zip_with(&LazyList::count_from(0usize), |x, i| (x, i))
    }
}

fn mapped<T, U>(source: LazyList<T>, f: Rc<dyn Fn(T) -> U>) -> LazyList<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
{
    LazyList::delay(move || match source.uncons() {
        None => LazyList::empty(),
        Some((head, tail)) => {
            let g = Rc::clone(&f);
            LazyList::from_promises(
                Promise::new(move || g(head.force().clone())),
                Promise::new(move || mapped(tail.force().clone(), f)),
            )
        }
    })
}

fn selected<T: Clone + 'static>(source: LazyList<T>, predicate: Predicate<T>) -> LazyList<T> {
    LazyList::delay(move || {
        let mut s = source;
        loop {
            let Some((head, tail)) = s.uncons() else {
                return LazyList::empty();
            };
            let verdict = predicate(head.force());
            match verdict {
                Verdict::Keep => {
                    return LazyList::from_promises(
                        head,
                        Promise::new(move || selected(tail.force().clone(), predicate)),
                    );
                }
                Verdict::Skip => s = tail.force().clone(),
                Verdict::Stop => return LazyList::empty(),
            }
        }
    })
}

// ============================================================================
// Merge
// ============================================================================

impl<T: Clone + PartialOrd + 'static> LazyList<T> {
    /// Ordered merge of two ascending lists. Equal heads are emitted once and
    /// both sides advance.
    pub fn merge(&self, other: &LazyList<T>) -> LazyList<T> {
        self.merge_by(other, |a, b| a < b)
    }
}

impl<T: Clone + 'static> LazyList<T> {
    /// Ordered merge under `less`. When neither head is less than the other
    /// they count as equal: the left head is emitted and both sides advance.
    pub fn merge_by<F>(&self, other: &LazyList<T>, less: F) -> LazyList<T>
    where
        F: Fn(&T, &T) -> bool + 'static,
    {
        merged(self.clone(), other.clone(), Rc::new(less))
    }
}

fn merged<T: Clone + 'static>(left: LazyList<T>, right: LazyList<T>, less: Less<T>) -> LazyList<T> {
    LazyList::delay(move || {
        let Some((lh, lt)) = left.uncons() else {
            return right;
        };
        let Some((rh, rt)) = right.uncons() else {
            return left;
        };
        let left_first = less(lh.force(), rh.force());
        let right_first = !left_first && less(rh.force(), lh.force());
        if left_first {
            LazyList::from_promises(lh, Promise::new(move || merged(lt.force().clone(), right, less)))
        } else if right_first {
            LazyList::from_promises(rh, Promise::new(move || merged(left, rt.force().clone(), less)))
        } else {
            LazyList::from_promises(
                lh,
                Promise::new(move || merged(lt.force().clone(), rt.force().clone(), less)),
            )
        }
    })
}

// ============================================================================
// Zip
// ============================================================================

impl<T: Clone + 'static> LazyList<T> {
    /// Pairs of elements at equal offsets, as long as both lists last.
    pub fn zip<U>(&self, other: &LazyList<U>) -> LazyList<(T, U)>
    where
        U: Clone + 'static,
    {
        self.zip_with(other, |a, b| (a, b))
    }

    /// `f` over elements at equal offsets, as long as both lists last.
    pub fn zip_with<U, V, F>(&self, other: &LazyList<U>, f: F) -> LazyList<V>
    where
        U: Clone + 'static,
        V: Clone + 'static,
        F: Fn(T, U) -> V + 'static,
    {
        zipped(self.clone(), other.clone(), Rc::new(f))
    }

    /// One vector per offset, holding the element of every list at that offset.
    /// Ends with the shortest list; no lists gives the empty list.
    pub fn zip_all(lists: Vec<LazyList<T>>) -> LazyList<Vec<T>> {
        LazyList::zip_all_with(lists, |row| row)
    }

    /// `f` over the elements of every list at each offset.
    pub fn zip_all_with<U, F>(lists: Vec<LazyList<T>>, f: F) -> LazyList<U>
    where
        U: Clone + 'static,
        F: Fn(Vec<T>) -> U + 'static,
    {
        zipped_all(lists, Rc::new(f))
    }
}

fn zipped<T, U, V>(left: LazyList<T>, right: LazyList<U>, f: Combine<T, U, V>) -> LazyList<V>
where
    T: Clone + 'static,
    U: Clone + 'static,
    V: Clone + 'static,
{
    LazyList::delay(move || {
        let Some((lh, lt)) = left.uncons() else {
            return LazyList::empty();
        };
        let Some((rh, rt)) = right.uncons() else {
            return LazyList::empty();
        };
        let g = Rc::clone(&f);
        LazyList::from_promises(
            Promise::new(move || g(lh.force().clone(), rh.force().clone())),
            Promise::new(move || zipped(lt.force().clone(), rt.force().clone(), f)),
        )
    })
}

fn zipped_all<T, U>(lists: Vec<LazyList<T>>, f: Rc<dyn Fn(Vec<T>) -> U>) -> LazyList<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
{
    LazyList::delay(move || {
        if lists.is_empty() {
            return LazyList::empty();
        }
        let mut heads = Vec::with_capacity(lists.len());
        let mut tails = Vec::with_capacity(lists.len());
        for list in &lists {
            let Some((head, tail)) = list.uncons() else {
                return LazyList::empty();
            };
            heads.push(head);
            tails.push(tail);
        }
        let g = Rc::clone(&f);
        LazyList::from_promises(
            Promise::new(move || g(heads.iter().map(|h| h.force().clone()).collect())),
            Promise::new(move || zipped_all(tails.iter().map(|t| t.force().clone()).collect(), f)),
        )
    })
}

// ============================================================================
// Append and mix
// ============================================================================

impl<T: Clone + 'static> LazyList<T> {
    /// This list followed by `other`. If this list is infinite `other` is
    /// never reached.
    pub fn append(&self, other: &LazyList<T>) -> LazyList<T> {
        LazyList::concat(vec![self.clone(), other.clone()])
    }

    /// The lists one after another, in order.
    ///
    /// Concatenations that have not been observed yet are flattened into their
    /// parts, so a list grown by many repeated appends is walked without
    /// nesting.
    pub fn concat(lists: Vec<LazyList<T>>) -> LazyList<T> {
        LazyList::from_cell(Cell::Joined(Rc::new(lists)))
    }

    /// Fair interleave: take the head of the first list, move its tail to the
    /// back, repeat. Exhausted lists drop out. Every list is revisited within
    /// as many steps as there are lists.
    pub fn mix(lists: Vec<LazyList<T>>) -> LazyList<T> {
        mixed(lists.into())
    }
}

/// The first node of the concatenation of `lists`, splicing in the parts of
/// any unobserved concatenation instead of forcing it.
pub(crate) fn joined<T: 'static>(mut lists: VecDeque<LazyList<T>>) -> LazyList<T> {
    while let Some(first) = lists.pop_front() {
        if let Some(parts) = first.joined_parts() {
            for part in parts.iter().rev() {
                lists.push_front(part.clone());
            }
            continue;
        }
        if lists.is_empty() {
            return first;
        }
        if let Some((head, tail)) = first.uncons() {
            return LazyList::from_promises(
                head,
                Promise::new(move || {
                    lists.push_front(tail.force().clone());
                    LazyList::delay(move || joined(lists))
                }),
            );
        }
    }
    LazyList::empty()
}

fn mixed<T: Clone + 'static>(mut queue: VecDeque<LazyList<T>>) -> LazyList<T> {
    LazyList::delay(move || {
        loop {
            let Some(first) = queue.pop_front() else {
                return LazyList::empty();
            };
            if queue.is_empty() {
                return first;
            }
            if let Some((head, tail)) = first.uncons() {
                return LazyList::from_promises(
                    head,
                    Promise::new(move || {
                        queue.push_back(tail.force().clone());
                        mixed(queue)
                    }),
                );
            }
        }
    })
}

impl<T: Clone + 'static> Add for LazyList<T> {
    type Output = LazyList<T>;

    fn add(self, rhs: LazyList<T>) -> LazyList<T> {
        self.append(&rhs)
    }
}

// ============================================================================
// Products
// ============================================================================

impl<T: Clone + 'static> LazyList<T> {
    /// One triangle of the cross product with `other`: every pair `(self[i],
    /// other[j])` with `j <= i`, interleaved so both infinite sources are fair.
    pub fn half_product<U>(&self, other: &LazyList<U>) -> LazyList<(T, U)>
    where
        U: Clone + 'static,
    {
        self.half_product_with(other, |a, b| (a, b))
    }

    /// [`LazyList::half_product`] combining each pair with `f`.
    pub fn half_product_with<U, V, F>(&self, other: &LazyList<U>, f: F) -> LazyList<V>
    where
        U: Clone + 'static,
        V: Clone + 'static,
        F: Fn(T, U) -> V + 'static,
    {
        half(self.clone(), other.clone(), Rc::new(f))
    }

    /// The full cross product with `other`. For two infinite lists every pair
    /// appears at some finite offset.
    ///
    /// ```
    /// use lazylist::LazyList;
    ///
    /// let pairs = LazyList::from(1..=2).product(&LazyList::from(vec!['a', 'b']));
    /// assert_eq!(pairs.to_vec(), vec![(1, 'a'), (1, 'b'), (2, 'a'), (2, 'b')]);
    /// ```
    pub fn product<U>(&self, other: &LazyList<U>) -> LazyList<(T, U)>
    where
        U: Clone + 'static,
    {
        self.product_with(other, |a, b| (a, b))
    }

    /// [`LazyList::product`] combining each pair with `f`.
    pub fn product_with<U, V, F>(&self, other: &LazyList<U>, f: F) -> LazyList<V>
    where
        U: Clone + 'static,
        V: Clone + 'static,
        F: Fn(T, U) -> V + 'static,
    {
        let (left, right) = (self.clone(), other.clone());
        let f: Combine<T, U, V> = Rc::new(f);
        LazyList::delay(move || {
            if left.is_empty() || right.is_empty() {
                return LazyList::empty();
            }
            let lower = {
                let (left, right, f) = (left.clone(), right.clone(), Rc::clone(&f));
                LazyList::delay(move || half(left, right, f))
            };
            let upper = LazyList::delay(move || {
                let swapped: Combine<U, T, V> = Rc::new(move |u, t| f(t, u));
                half(right.tail(), left, swapped)
            });
            LazyList::mix(vec![lower, upper])
        })
    }

    /// Every combination of one element from this list and one from each of
    /// `others`, as vectors in argument order. Enumerated fairly, so infinite
    /// lists are allowed anywhere.
    pub fn cartesian_product(&self, others: &[LazyList<T>]) -> LazyList<Vec<T>> {
        let Some((first, rest)) = others.split_first() else {
            return self.map(|x| vec![x]);
        };
        let pairs = self.product_with(first, |a, b| vec![a, b]);
        rest.iter().fold(pairs, |acc, list| {
            acc.product_with(list, |mut tuple: Vec<T>, x| {
                tuple.push(x);
                tuple
            })
        })
    }

    /// [`LazyList::cartesian_product`] combining each tuple with `f`.
    pub fn cartesian_product_with<U, F>(&self, others: &[LazyList<T>], f: F) -> LazyList<U>
    where
        U: Clone + 'static,
        F: Fn(Vec<T>) -> U + 'static,
    {
        self.cartesian_product(others).map(f)
    }
}

fn half<T, U, V>(left: LazyList<T>, right: LazyList<U>, f: Combine<T, U, V>) -> LazyList<V>
where
    T: Clone + 'static,
    U: Clone + 'static,
    V: Clone + 'static,
{
    LazyList::delay(move || {
        if left.is_empty() || right.is_empty() {
            return LazyList::empty();
        }
        let diagonal = {
            let (left, right, f) = (left.clone(), right.clone(), Rc::clone(&f));
            LazyList::delay(move || zipped(left, right, f))
        };
        let rest = LazyList::delay(move || half(left.tail(), right, f));
        LazyList::mix(vec![diagonal, rest])
    })
}

// ============================================================================
// Sorting
// ============================================================================

impl<T: Clone + Ord + 'static> LazyList<T> {
    /// The elements in ascending order. Only for finite lists; nothing is read
    /// until the result is observed.
    pub fn sorted(&self) -> LazyList<T> {
        let source = self.clone();
        LazyList::delay(move || {
            let mut items = source.to_vec();
            items.sort();
            LazyList::from_values(items)
        })
    }
}

impl<T: Clone + 'static> LazyList<T> {
    /// The elements ordered by `key`, stable for equal keys. Only for finite lists.
    pub fn sorted_by_key<K, F>(&self, key: F) -> LazyList<T>
    where
        K: Ord,
        F: Fn(&T) -> K + 'static,
    {
        let source = self.clone();
        LazyList::delay(move || {
            let mut items = source.to_vec();
            items.sort_by_key(|x| key(x));
            LazyList::from_values(items)
        })
    }
}
