//! Factory constructors for lazy lists.

use std::cell::RefCell;
use std::io::BufRead;
use std::ops::{Range, RangeFrom, RangeInclusive};
use std::rc::Rc;

use num_bigint::{BigInt, BigUint};
use num_traits::One;
use once_cell::unsync::OnceCell;

use crate::error::Result;
use crate::list::LazyList;
use crate::promise::Promise;

// ============================================================================
// Successor
// ============================================================================

/// Values with a "next" value, used by counting constructors and ranges.
pub trait Successor {
    fn succ(&self) -> Self;
}

macro_rules! int_successor {
    ($($t:ty),*) => {
        $(
            impl Successor for $t {
                fn succ(&self) -> Self {
                    self + 1
                }
            }
        )*
    };
}

int_successor!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Successor for BigInt {
    fn succ(&self) -> Self {
        self + BigInt::one()
    }
}

impl Successor for BigUint {
    fn succ(&self) -> Self {
        self + BigUint::one()
    }
}

impl Successor for char {
    /// The next Unicode scalar value, skipping the surrogate gap. `char::MAX`
    /// stays put.
    fn succ(&self) -> Self {
        let mut code = *self as u32 + 1;
        if (0xD800..=0xDFFF).contains(&code) {
            code = 0xE000;
        }
        char::from_u32(code).unwrap_or(*self)
    }
}

impl Successor for String {
    /// Increments the rightmost alphanumeric run with carry: `"a"` -> `"b"`,
    /// `"az"` -> `"ba"`, `"zz"` -> `"aaa"`, `"a9"` -> `"b0"`. Strings without
    /// alphanumerics bump their last character.
    fn succ(&self) -> Self {
        let mut chars: Vec<char> = self.chars().collect();
        let Some(mut i) = chars.iter().rposition(|c| c.is_ascii_alphanumeric()) else {
            return match chars.pop() {
                Some(last) => {
                    chars.push(last.succ());
                    chars.into_iter().collect()
                }
                None => String::new(),
            };
        };
        loop {
            let (next, carry) = match chars[i] {
                'z' => ('a', Some('a')),
                'Z' => ('A', Some('A')),
                '9' => ('0', Some('1')),
                c => (c.succ(), None),
            };
            chars[i] = next;
            let Some(prefix) = carry else {
                break;
            };
            match chars[..i].iter().rposition(|c| c.is_ascii_alphanumeric()) {
                Some(j) => i = j,
                None => {
                    chars.insert(i, prefix);
                    break;
                }
            }
        }
        chars.into_iter().collect()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl<T: Clone + 'static> LazyList<T> {
    /// A finite list of explicit values.
    pub fn from_values(values: Vec<T>) -> Self {
        prepend(values, LazyList::empty())
    }

    /// Explicit values continued by a tail computed once the values run out.
    pub fn from_values_then<F>(values: Vec<T>, rest: F) -> Self
    where
        F: FnOnce() -> LazyList<T> + 'static,
    {
        prepend(values, LazyList::delay(rest))
    }

    /// `seed, f(seed), f(f(seed)), ...`
    pub fn iterate<F>(seed: T, f: F) -> Self
    where
        F: Fn(&T) -> T + 'static,
    {
        iterated(seed, Rc::new(f))
    }

    /// A list built recursively from a forward reference to itself.
    ///
    /// `define` receives a [`Knot`] that stands for the finished list; it may be
    /// captured in deferred tails but must not be forced while `define` runs.
    ///
    /// ```
    /// use lazylist::LazyList;
    ///
    /// let ones = LazyList::recursive(|me| LazyList::cons_with(1, move || me.list()));
    /// assert_eq!(ones.take(3), vec![1, 1, 1]);
    /// ```
    pub fn recursive<F>(define: F) -> Self
    where
        F: FnOnce(Knot<T>) -> LazyList<T>,
    {
        let knot = Knot {
            slot: Rc::new(OnceCell::new()),
        };
        let list = define(knot.clone());
        let _ = knot.slot.set(list.clone());
        list
    }
}

impl<T: Clone + Successor + 'static> LazyList<T> {
    /// `n` successive values starting at `start`.
    pub fn span(start: T, n: usize) -> Self {
        // The successor of the last value is never computed, so a span may end
        // at the largest value of its type.
        LazyList::delay(move || match n {
            0 => LazyList::empty(),
            1 => LazyList::cons(start, LazyList::empty()),
            _ => {
                let current = start.clone();
                LazyList::cons_with(start, move || LazyList::span(current.succ(), n - 1))
            }
        })
    }

    /// `start, start.succ(), ...` without end.
    pub fn count_from(start: T) -> Self {
        let next = start.clone();
        LazyList::from_promises(
            Promise::ready(start),
            Promise::new(move || LazyList::count_from(next.succ())),
        )
    }

    /// `f(start), f(start.succ()), ...` without end.
    pub fn tabulate<U, F>(start: T, f: F) -> LazyList<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> U + 'static,
    {
        tabulated(start, Rc::new(f))
    }
}

fn prepend<T: Clone + 'static>(values: Vec<T>, tail: LazyList<T>) -> LazyList<T> {
    values
        .into_iter()
        .rev()
        .fold(tail, |rest, value| LazyList::cons(value, rest))
}

fn iterated<T: Clone + 'static>(seed: T, f: Rc<dyn Fn(&T) -> T>) -> LazyList<T> {
    let current = seed.clone();
    LazyList::from_promises(
        Promise::ready(seed),
        Promise::new(move || {
            let next = f(&current);
            iterated(next, f)
        }),
    )
}

fn tabulated<T, U>(index: T, f: Rc<dyn Fn(&T) -> U>) -> LazyList<U>
where
    T: Clone + Successor + 'static,
    U: Clone + 'static,
{
    let at = index.clone();
    let g = Rc::clone(&f);
    LazyList::from_promises(
        Promise::new(move || g(&at)),
        Promise::new(move || tabulated(index.succ(), f)),
    )
}

fn bounded<T>(start: T, end: T, inclusive: bool) -> LazyList<T>
where
    T: Clone + Successor + PartialOrd + 'static,
{
    LazyList::delay(move || {
        let past_end = if inclusive { start > end } else { start >= end };
        if past_end {
            return LazyList::empty();
        }
        if inclusive && start == end {
            return LazyList::cons(start, LazyList::empty());
        }
        let next = start.succ();
        LazyList::cons_with(start, move || bounded(next, end, inclusive))
    })
}

impl<T: Clone + Successor + PartialOrd + 'static> From<Range<T>> for LazyList<T> {
    fn from(r: Range<T>) -> Self {
        bounded(r.start, r.end, false)
    }
}

impl<T: Clone + Successor + PartialOrd + 'static> From<RangeInclusive<T>> for LazyList<T> {
    fn from(r: RangeInclusive<T>) -> Self {
        let (start, end) = r.into_inner();
        bounded(start, end, true)
    }
}

impl<T: Clone + Successor + 'static> From<RangeFrom<T>> for LazyList<T> {
    fn from(r: RangeFrom<T>) -> Self {
        LazyList::count_from(r.start)
    }
}

impl<T: Clone + 'static> From<Vec<T>> for LazyList<T> {
    fn from(values: Vec<T>) -> Self {
        LazyList::from_values(values)
    }
}

impl<T: Clone + 'static> FromIterator<T> for LazyList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        LazyList::from_values(iter.into_iter().collect())
    }
}

// ============================================================================
// Knot
// ============================================================================

/// A forward reference to a list that is still being defined.
///
/// The knot owns the finished list, so a recursively defined list lives as long
/// as any of its cells does.
pub struct Knot<T> {
    slot: Rc<OnceCell<LazyList<T>>>,
}

impl<T> Clone for Knot<T> {
    fn clone(&self) -> Self {
        Knot {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: 'static> Knot<T> {
    /// The finished list, once `recursive` has returned.
    pub fn get(&self) -> Option<LazyList<T>> {
        self.slot.get().cloned()
    }

    /// A deferred alias for the finished list.
    ///
    /// # Panics
    ///
    /// Forcing the alias before the definition has returned panics.
    pub fn list(&self) -> LazyList<T> {
        if let Some(list) = self.slot.get() {
            return list.clone();
        }
        let slot = Rc::clone(&self.slot);
        LazyList::delay(move || match slot.get() {
            Some(list) => list.clone(),
            None => panic!("recursive list forced before its definition returned"),
        })
    }
}

// ============================================================================
// Readers
// ============================================================================

impl<T: Clone + 'static> LazyList<Result<T>> {
    /// Elements read from `reader` with `step`, one per cell, until end of stream.
    ///
    /// The reader is checked for end of stream before each step. A failed check or
    /// step becomes a final `Err` element. The caller keeps ownership of whatever
    /// `reader` wraps.
    pub fn from_reader<R, F>(reader: R, step: F) -> Self
    where
        R: BufRead + 'static,
        F: Fn(&mut R) -> Result<T> + 'static,
    {
        read_cells(Rc::new(RefCell::new(reader)), Rc::new(step))
    }
}

impl LazyList<Result<String>> {
    /// Lines of `reader`, line terminators included.
    pub fn lines<R: BufRead + 'static>(reader: R) -> Self {
        LazyList::from_reader(reader, |r: &mut R| {
            let mut line = String::new();
            r.read_line(&mut line)?;
            Ok(line)
        })
    }
}

type Step<R, T> = Rc<dyn Fn(&mut R) -> Result<T>>;

fn read_cells<R, T>(reader: Rc<RefCell<R>>, step: Step<R, T>) -> LazyList<Result<T>>
where
    R: BufRead + 'static,
    T: Clone + 'static,
{
    LazyList::delay(move || {
        let item = {
            let mut r = reader.borrow_mut();
            let at_end = r.fill_buf().map(|buf| buf.is_empty());
            match at_end {
                Ok(true) => return LazyList::empty(),
                Ok(false) => step(&mut *r),
                Err(e) => Err(e.into()),
            }
        };
        match item {
            Ok(value) => LazyList::cons_with(Ok(value), move || read_cells(reader, step)),
            Err(e) => LazyList::cons(Err(e), LazyList::empty()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_integer_successor() {
        assert_eq!(1u8.succ(), 2);
        assert_eq!((-1i64).succ(), 0);
        assert_eq!(BigInt::from(-1).succ(), BigInt::from(0));
    }

    #[test]
    fn test_char_successor_skips_surrogates() {
        assert_eq!('a'.succ(), 'b');
        assert_eq!('\u{D7FF}'.succ(), '\u{E000}');
        assert_eq!(char::MAX.succ(), char::MAX);
    }

    #[test]
    fn test_string_successor_carries() {
        assert_eq!("a".to_string().succ(), "b");
        assert_eq!("az".to_string().succ(), "ba");
        assert_eq!("zz".to_string().succ(), "aaa");
        assert_eq!("Zz".to_string().succ(), "AAa");
        assert_eq!("a9".to_string().succ(), "b0");
        assert_eq!("99".to_string().succ(), "100");
        assert_eq!("v-z".to_string().succ(), "w-a");
        assert_eq!("".to_string().succ(), "");
        assert_eq!("-".to_string().succ(), ".");
    }

    #[test]
    fn test_span_ending_at_type_maximum() {
        assert_eq!(LazyList::span(u8::MAX, 1).to_vec(), vec![255u8]);
        assert_eq!(LazyList::span(i32::MAX - 2, 3).to_vec(), vec![i32::MAX - 2, i32::MAX - 1, i32::MAX]);
        assert_eq!(LazyList::from(250u8..=u8::MAX).len(), 6);
        assert_eq!(LazyList::from(254u8..u8::MAX).to_vec(), vec![254]);
    }

    #[test]
    fn test_ranges() {
        assert_eq!(LazyList::from(0..0).to_vec(), Vec::<i32>::new());
        assert_eq!(LazyList::from(0..=0).to_vec(), vec![0]);
        assert_eq!(LazyList::from(0..=-1).to_vec(), Vec::<i32>::new());
        assert_eq!(LazyList::from(1..4).to_vec(), vec![1, 2, 3]);
        assert_eq!(LazyList::from('a'..='e').len(), 5);
        assert_eq!(LazyList::from(5u64..).take(3), vec![5, 6, 7]);
    }

    #[test]
    fn test_lines_keep_terminators() {
        let lines = LazyList::lines(Cursor::new("1\n2\n3\n"));
        let got: Vec<String> = lines.iter().map(|l| l.unwrap()).collect();
        assert_eq!(got, vec!["1\n", "2\n", "3\n"]);
        assert!(LazyList::lines(Cursor::new("")).is_empty());
    }
}
