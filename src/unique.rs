//! Destructive iteration over a list nobody else can see.

use std::fmt;

use crate::list::{Cell, LazyList};

/// A list handle proven to be the only one pointing at its first node.
///
/// Advancing a `UniqueList` rewrites that node in place so it points past the
/// consumed prefix, which lets the prefix be freed while iteration goes on.
/// Lists reachable from the tail may still be shared; only the first node is
/// ever rewritten.
pub struct UniqueList<T> {
    list: LazyList<T>,
}

impl<T> LazyList<T> {
    /// Claim exclusive use of this list for destructive iteration. Hands the
    /// list back unchanged if any other handle shares its first node.
    pub fn into_unique(self) -> std::result::Result<UniqueList<T>, LazyList<T>> {
        if std::rc::Rc::strong_count(&self.node) == 1 {
            Ok(UniqueList { list: self })
        } else {
            Err(self)
        }
    }
}

impl<T: Clone + 'static> UniqueList<T> {
    /// The next element without consuming it.
    pub fn peek(&self) -> Option<T> {
        self.list.head()
    }

    /// The element `n` places ahead without consuming anything.
    pub fn get(&self, n: isize) -> Option<T> {
        self.list.get(n)
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Consume at most `limit` elements (all of them for `None`), passing each
    /// to `f`.
    pub fn each<F>(&mut self, limit: Option<usize>, mut f: F)
    where
        F: FnMut(T),
    {
        let mut remaining = limit;
        while remaining != Some(0) {
            let Some(value) = self.advance() else {
                break;
            };
            f(value);
            remaining = remaining.map(|r| r - 1);
        }
    }

    /// Consume the next `n` elements and return them.
    pub fn take(&mut self, n: usize) -> Vec<T> {
        let mut taken = Vec::with_capacity(n);
        self.each(Some(n), |x| taken.push(x));
        taken
    }

    /// Consume and discard the next `n` elements.
    pub fn drop(&mut self, n: usize) {
        self.each(Some(n), |_| {});
    }

    /// Give up exclusivity. The returned list starts at the current position.
    pub fn into_list(self) -> LazyList<T> {
        self.list
    }

    fn advance(&mut self) -> Option<T> {
        let (head, tail) = self.list.uncons()?;
        let value = head.force().clone();
        let rest = tail.force().clone();
        let cell = match rest.uncons() {
            None => Cell::Empty,
            Some((head, tail)) => Cell::Cons { head, tail },
        };
        self.list.replace_cell(cell);
        tracing::trace!("evicted consumed head");
        Some(value)
    }
}

impl<T: Clone + 'static> Iterator for UniqueList<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.advance()
    }
}

impl<T: fmt::Debug> fmt::Debug for UniqueList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UniqueList").field(&self.list).finish()
    }
}
