use super::ReadQueue;
use crate::error::Result;

/// Pull queue over a native iterator. Once the iterator reports its end the
/// queue stays exhausted, even if the iterator would produce more.
pub struct IterQueue<I> {
    iter: I,
    exhausted: bool,
}

impl<I: Iterator> IterQueue<I> {
    pub fn new(iter: I) -> Self {
        IterQueue {
            iter,
            exhausted: false,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn pull(&mut self) -> Option<I::Item> {
        if self.exhausted {
            return None;
        }
        let next = self.iter.next();
        if next.is_none() {
            self.exhausted = true;
        }
        next
    }
}

impl<I: Iterator> ReadQueue for IterQueue<I> {
    type Item = I::Item;

    fn shift(&mut self) -> Result<Option<I::Item>> {
        Ok(self.pull())
    }
}
