//! List comprehensions over named sources.
//!
//! A [`ListBuilder`] binds variable names to lists and describes each output
//! element as a transform of the bound values, optionally guarded by a filter.
//! Zipped builders walk their sources in lockstep; comprehended builders range
//! over every combination, in the same fair order as
//! [`LazyList::cartesian_product`].
//!
//! ```
//! use lazylist::{Bindings, ListBuilder};
//!
//! let sums = ListBuilder::zipped(|b: &Bindings<i32>| b["x"] + b["y"])
//!     .bind("x", vec![1, 2, 3])
//!     .bind("y", vec![1, 2, 3])
//!     .build()
//!     .unwrap();
//! assert_eq!(sums.to_vec(), vec![2, 4, 6]);
//! ```

use std::fmt;
use std::ops::Index;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::list::LazyList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One output per offset, while every source lasts.
    Zipped,
    /// One output per combination of source elements.
    Comprehended,
}

// ============================================================================
// Bindings
// ============================================================================

/// The values bound to each variable for one output element.
pub struct Bindings<T> {
    names: Rc<FxHashMap<String, usize>>,
    values: Vec<T>,
}

impl<T: Clone> Clone for Bindings<T> {
    fn clone(&self) -> Self {
        Bindings {
            names: Rc::clone(&self.names),
            values: self.values.clone(),
        }
    }
}

impl<T> Bindings<T> {
    pub fn get(&self, name: &str) -> Option<&T> {
        self.names.get(name).and_then(|&i| self.values.get(i))
    }

    /// Values in binding order.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }
}

impl<T> Index<&str> for Bindings<T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if `name` is not bound.
    fn index(&self, name: &str) -> &T {
        match self.get(name) {
            Some(v) => v,
            None => panic!("unbound variable `{name}`"),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Bindings<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ordered: Vec<(&String, &usize)> = self.names.iter().collect();
        ordered.sort_by_key(|&(_, i)| *i);
        let mut map = f.debug_map();
        for (name, &i) in ordered {
            if let Some(v) = self.values.get(i) {
                map.entry(name, v);
            }
        }
        map.finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

type Transform<T, U> = Rc<dyn Fn(&Bindings<T>) -> U>;
type Filter<T> = Rc<dyn Fn(&Bindings<T>) -> bool>;

pub struct ListBuilder<T, U> {
    mode: Mode,
    variables: Vec<(String, LazyList<T>)>,
    transform: Transform<T, U>,
    filter: Option<Filter<T>>,
}

impl<T: Clone + 'static, U: Clone + 'static> ListBuilder<T, U> {
    /// A builder that walks its sources in lockstep.
    pub fn zipped<F>(transform: F) -> Self
    where
        F: Fn(&Bindings<T>) -> U + 'static,
    {
        Self::new(Mode::Zipped, Rc::new(transform))
    }

    /// A builder over every combination of its sources.
    pub fn comprehended<F>(transform: F) -> Self
    where
        F: Fn(&Bindings<T>) -> U + 'static,
    {
        Self::new(Mode::Comprehended, Rc::new(transform))
    }

    fn new(mode: Mode, transform: Transform<T, U>) -> Self {
        ListBuilder {
            mode,
            variables: Vec::new(),
            transform,
            filter: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Bind `name` to `source`. Rebinding a name swaps its source but keeps its
    /// position.
    pub fn bind<S>(mut self, name: impl Into<String>, source: S) -> Self
    where
        S: Into<LazyList<T>>,
    {
        let name = name.into();
        let source = source.into();
        match self.variables.iter_mut().find(|(bound, _)| *bound == name) {
            Some(slot) => slot.1 = source,
            None => self.variables.push((name, source)),
        }
        self
    }

    /// Skip outputs whose bindings fail `predicate`.
    pub fn filter<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Bindings<T>) -> bool + 'static,
    {
        self.filter = Some(Rc::new(predicate));
        self
    }

    /// Bound variable names, in binding order.
    pub fn variables(&self) -> Vec<&str> {
        self.variables.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// The output list. Nothing is read from the sources until it is observed.
    ///
    /// # Errors
    ///
    /// [`Error::NoBindings`] if no variable has been bound.
    pub fn build(&self) -> Result<LazyList<U>> {
        let Some(((_, first), rest)) = self.variables.split_first() else {
            return Err(Error::NoBindings);
        };
        let names: Rc<FxHashMap<String, usize>> = Rc::new(
            self.variables
                .iter()
                .enumerate()
                .map(|(i, (name, _))| (name.clone(), i))
                .collect(),
        );
        let bind = move |values: Vec<T>| Bindings {
            names: Rc::clone(&names),
            values,
        };

        let rows = match self.mode {
            Mode::Zipped => {
                let sources = self.variables.iter().map(|(_, list)| list.clone()).collect();
                LazyList::zip_all_with(sources, bind)
            }
            Mode::Comprehended => {
                let others: Vec<LazyList<T>> = rest.iter().map(|(_, list)| list.clone()).collect();
                first.cartesian_product_with(&others, bind)
            }
        };
        let rows = match &self.filter {
            Some(filter) => {
                let filter = Rc::clone(filter);
                rows.select(move |b: &Bindings<T>| filter(b))
            }
            None => rows,
        };
        let transform = Rc::clone(&self.transform);
        Ok(rows.map(move |b| transform(&b)))
    }
}
