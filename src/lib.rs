//! Lazy, memoizing cons lists.
//!
//! Elements and tails are [`Promise`]s computed at most once, so lists may be
//! infinite, may refer to themselves, and can be combined (merged, zipped,
//! interleaved, crossed) without evaluating anything up front.
//!
//! ```
//! use lazylist::LazyList;
//!
//! let odds = LazyList::count_from(1u64).select(|x| x % 2 == 1);
//! assert_eq!(odds.take(3), vec![1, 3, 5]);
//! ```

pub mod adapter;
pub mod builder;
pub mod combinators;
pub mod config;
pub mod construct;
pub mod error;
pub mod list;
pub mod promise;
pub mod unique;

// Re-export commonly used items for convenience
pub use adapter::{Flow, PushSource, ReadQueue, source_fn};
pub use builder::{Bindings, ListBuilder, Mode};
pub use combinators::Verdict;
pub use config::Config;
pub use construct::{Knot, Successor};
pub use error::{Error, Result};
pub use list::{Iter, LazyList, NodeBuilder};
pub use promise::{Lazy, Promise};
pub use unique::UniqueList;
