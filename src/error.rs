//! Error types shared by every part of the crate.

use std::sync::Arc;

use thiserror::Error;

/// Canonical result for lazylist.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed failure reported by an external push source.
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures surface as list elements (`LazyList<Result<T>>`), and list elements are
/// cloned on access, so every payload is shared rather than owned.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("conflicting tail: a list node takes an explicit tail or a deferred tail, not both")]
    ConflictingTail,

    #[error("list node finished without a head value")]
    MissingHead,

    #[error("list builder has no bound variables")]
    NoBindings,

    #[error("push source failed: {0}")]
    Producer(Arc<dyn std::error::Error + Send + Sync + 'static>),

    #[error("push source panicked: {0}")]
    ProducerPanicked(String),

    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),
}

impl Error {
    /// Wrap a failure reported by a push source.
    pub fn producer(err: SourceError) -> Self {
        Error::Producer(Arc::from(err))
    }

    /// True for failures that originate on the producer side of an adapter.
    pub fn is_producer_failure(&self) -> bool {
        matches!(self, Error::Producer(_) | Error::ProducerPanicked(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}
