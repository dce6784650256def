//! # Completion capabilities of a job's return value.
//!
//! A returning job hands back a [`Returned`], an erased value whose
//! [`Capabilities`] say how it will signal completion:
//! - [`Capabilities::source`] a pull-based [`Source`] (terminal: exhausted / error)
//! - [`Capabilities::sink`] a push-based [`Sink`] (terminal: finished / error)
//! - [`Capabilities::into_future`] a continuation settling once
//!
//! Every probe defaults to "absent", so a type implementing none of them is
//! treated as synchronous. The built-in stream types implement the trait, and
//! `From` conversions exist for `()`, [`Readable`], [`Writable`] and [`Duplex`].

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::{BoxError, TaskError};
use crate::streams::{Duplex, Readable, StateWatch, Writable};

/// Type-erased pull-based source.
pub trait Source: Send + Sync + 'static {
    /// True if another consumer already reads this source.
    fn is_flowing(&self) -> bool;

    /// Takes over a paused source, discarding its items.
    ///
    /// Returns `false` without side effects if the source is already flowing.
    fn resume(&self) -> bool;

    /// Passive observer of the source's lifecycle.
    fn watch(&self) -> StateWatch;
}

/// Type-erased push-based sink.
pub trait Sink: Send + Sync + 'static {
    /// Passive observer of the sink's lifecycle.
    fn watch(&self) -> StateWatch;
}

/// Boxed continuation of a future-returning job.
pub type Continuation = BoxFuture<'static, Result<(), TaskError>>;

/// Completion probes of a returned value.
pub trait Capabilities: Send + 'static {
    /// Pull side, if any.
    fn source(&self) -> Option<Arc<dyn Source>> {
        None
    }

    /// Push side, if any.
    fn sink(&self) -> Option<Arc<dyn Sink>> {
        None
    }

    /// Continuation, if any. Consumes the value.
    fn into_future(self: Box<Self>) -> Option<Continuation> {
        None
    }
}

/// Value returned by a job.
pub struct Returned {
    value: Option<Box<dyn Capabilities>>,
}

impl Returned {
    /// No value: the job completed synchronously.
    pub fn empty() -> Self {
        Self { value: None }
    }

    /// Wraps any value exposing completion capabilities.
    pub fn new(value: impl Capabilities) -> Self {
        Self {
            value: Some(Box::new(value)),
        }
    }

    /// Wraps a future; the run settles when it resolves.
    pub fn future<F, E>(fut: F) -> Self
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::new(Promise(fut.map(|r| r.map_err(TaskError::fail)).boxed()))
    }

    pub(crate) fn into_inner(self) -> Option<Box<dyn Capabilities>> {
        self.value
    }
}

impl std::fmt::Debug for Returned {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Returned")
            .field("empty", &self.value.is_none())
            .finish()
    }
}

struct Promise(Continuation);

impl Capabilities for Promise {
    fn into_future(self: Box<Self>) -> Option<Continuation> {
        Some(self.0)
    }
}

impl<T: Send + 'static> Capabilities for Readable<T> {
    fn source(&self) -> Option<Arc<dyn Source>> {
        Some(Arc::new(self.clone()))
    }
}

impl<T: Send + 'static> Capabilities for Writable<T> {
    fn sink(&self) -> Option<Arc<dyn Sink>> {
        Some(Arc::new(self.clone()))
    }
}

impl<T: Send + 'static> Capabilities for Duplex<T> {
    fn source(&self) -> Option<Arc<dyn Source>> {
        Some(Arc::new(self.readable().clone()))
    }

    fn sink(&self) -> Option<Arc<dyn Sink>> {
        Some(Arc::new(self.writable().clone()))
    }
}

impl From<()> for Returned {
    fn from(_: ()) -> Self {
        Returned::empty()
    }
}

impl<T: Send + 'static> From<Readable<T>> for Returned {
    fn from(rs: Readable<T>) -> Self {
        Returned::new(rs)
    }
}

impl<T: Send + 'static> From<Writable<T>> for Returned {
    fn from(ws: Writable<T>) -> Self {
        Returned::new(ws)
    }
}

impl<T: Send + 'static> From<Duplex<T>> for Returned {
    fn from(dx: Duplex<T>) -> Self {
        Returned::new(dx)
    }
}
