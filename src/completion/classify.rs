//! # Completion classifier.
//!
//! Turns a job's [`Returned`] value into a tagged [`Shape`] naming the signal the run
//! waits for. All inspection rules live here:
//!
//! ```text
//! sink && source  ──► Duplex    (done when the sink finishes)
//! sink            ──► Writable  (done when the sink finishes)
//! source          ──► Readable  (done when the source is exhausted; drained)
//! continuation    ──► Future    (done when it resolves)
//! otherwise       ──► Empty     (done immediately)
//! ```
//!
//! Stream capabilities take precedence over a continuation. A value exposing no
//! recognised capability is `Empty`; that is a heuristic limit, not an error.
//! Callback jobs never reach the classifier: declaring the callback decides.

use std::fmt;
use std::sync::Arc;

use crate::completion::capability::{Continuation, Returned, Sink, Source};

/// How the run detects completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMethod {
    /// The job invoked its `Done` callback.
    Callback,
    /// A returned future resolved.
    Future,
    /// A returned stream reached its terminal state.
    Stream,
    /// Nothing to wait for.
    Sync,
}

impl RunMethod {
    /// Short stable label for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RunMethod::Callback => "callback",
            RunMethod::Future => "future",
            RunMethod::Stream => "stream",
            RunMethod::Sync => "sync",
        }
    }
}

/// Classified return value.
pub enum Shape {
    /// No completion capability.
    Empty,
    /// Continuation settling once.
    Future(Continuation),
    /// Pull source only.
    Readable(Arc<dyn Source>),
    /// Push sink only.
    Writable(Arc<dyn Sink>),
    /// Source and sink together.
    Duplex {
        /// Pull side, drained but not waited on.
        source: Arc<dyn Source>,
        /// Push side, defines completion.
        sink: Arc<dyn Sink>,
    },
}

impl Shape {
    /// Method recorded for runs completing through this shape.
    pub fn method(&self) -> RunMethod {
        match self {
            Shape::Empty => RunMethod::Sync,
            Shape::Future(_) => RunMethod::Future,
            Shape::Readable(_) | Shape::Writable(_) | Shape::Duplex { .. } => RunMethod::Stream,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Shape::Empty => "empty",
            Shape::Future(_) => "future",
            Shape::Readable(_) => "readable",
            Shape::Writable(_) => "writable",
            Shape::Duplex { .. } => "duplex",
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifies a returned value. First match wins, see the module docs.
pub fn classify(returned: Returned) -> Shape {
    let Some(value) = returned.into_inner() else {
        return Shape::Empty;
    };

    let shape = match (value.source(), value.sink()) {
        (Some(source), Some(sink)) => Shape::Duplex { source, sink },
        (None, Some(sink)) => Shape::Writable(sink),
        (Some(source), None) => Shape::Readable(source),
        (None, None) => match value.into_future() {
            Some(fut) => Shape::Future(fut),
            None => {
                tracing::debug!("returned value exposes no completion capability; treating as sync");
                Shape::Empty
            }
        },
    };
    tracing::trace!(shape = shape.label(), "classified return value");
    shape
}
