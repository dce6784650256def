//! # Single-fire outcome of one run.
//!
//! [`Outcome`] is the settlement point every completion signal of a run writes to:
//! the `Done` callback, a future's resolution, a stream's terminal state.
//!
//! ## Rules
//! - At most **one** settlement ever happens; later calls return `false` and change nothing.
//! - Settling cancels the run's listener [scope](Outcome::scope) and moves the run
//!   state to `Completed` / `Failed` **before** the result is delivered.
//! - If every `Outcome` handle is dropped unsettled, the run settles with
//!   [`TaskError::Abandoned`].
//!
//! ```text
//! Done::call ─────┐
//! future ready ───┼──► Outcome::settle ──► (first wins) ──► OutcomeFuture
//! stream terminal ┘          │
//!                            ├──► scope.cancel()  (listeners detach)
//!                            └──► RunState::Completed | Failed
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::FutureExt;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Not started yet.
    Idle,
    /// Job invoked, outcome not settled.
    Running,
    /// Settled without error.
    Completed,
    /// Settled with an error.
    Failed,
}

impl RunState {
    #[inline]
    fn settled(res: &Result<(), TaskError>) -> Self {
        if res.is_ok() {
            RunState::Completed
        } else {
            RunState::Failed
        }
    }
}

struct Inner {
    tx: Mutex<Option<oneshot::Sender<Result<(), TaskError>>>>,
    state: watch::Sender<RunState>,
    scope: CancellationToken,
}

impl Inner {
    fn deliver(&self, res: Result<(), TaskError>) -> bool {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(tx) = tx else {
            return false;
        };
        self.scope.cancel();
        self.state.send_replace(RunState::settled(&res));
        let _ = tx.send(res);
        true
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.deliver(Err(TaskError::Abandoned));
    }
}

/// Settlement handle of one run. Cheap to clone.
#[derive(Clone)]
pub struct Outcome {
    inner: Arc<Inner>,
}

impl Outcome {
    /// Creates an unsettled outcome reporting to `state`.
    pub fn new(state: watch::Sender<RunState>) -> (Self, OutcomeFuture) {
        let (tx, rx) = oneshot::channel();
        let outcome = Self {
            inner: Arc::new(Inner {
                tx: Mutex::new(Some(tx)),
                state,
                scope: CancellationToken::new(),
            }),
        };
        (outcome, OutcomeFuture { rx })
    }

    /// Settles the outcome if nothing settled it before.
    ///
    /// Returns `true` if this call was the settling one.
    pub fn settle(&self, res: Result<(), TaskError>) -> bool {
        self.inner.deliver(res)
    }

    /// True once the outcome was settled.
    pub fn is_settled(&self) -> bool {
        self.inner
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Token cancelled on settlement; listener tasks stop when it fires.
    pub fn scope(&self) -> &CancellationToken {
        &self.inner.scope
    }
}

/// Resolves with the settled result exactly once.
pub struct OutcomeFuture {
    rx: oneshot::Receiver<Result<(), TaskError>>,
}

impl Future for OutcomeFuture {
    type Output = Result<(), TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.rx
            .poll_unpin(cx)
            .map(|res| res.unwrap_or(Err(TaskError::Abandoned)))
    }
}
