//! # Stream lifecycle state shared between a stream and its observers.
//!
//! Every [`Readable`](crate::Readable) and [`Writable`](crate::Writable) owns a
//! [`Lifecycle`]: a `tokio::sync::watch` cell holding the current [`StreamState`].
//!
//! ## Rules
//! - The state moves from `Open` to exactly one terminal state; later transitions are ignored.
//! - Observers that subscribe late still see the terminal state (watch keeps the last value).
//! - If the lifecycle is dropped before reaching a terminal state, observers get `None`.

use tokio::sync::watch;

use crate::error::SharedError;

/// Lifecycle of a stream.
#[derive(Debug, Clone)]
pub enum StreamState {
    /// Still producing (readable) or accepting writes (writable).
    Open,
    /// Readable side exhausted: every produced item was consumed.
    Ended,
    /// Writable side finished: ended and every buffered write flushed.
    Finished,
    /// The stream failed.
    Errored(SharedError),
}

impl StreamState {
    /// True for every state except [`StreamState::Open`].
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamState::Open)
    }
}

/// Owner side of a stream's state cell.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    tx: watch::Sender<StreamState>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(StreamState::Open);
        Self { tx }
    }

    /// Moves to `next` unless a terminal state was already reached.
    ///
    /// Returns `true` if this call performed the transition.
    pub(crate) fn terminate(&self, next: StreamState) -> bool {
        self.tx.send_if_modified(|cur| {
            if cur.is_terminal() {
                false
            } else {
                *cur = next;
                true
            }
        })
    }

    pub(crate) fn current(&self) -> StreamState {
        self.tx.borrow().clone()
    }

    pub(crate) fn watch(&self) -> StateWatch {
        StateWatch {
            rx: self.tx.subscribe(),
        }
    }
}

/// Passive observer of a stream's lifecycle.
///
/// Holding a `StateWatch` never consumes data; it only reports state.
#[derive(Debug, Clone)]
pub struct StateWatch {
    rx: watch::Receiver<StreamState>,
}

impl StateWatch {
    /// Returns the current state.
    pub fn current(&self) -> StreamState {
        self.rx.borrow().clone()
    }

    /// Waits for the terminal state.
    ///
    /// Returns `None` if the stream was dropped before it reached one.
    pub async fn terminal(mut self) -> Option<StreamState> {
        let state = self.rx.wait_for(StreamState::is_terminal).await.ok()?.clone();
        Some(state)
    }
}
