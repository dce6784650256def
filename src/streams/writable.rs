//! # Push-based data sink with a bounded buffer.
//!
//! [`Writable`] accepts items through [`Writable::write`] and feeds them, in order,
//! into any [`futures::Sink`] on a dedicated worker task.
//!
//! ## Lifecycle
//! ```text
//! write(a) ─┐
//! write(b) ─┼─► [buffer: high_water_mark] ──► worker ──► sink.send(item)
//! end()   ──┘                                     └────► sink.close() ──► Finished
//!                                                 └────► sink error   ──► Errored
//! ```
//!
//! ## Rules
//! - `write` waits while the buffer is full (backpressure).
//! - `Finished` fires only after `end()` **and** every buffered item was flushed.
//! - A sink error or a panic in the sink stops the worker; further writes fail.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures::{FutureExt, Sink, SinkExt};
use tokio::sync::mpsc;

use crate::completion::Sink as SinkSide;
use crate::error::{BoxError, SharedError, StreamError, panic_info};
use crate::streams::state::{Lifecycle, StateWatch, StreamState};

struct Shared<T> {
    input: Mutex<Option<mpsc::Sender<T>>>,
    lifecycle: Arc<Lifecycle>,
}

/// Push-based sink of `T` items.
///
/// Cloning yields another handle to the same sink.
pub struct Writable<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Writable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> Writable<T> {
    /// Creates a sink that hands every item to `write`.
    ///
    /// ## Example
    /// ```rust
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// use orchestrator::{StreamState, Writable};
    ///
    /// let ws = Writable::new(4, |line: String| {
    ///     println!("{line}");
    ///     Ok::<_, std::io::Error>(())
    /// });
    /// ws.write("hello".to_string()).await.unwrap();
    /// ws.end();
    /// assert!(matches!(ws.watch().terminal().await, Some(StreamState::Finished)));
    /// # }
    /// ```
    pub fn new<F, E>(high_water_mark: usize, write: F) -> Self
    where
        F: FnMut(T) -> Result<(), E> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let sink = futures::sink::unfold(write, |mut write, item: T| async move {
            let res = write(item);
            res.map(|()| write)
        });
        Self::from_sink(high_water_mark, sink)
    }

    /// Creates a sink feeding `sink` from a bounded buffer.
    ///
    /// Spawns the worker task; must be called within a tokio runtime.
    pub fn from_sink<S>(high_water_mark: usize, sink: S) -> Self
    where
        S: Sink<T> + Send + 'static,
        S::Error: Into<BoxError>,
    {
        let (tx, mut rx) = mpsc::channel::<T>(high_water_mark.max(1));
        let lifecycle = Arc::new(Lifecycle::new());
        let worker = Arc::clone(&lifecycle);

        tokio::spawn(async move {
            let flush = async {
                let mut sink = std::pin::pin!(sink);
                while let Some(item) = rx.recv().await {
                    if let Err(e) = sink.send(item).await {
                        worker.terminate(StreamState::Errored(Arc::from(e.into())));
                        return;
                    }
                }
                match sink.close().await {
                    Ok(()) => worker.terminate(StreamState::Finished),
                    Err(e) => worker.terminate(StreamState::Errored(Arc::from(e.into()))),
                };
            };
            if let Err(payload) = AssertUnwindSafe(flush).catch_unwind().await {
                let err = StreamError::Panicked(panic_info(&*payload));
                worker.terminate(StreamState::Errored(Arc::new(err)));
            }
            // Writers blocked on a full buffer see the terminal state once this closes.
            drop(rx);
        });

        Self {
            shared: Arc::new(Shared {
                input: Mutex::new(Some(tx)),
                lifecycle,
            }),
        }
    }

    /// Writes one item, waiting while the buffer is full.
    pub async fn write(&self, item: T) -> Result<(), StreamError> {
        let tx = self
            .shared
            .input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(StreamError::Ended)?;

        tx.send(item).await.map_err(|_| match self.state() {
            StreamState::Errored(e) => StreamError::Errored(e),
            _ => StreamError::Closed,
        })
    }

    /// Signals that no more items will be written.
    ///
    /// Idempotent. Writes already waiting for buffer space still complete.
    pub fn end(&self) {
        self.shared
            .input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Fails the sink with `error` unless it already reached a terminal state.
    pub fn destroy(&self, error: impl Into<BoxError>) -> bool {
        self.fail(Arc::from(error.into()))
    }

    pub(crate) fn fail(&self, error: SharedError) -> bool {
        self.end();
        self.shared.lifecycle.terminate(StreamState::Errored(error))
    }

    /// True once [`Writable::end`] was called.
    pub fn is_ended(&self) -> bool {
        self.shared
            .input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.shared.lifecycle.current()
    }

    /// Passive lifecycle observer.
    pub fn watch(&self) -> StateWatch {
        self.shared.lifecycle.watch()
    }
}

impl<T: Send + 'static> SinkSide for Writable<T> {
    fn watch(&self) -> StateWatch {
        Writable::watch(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn finishes_after_end_and_flush() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let ws = Writable::new(2, move |_: u32| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, StreamError>(())
        });

        for i in 0..10 {
            ws.write(i).await.unwrap();
        }
        assert!(!ws.state().is_terminal());
        ws.end();

        assert!(matches!(
            ws.watch().terminal().await,
            Some(StreamState::Finished)
        ));
        assert_eq!(seen.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn write_after_end_fails() {
        let ws = Writable::new(2, |_: u8| Ok::<_, StreamError>(()));
        ws.end();
        assert!(ws.is_ended());
        assert!(matches!(ws.write(1).await, Err(StreamError::Ended)));
    }

    #[tokio::test]
    async fn sink_error_is_terminal() {
        let ws = Writable::new(1, |n: u8| {
            if n == 3 {
                Err(StreamError::Closed)
            } else {
                Ok(())
            }
        });
        for n in 0..4 {
            let _ = ws.write(n).await;
        }
        match ws.watch().terminal().await {
            Some(StreamState::Errored(e)) => assert_eq!(e.to_string(), "stream closed"),
            other => panic!("unexpected state: {other:?}"),
        }
        assert!(ws.write(9).await.is_err());
    }

    #[tokio::test]
    async fn panicking_sink_errors_instead_of_finishing() {
        let ws = Writable::new(1, |n: u8| {
            if n == 2 {
                panic!("codec bug");
            }
            Ok::<_, StreamError>(())
        });
        for n in 0..4 {
            let _ = ws.write(n).await;
        }
        ws.end();

        match ws.watch().terminal().await {
            Some(StreamState::Errored(e)) => {
                assert_eq!(e.to_string(), "stream worker panicked: codec bug")
            }
            other => panic!("unexpected state: {other:?}"),
        }
        assert!(ws.write(9).await.is_err());
    }
}
