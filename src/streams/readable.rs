//! # Pull-based data source with a bounded buffer.
//!
//! [`Readable`] wraps any [`futures::Stream`] behind a producer task that fills a
//! bounded buffer of `high_water_mark` items. The producer stalls once the buffer is
//! full, so a source nobody reads from never reaches [`StreamState::Ended`].
//!
//! ## Consumption modes
//! ```text
//!   paused ──► resume()       ──► flowing (items discarded)
//!          ──► pipe(dest)     ──► flowing (items forwarded to dest)
//!          ──► take_stream()  ──► flowing (items handed to the caller)
//! ```
//!
//! ## Rules
//! - At most **one** consumer ever takes the buffer; later attempts fail with
//!   [`StreamError::AlreadyConsumed`] (or `false` from [`Readable::resume`]).
//! - `Ended` is reached only when the consumer has read the last buffered item;
//!   for a piped source, only once the destination has flushed it.
//! - A producer error moves the state to `Errored` immediately, even while paused.
//! - A producer panic is an error too ([`StreamError::Panicked`]), never a silent end.

use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::{FutureExt, Stream, StreamExt};
use tokio::sync::mpsc;

use crate::completion::Source;
use crate::error::{BoxError, SharedError, StreamError, panic_info};
use crate::streams::state::{Lifecycle, StateWatch, StreamState};
use crate::streams::writable::Writable;

/// Default buffer size in items.
pub const DEFAULT_HIGH_WATER_MARK: usize = 16;

struct Shared<T> {
    buffer: Mutex<Option<mpsc::Receiver<T>>>,
    lifecycle: Arc<Lifecycle>,
}

/// Pull-based source of `T` items.
///
/// Cloning yields another handle to the same source.
pub struct Readable<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Readable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> Readable<T> {
    /// Creates a paused source producing items from `stream`.
    ///
    /// Spawns the producer task; must be called within a tokio runtime.
    /// `high_water_mark` is clamped to a minimum of 1.
    pub fn from_stream<S, E>(high_water_mark: usize, stream: S) -> Self
    where
        S: Stream<Item = Result<T, E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(high_water_mark.max(1));
        let lifecycle = Arc::new(Lifecycle::new());
        let producer = Arc::clone(&lifecycle);

        tokio::spawn(async move {
            let produce = async {
                let mut stream = std::pin::pin!(stream);
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(value) => {
                            if tx.send(value).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            producer.terminate(StreamState::Errored(Arc::from(e.into())));
                            return;
                        }
                    }
                }
            };
            if let Err(payload) = AssertUnwindSafe(produce).catch_unwind().await {
                let err = StreamError::Panicked(panic_info(&*payload));
                producer.terminate(StreamState::Errored(Arc::new(err)));
            }
            // The reader treats a closed buffer as the end unless the state is
            // already terminal, so the sender must outlive the terminate above.
            drop(tx);
        });

        Self {
            shared: Arc::new(Shared {
                buffer: Mutex::new(Some(rx)),
                lifecycle,
            }),
        }
    }

    /// Creates a paused source that calls `read` for every item until it returns `None`.
    pub fn from_fn<F>(high_water_mark: usize, read: F) -> Self
    where
        F: FnMut() -> Option<T> + Send + 'static,
    {
        let items = futures::stream::iter(std::iter::from_fn(read)).map(Ok::<T, Infallible>);
        Self::from_stream(high_water_mark, items)
    }

    /// Creates a paused source over the items of `iter`.
    pub fn from_iter<I>(high_water_mark: usize, iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        let items = futures::stream::iter(iter).map(Ok::<T, Infallible>);
        Self::from_stream(high_water_mark, items)
    }

    /// Takes over consumption and returns the items as a stream.
    ///
    /// The returned stream yields `Err` once if the source failed, then ends.
    pub fn take_stream(&self) -> Result<ReadStream<T>, StreamError> {
        self.consume(false)
    }

    fn consume(&self, defer_end: bool) -> Result<ReadStream<T>, StreamError> {
        let rx = self.take_buffer().ok_or(StreamError::AlreadyConsumed)?;
        Ok(ReadStream {
            rx,
            lifecycle: Arc::clone(&self.shared.lifecycle),
            done: false,
            defer_end,
        })
    }

    /// Switches a paused source to flowing mode, discarding every item.
    ///
    /// Returns `false` (and does nothing) if another consumer already took the source.
    pub fn resume(&self) -> bool {
        let Ok(mut stream) = self.take_stream() else {
            return false;
        };
        tokio::spawn(async move { while stream.next().await.is_some() {} });
        true
    }

    /// Forwards every item into `dest`, then ends `dest`.
    ///
    /// The source reaches `Ended` only after `dest` finished flushing, so an
    /// observer of the source never sees it end with items still in flight.
    /// A failing `dest` fails the source with the same error, and a failing
    /// source fails `dest`, so neither side is left waiting on the other.
    pub fn pipe(&self, dest: &Writable<T>) -> Result<(), StreamError> {
        let mut stream = self.consume(true)?;
        let dest = dest.clone();
        let lifecycle = Arc::clone(&self.shared.lifecycle);

        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                let value = match item {
                    Ok(value) => value,
                    Err(e) => {
                        dest.fail(e);
                        return;
                    }
                };
                if let Err(e) = dest.write(value).await {
                    let err: SharedError = Arc::new(e);
                    lifecycle.terminate(StreamState::Errored(err));
                    return;
                }
            }
            dest.end();
            let settled = match dest.watch().terminal().await {
                Some(StreamState::Errored(e)) => StreamState::Errored(e),
                _ => StreamState::Ended,
            };
            lifecycle.terminate(settled);
        });
        Ok(())
    }

    /// Fails the source with `error` unless it already reached a terminal state.
    ///
    /// Buffered items of a paused source are released.
    pub fn destroy(&self, error: impl Into<BoxError>) -> bool {
        let first = self
            .shared
            .lifecycle
            .terminate(StreamState::Errored(Arc::from(error.into())));
        drop(self.take_buffer());
        first
    }

    /// True once a consumer took the buffer.
    pub fn is_flowing(&self) -> bool {
        self.shared
            .buffer
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

    fn take_buffer(&self) -> Option<mpsc::Receiver<T>> {
        self.shared
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl<T: Send + 'static> Source for Readable<T> {
    fn is_flowing(&self) -> bool {
        Readable::is_flowing(self)
    }

    fn resume(&self) -> bool {
        Readable::resume(self)
    }

    fn watch(&self) -> StateWatch {
        Readable::watch(self)
    }
}

/// Items taken out of a [`Readable`].
///
/// Reaching the end of this stream is what moves the source to [`StreamState::Ended`].
pub struct ReadStream<T> {
    rx: mpsc::Receiver<T>,
    lifecycle: Arc<Lifecycle>,
    done: bool,
    // Set by `pipe`, which marks the end itself once the destination flushed.
    defer_end: bool,
}

impl<T> Stream for ReadStream<T> {
    type Item = Result<T, SharedError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(value)) => Poll::Ready(Some(Ok(value))),
            Poll::Ready(None) => {
                this.done = true;
                match this.lifecycle.current() {
                    StreamState::Errored(e) => Poll::Ready(Some(Err(e))),
                    _ => {
                        if !this.defer_end {
                            this.lifecycle.terminate(StreamState::Ended);
                        }
                        Poll::Ready(None)
                    }
                }
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn paused_source_stalls_at_high_water_mark() {
        let produced = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&produced);
        let rs = Readable::from_fn(2, move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            (n < 100).then_some(n)
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(produced.load(Ordering::SeqCst) <= 4);
        assert!(!rs.is_flowing());
        assert!(!rs.state().is_terminal());
    }

    #[tokio::test]
    async fn take_stream_reads_everything_and_ends() {
        let rs = Readable::from_iter(2, 0..10u32);
        let items: Vec<u32> = rs
            .take_stream()
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(items, (0..10).collect::<Vec<_>>());
        assert!(matches!(rs.state(), StreamState::Ended));
    }

    #[tokio::test]
    async fn second_consumer_is_rejected() {
        let rs = Readable::from_iter(2, 0..3u8);
        let _first = rs.take_stream().unwrap();
        assert!(matches!(
            rs.take_stream(),
            Err(StreamError::AlreadyConsumed)
        ));
        assert!(!rs.resume());
    }

    #[tokio::test]
    async fn producer_error_surfaces_while_paused() {
        let items = futures::stream::iter(vec![Ok(1u8), Err("broken pipe")]);
        let rs = Readable::from_stream(8, items);
        let st = rs.watch().terminal().await;
        match st {
            Some(StreamState::Errored(e)) => assert_eq!(e.to_string(), "broken pipe"),
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[tokio::test]
    async fn destroy_after_end_is_ignored() {
        let rs = Readable::from_iter(2, 0..3u8);
        assert!(rs.resume());
        rs.watch().terminal().await;
        assert!(!rs.destroy("too late"));
        assert!(matches!(rs.state(), StreamState::Ended));
    }

    #[tokio::test]
    async fn piped_source_ends_after_destination_flushes() {
        let written = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&written);
        let rs = Readable::from_iter(2, 0..100u32);
        let ws = Writable::new(2, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, StreamError>(())
        });

        rs.pipe(&ws).unwrap();
        assert!(rs.is_flowing());
        assert!(matches!(rs.watch().terminal().await, Some(StreamState::Ended)));
        assert_eq!(written.load(Ordering::SeqCst), 100);
        assert!(matches!(ws.state(), StreamState::Finished));
    }

    #[tokio::test]
    async fn failing_destination_fails_the_source() {
        let rs = Readable::from_iter(1, 0..10u8);
        let ws = Writable::new(1, |n: u8| {
            if n == 4 {
                Err("disk full")
            } else {
                Ok(())
            }
        });

        rs.pipe(&ws).unwrap();
        match rs.watch().terminal().await {
            Some(StreamState::Errored(e)) => assert!(e.to_string().contains("disk full")),
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[tokio::test]
    async fn producer_panic_is_an_error_not_an_end() {
        let mut n = 0u32;
        let rs = Readable::from_fn(2, move || {
            n += 1;
            if n == 5 {
                panic!("sensor unplugged");
            }
            Some(n)
        });

        let items: Vec<_> = rs.take_stream().unwrap().collect().await;
        assert_eq!(items.len(), 5);
        assert!(items[..4].iter().all(Result::is_ok));
        match items.last() {
            Some(Err(e)) => assert_eq!(e.to_string(), "stream worker panicked: sensor unplugged"),
            other => panic!("unexpected last item: {other:?}"),
        }
        assert!(matches!(rs.state(), StreamState::Errored(_)));
    }

    #[tokio::test]
    async fn panicking_source_fails_its_destination() {
        let written = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&written);
        let mut n = 0u32;
        let rs = Readable::from_fn(2, move || {
            n += 1;
            if n == 5 {
                panic!("sensor unplugged");
            }
            Some(n)
        });
        let ws = Writable::new(2, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, StreamError>(())
        });

        rs.pipe(&ws).unwrap();
        match ws.watch().terminal().await {
            Some(StreamState::Errored(e)) => assert!(e.to_string().contains("sensor unplugged")),
            other => panic!("unexpected state: {other:?}"),
        }
        assert!(matches!(rs.state(), StreamState::Errored(_)));
        assert!(written.load(Ordering::SeqCst) <= 4);
    }
}
