//! # Combined source + sink.
//!
//! A [`Duplex`] exposes a [`Writable`] side and a [`Readable`] side at once, e.g. the
//! middle stage of a pipeline. As a completion signal it counts as **finished when the
//! writable side finishes**, not when the readable side is exhausted.

use std::convert::Infallible;

use tokio::sync::mpsc;

use crate::error::StreamError;
use crate::streams::readable::Readable;
use crate::streams::writable::Writable;

/// Pair of a writable and a readable side.
pub struct Duplex<T> {
    readable: Readable<T>,
    writable: Writable<T>,
}

impl<T> Clone for Duplex<T> {
    fn clone(&self) -> Self {
        Self {
            readable: self.readable.clone(),
            writable: self.writable.clone(),
        }
    }
}

impl<T: Send + 'static> Duplex<T> {
    /// Bundles two independent sides.
    pub fn new(readable: Readable<T>, writable: Writable<T>) -> Self {
        Self { readable, writable }
    }

    /// Creates a duplex whose readable side yields exactly what was written.
    ///
    /// The readable side ends once the writable side finished and every item was read.
    pub fn passthrough(high_water_mark: usize) -> Self {
        let (tx, rx) = mpsc::channel::<T>(high_water_mark.max(1));

        let writable = Writable::from_sink(
            high_water_mark,
            futures::sink::unfold(tx, |tx, item: T| async move {
                tx.send(item).await.map_err(|_| StreamError::Closed)?;
                Ok::<_, StreamError>(tx)
            }),
        );
        let readable = Readable::from_stream(
            high_water_mark,
            futures::stream::unfold(rx, |mut rx| async move {
                let item = rx.recv().await?;
                Some((Ok::<T, Infallible>(item), rx))
            }),
        );

        Self { readable, writable }
    }

    /// The readable side.
    pub fn readable(&self) -> &Readable<T> {
        &self.readable
    }

    /// The writable side.
    pub fn writable(&self) -> &Writable<T> {
        &self.writable
    }

    /// Writes one item into the writable side.
    pub async fn write(&self, item: T) -> Result<(), StreamError> {
        self.writable.write(item).await
    }

    /// Ends the writable side.
    pub fn end(&self) {
        self.writable.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::StreamState;
    use futures::StreamExt;

    #[tokio::test]
    async fn passthrough_forwards_and_ends() {
        let dx = Duplex::passthrough(2);
        let reader = dx.readable().take_stream().unwrap();
        let collected = tokio::spawn(reader.map(|r| r.unwrap()).collect::<Vec<u32>>());

        for i in 0..20 {
            dx.write(i).await.unwrap();
        }
        dx.end();

        assert!(matches!(
            dx.writable().watch().terminal().await,
            Some(StreamState::Finished)
        ));
        assert_eq!(collected.await.unwrap(), (0..20).collect::<Vec<_>>());
        assert!(matches!(dx.readable().state(), StreamState::Ended));
    }
}
