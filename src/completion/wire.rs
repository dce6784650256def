//! Wires a classified [`Shape`] into the run's [`Outcome`].

use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::completion::classify::{RunMethod, Shape};
use crate::completion::drain::{drain, relieve, settle_on_terminal};
use crate::completion::outcome::Outcome;
use crate::error::{TaskError, panic_info};

/// Attaches the listener matching `shape` and returns the detection method.
///
/// `relieve_duplex` controls whether the readable side of a duplex is switched to
/// flowing mode when nobody reads it.
pub fn wire(shape: Shape, outcome: Outcome, relieve_duplex: bool) -> RunMethod {
    let method = shape.method();
    match shape {
        Shape::Empty => {
            outcome.settle(Ok(()));
        }
        Shape::Future(fut) => {
            let scope = outcome.scope().clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = scope.cancelled() => {}
                    res = AssertUnwindSafe(fut).catch_unwind() => {
                        let res = res.unwrap_or_else(|panic| {
                            Err(TaskError::Panicked { info: panic_info(&*panic) })
                        });
                        outcome.settle(res);
                    }
                }
            });
        }
        Shape::Readable(source) => {
            drain(source, outcome);
        }
        Shape::Writable(sink) => {
            settle_on_terminal(sink.watch(), outcome);
        }
        Shape::Duplex { source, sink } => {
            if relieve_duplex {
                let mode = relieve(source.as_ref());
                tracing::debug!(mode = ?mode, "relieving readable side of duplex");
            }
            settle_on_terminal(sink.watch(), outcome);
        }
    }
    method
}
