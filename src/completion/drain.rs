//! # Backpressure-safe stream drainer.
//!
//! A source with a small buffer stops producing once the buffer is full. If the
//! job returned such a source and nobody reads it, it never ends and the run never
//! settles. The drainer guarantees the terminal signal is reached **without**
//! stealing items from a source that already has a consumer.
//!
//! ## Flow
//! ```text
//! drain(source, outcome)
//!   ├─ source.resume() == true   → Forced:  we took over, items are discarded
//!   ├─ source.resume() == false  → Passive: someone else reads (e.g. pipe)
//!   └─ both: settle_on_terminal(source.watch(), outcome)
//!              ├─ Ended / Finished → Ok(())
//!              ├─ Errored(e)       → Err(Fail { e })
//!              ├─ worker panicked  → Err(Panicked { info })
//!              └─ dropped          → Err(Abandoned)
//! ```
//!
//! ## Rules
//! - Checking for a consumer and taking over happen atomically inside `resume`.
//! - Listeners are scoped to [`Outcome::scope`] and exit as soon as the run settles.

use std::sync::Arc;

use crate::completion::capability::Source;
use crate::completion::outcome::Outcome;
use crate::error::{StreamError, TaskError};
use crate::streams::{StateWatch, StreamState};

/// What the drainer did with a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainMode {
    /// The source was paused; the drainer consumes and discards its items.
    Forced,
    /// The source already had a consumer; only its terminal state is observed.
    Passive,
}

/// Switches a paused source to flowing mode without observing its terminal state.
///
/// Used for the readable side of a duplex, whose completion is defined by its sink.
pub fn relieve(source: &dyn Source) -> DrainMode {
    if source.resume() {
        DrainMode::Forced
    } else {
        DrainMode::Passive
    }
}

/// Guarantees `source` reaches a terminal state and settles `outcome` with it.
pub fn drain(source: Arc<dyn Source>, outcome: Outcome) -> DrainMode {
    let mode = relieve(source.as_ref());
    tracing::debug!(mode = ?mode, "draining returned source");
    settle_on_terminal(source.watch(), outcome);
    mode
}

/// Spawns a passive listener settling `outcome` with the terminal state of `watch`.
pub fn settle_on_terminal(watch: StateWatch, outcome: Outcome) {
    let scope = outcome.scope().clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = scope.cancelled() => {}
            terminal = watch.terminal() => {
                outcome.settle(terminal_result(terminal));
            }
        }
    });
}

fn terminal_result(terminal: Option<StreamState>) -> Result<(), TaskError> {
    match terminal {
        Some(StreamState::Errored(error)) => {
            let panicked = match error.downcast_ref::<StreamError>() {
                Some(StreamError::Panicked(info)) => Some(info.clone()),
                _ => None,
            };
            match panicked {
                Some(info) => Err(TaskError::Panicked { info }),
                None => Err(TaskError::Fail { error }),
            }
        }
        Some(_) => Ok(()),
        None => Err(TaskError::Abandoned),
    }
}
