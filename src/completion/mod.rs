//! Completion detection: from "the job returned something" to one settled result.
//!
//! ## Contents
//! - [`Outcome`], [`OutcomeFuture`], [`RunState`] single-fire settlement point of a run
//! - [`Capabilities`], [`Returned`], [`Source`], [`Sink`] completion probes of return values
//! - [`classify`], [`Shape`], [`RunMethod`] return value → detection strategy
//! - [`drain`], [`relieve`], [`DrainMode`] backpressure-safe stream draining
//!
//! See [`RunController`](crate::RunController) for how a run drives these pieces.

mod capability;
mod classify;
mod drain;
mod outcome;
mod wire;

pub use capability::{Capabilities, Continuation, Returned, Sink, Source};
pub use classify::{RunMethod, Shape, classify};
pub use drain::{DrainMode, drain, relieve, settle_on_terminal};
pub use outcome::{Outcome, OutcomeFuture, RunState};
pub(crate) use wire::wire;
