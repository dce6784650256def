//! # orchestrator
//!
//! **Orchestrator** runs named jobs and reports exactly once when each run is
//! finished, whichever way the job chooses to say so.
//!
//! A job may finish by calling a [`Done`] callback, by returning a future, by
//! returning a stream, or by simply returning. Streams are the tricky case: a
//! readable nobody consumes stalls at its high water mark and never ends, so the
//! orchestrator drains it for the job. The result reaches the caller as one
//! `Result<Report, TaskError>` (or one `handler(Option<TaskError>)` call).
//!
//! ## Architecture
//! ```text
//!   add(name, Job)            start(name, handler) / run(name)
//!         │                              │
//!         ▼                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Orchestrator                                                │
//! │  - Registry (name → Job, last write wins)                    │
//! │  - Bus (broadcast events) ──► SubscriberSet (optional)       │
//! │  - current RunStatus (is_running)                            │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                ▼
//!                    RunController::launch(job)
//!                                │
//!        ┌───────────────┬───────┴───────┬───────────────────┐
//!        ▼               ▼               ▼                   ▼
//!   Callback job     Sync job      Returning job ──► classify(Returned)
//!   job(Done)        job()                  │
//!        │               │     ┌────────┬───┴─────┬──────────┬─────────┐
//!        │               │     ▼        ▼         ▼          ▼         ▼
//!        │               │   Empty   Future   Readable   Writable   Duplex
//!        │               │     │        │     drain()       │     relieve()
//!        │               │     │        │    + terminal  terminal  + sink
//!        ▼               ▼     ▼        ▼         ▼          ▼         ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Outcome: first settle wins, listeners detach, state updated  │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                ▼
//!           RunState::Completed | Failed  ──►  Report | TaskError
//! ```
//!
//! ## Features
//! | Area           | Description                                              | Key types                              |
//! |----------------|----------------------------------------------------------|----------------------------------------|
//! | **Jobs**       | Units of work in four completion styles                  | [`Job`], [`Done`]                      |
//! | **Runs**       | One invocation, one settled outcome                      | [`RunController`], [`Report`]          |
//! | **Streams**    | Bounded, lifecycle-observable streams                    | [`Readable`], [`Writable`], [`Duplex`] |
//! | **Detection**  | Return value → completion signal                         | [`classify`], [`Returned`], [`drain`]  |
//! | **Facade**     | Named jobs and lifecycle events                          | [`Orchestrator`]                       |
//! | **Events**     | Observe registry and run events                          | [`Subscribe`], [`Event`]               |
//! | **Errors**     | Typed run and stream errors                              | [`TaskError`], [`StreamError`]         |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], a subscriber logging every event through `tracing`.
//!
//! ## Example
//! ```rust
//! use orchestrator::{Job, Orchestrator, Readable, StreamError, TaskError, Writable};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let orch = Orchestrator::default();
//!
//!     // Finishes when the writable side has flushed everything piped into it.
//!     orch.add("copy", Job::returning(|| {
//!         let src = Readable::from_iter(2, 0..100u32);
//!         let dst = Writable::new(2, |_n: u32| Ok::<_, StreamError>(()));
//!         let _ = src.pipe(&dst);
//!         dst
//!     }));
//!
//!     let (tx, rx) = tokio::sync::oneshot::channel::<Option<TaskError>>();
//!     orch.start("copy", move |err| { let _ = tx.send(err); });
//!     assert!(rx.await.unwrap().is_none());
//! }
//! ```

mod completion;
mod core;
mod error;
mod events;
mod streams;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use completion::{
    Capabilities, Continuation, DrainMode, Outcome, OutcomeFuture, Returned, RunMethod, RunState,
    Shape, Sink, Source, classify, drain, relieve, settle_on_terminal,
};
pub use core::{
    Config, Orchestrator, OrchestratorBuilder, PendingRun, Report, RunController, RunStatus,
};
pub use error::{BoxError, SharedError, StreamError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use streams::{
    DEFAULT_HIGH_WATER_MARK, Duplex, ReadStream, Readable, StateWatch, StreamState, Writable,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{Done, Job, JobRef};

// Optional: a subscriber forwarding every event to `tracing`.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
