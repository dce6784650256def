//! # Run a single job to its settled outcome.
//!
//! [`RunController`] drives one invocation of a [`Job`]:
//!
//! - **Invoke ONCE**: call the job, passing a [`Done`] only if it declared one
//! - **Classify** the return value and **wire** the matching signal into an [`Outcome`]
//! - **Track** [`RunState`] and **report** one `Result<Report, TaskError>`
//!
//! ## Flow
//! ```text
//! launch(job)                                  (synchronous)
//!   ├─► RunState::Running
//!   ├─► Callback job  → job(Done)              → Done::call settles
//!   ├─► Sync job      → job()                  → settles immediately
//!   └─► Returning job → job() → classify()     → wire(shape)
//!                                                 ├─ Empty    → settles immediately
//!                                                 ├─ Future   → spawned, settles on ready
//!                                                 ├─ Readable → drain + terminal listener
//!                                                 ├─ Writable → terminal listener
//!                                                 └─ Duplex   → relieve source + sink listener
//!
//! PendingRun.await                             (asynchronous)
//!   └─► Outcome settles once → RunState::Completed | Failed → Ok(Report) | Err(TaskError)
//! ```
//!
//! ## Rules
//! - A panic while invoking the job settles the run with [`TaskError::Panicked`].
//! - The state is updated **before** the result is delivered, so a caller woken by
//!   the result always observes `Completed` / `Failed`.
//! - Each `RunController` owns its own outcome; nothing is shared between runs.

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::completion::{Outcome, OutcomeFuture, RunMethod, RunState, classify, wire};
use crate::error::{TaskError, panic_info};
use crate::tasks::{Done, Job, JobKind};

/// Summary of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    /// Time from invocation to settlement.
    pub duration: Duration,
    /// Signal that detected completion.
    pub method: RunMethod,
}

/// Read-only view of a run's [`RunState`].
#[derive(Debug, Clone)]
pub struct RunStatus {
    rx: watch::Receiver<RunState>,
}

impl RunStatus {
    /// Current state.
    pub fn get(&self) -> RunState {
        *self.rx.borrow()
    }

    /// True strictly between invocation and settlement.
    pub fn is_running(&self) -> bool {
        self.get() == RunState::Running
    }
}

/// Drives a single run of a job.
pub struct RunController {
    state: watch::Sender<RunState>,
    relieve_duplex: bool,
}

impl Default for RunController {
    fn default() -> Self {
        Self::new()
    }
}

impl RunController {
    /// Creates an idle controller.
    pub fn new() -> Self {
        let (state, _rx) = watch::channel(RunState::Idle);
        Self {
            state,
            relieve_duplex: true,
        }
    }

    /// Whether a paused readable side of a returned duplex is drained (default `true`).
    pub fn with_relieve_duplex(mut self, relieve: bool) -> Self {
        self.relieve_duplex = relieve;
        self
    }

    /// Read-only state handle; stays valid after the run settles.
    pub fn status(&self) -> RunStatus {
        RunStatus {
            rx: self.state.subscribe(),
        }
    }

    /// Convenience: launches `job` and waits for its outcome.
    pub async fn run(job: &Job) -> Result<Report, TaskError> {
        Self::new().launch(job).await
    }

    /// Invokes `job` and wires its completion signal.
    ///
    /// Must be called within a tokio runtime. The returned [`PendingRun`] resolves
    /// exactly once with the outcome.
    pub fn launch(self, job: &Job) -> PendingRun {
        let status = self.status();
        self.state.send_replace(RunState::Running);
        let started = Instant::now();
        let (outcome, settled) = Outcome::new(self.state);

        let method = invoke(job, outcome, self.relieve_duplex);
        tracing::debug!(method = method.as_label(), "job invoked");

        PendingRun {
            settled,
            status,
            started,
            method,
        }
    }
}

fn invoke(job: &Job, outcome: Outcome, relieve_duplex: bool) -> RunMethod {
    match job.kind() {
        JobKind::Callback(f) => {
            let done = Done::new(outcome.clone());
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| f(done))) {
                outcome.settle(Err(panicked(&*panic)));
            }
            RunMethod::Callback
        }
        JobKind::Sync(f) => {
            let res = catch_unwind(AssertUnwindSafe(|| f()))
                .unwrap_or_else(|panic| Err(panicked(&*panic)));
            outcome.settle(res);
            RunMethod::Sync
        }
        JobKind::Returning(f) => match catch_unwind(AssertUnwindSafe(|| f())) {
            Ok(returned) => wire(classify(returned), outcome, relieve_duplex),
            Err(panic) => {
                outcome.settle(Err(panicked(&*panic)));
                RunMethod::Sync
            }
        },
    }
}

fn panicked(payload: &(dyn std::any::Any + Send)) -> TaskError {
    TaskError::Panicked {
        info: panic_info(payload),
    }
}

/// A launched run, resolving once with its outcome.
pub struct PendingRun {
    settled: OutcomeFuture,
    status: RunStatus,
    started: Instant,
    method: RunMethod,
}

impl PendingRun {
    /// State handle of this run.
    pub fn status(&self) -> RunStatus {
        self.status.clone()
    }

    /// Signal this run waits on.
    pub fn method(&self) -> RunMethod {
        self.method
    }
}

impl Future for PendingRun {
    type Output = Result<Report, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let res = std::task::ready!(Pin::new(&mut self.settled).poll(cx));
        let report = Report {
            duration: self.started.elapsed(),
            method: self.method,
        };
        match &res {
            Ok(()) => tracing::debug!(method = report.method.as_label(), duration = ?report.duration, "run completed"),
            Err(e) => tracing::debug!(method = report.method.as_label(), error = %e, "run failed"),
        }
        Poll::Ready(res.map(|()| report))
    }
}
