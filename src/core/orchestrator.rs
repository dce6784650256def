//! # Orchestrator: named jobs, runs, and lifecycle events.
//!
//! The [`Orchestrator`] owns a registry of named [`Job`]s, the event [`Bus`],
//! and the handle of the most recent run. Each run is driven by a fresh
//! [`RunController`], so runs never share completion state.
//!
//! ```text
//! add(name, job) ──► Registry (last write wins) ──► TaskAdded | TaskReplaced
//!
//! start(name, handler)
//!   ├─ unknown name ─► TaskNotFound ─► spawn { handler(Some(NotFound)) }
//!   └─ known name   ─► RunController::launch(job)        (job invoked now)
//!                      ├─► TaskStarting{method}
//!                      └─► spawn { PendingRun.await
//!                                    ├─ Ok  ─► TaskStopped{duration, method} ─► handler(None)
//!                                    └─ Err ─► TaskFailed{reason, ...}       ─► handler(Some(err)) }
//!
//! Bus ──► listener ──► SubscriberSet ──► subscribers      (only if any were given)
//! ```
//!
//! ## Rules
//! - The job is invoked synchronously inside `start` / `run`; `is_running()` is
//!   `true` as soon as `start` returns (unless the job settled immediately).
//! - The handler runs exactly once per `start`, after the run state has left `Running`.
//! - A job that never signals completion leaves `is_running()` true; there is no timeout.
//! - Events are published before the handler is called.
//!
//! ## Example
//! ```rust
//! use orchestrator::{Job, Orchestrator, Readable};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let orch = Orchestrator::default();
//!     orch.add("count", Job::returning(|| Readable::from_iter(2, 0..100u32)));
//!
//!     let report = orch.run("count").await.unwrap();
//!     assert_eq!(report.method.as_label(), "stream");
//!     assert!(!orch.is_running());
//! }
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::config::Config;
use super::registry::{Inserted, Registry};
use super::runner::{Report, RunController, RunStatus};
use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::SubscriberSet;
use crate::tasks::{Job, JobRef};

/// Registry of named jobs with completion-aware runs.
pub struct Orchestrator {
    cfg: Config,
    bus: Bus,
    registry: Registry,
    current: Mutex<Option<RunStatus>>,
    listener: CancellationToken,
}

impl Default for Orchestrator {
    /// Orchestrator with [`Config::default`] and no subscribers.
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Orchestrator {
    /// Starts building an orchestrator with subscribers.
    pub fn builder(cfg: Config) -> super::builder::OrchestratorBuilder {
        super::builder::OrchestratorBuilder::new(cfg)
    }

    /// Orchestrator without subscribers. Usable outside a tokio runtime until a run starts.
    pub fn new(cfg: Config) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self::new_internal(cfg, bus)
    }

    pub(crate) fn new_internal(cfg: Config, bus: Bus) -> Self {
        Self {
            cfg,
            bus,
            registry: Registry::new(),
            current: Mutex::new(None),
            listener: CancellationToken::new(),
        }
    }

    /// Forwards bus events to `subs` until the orchestrator is dropped.
    pub(crate) fn spawn_subscriber_listener(&self, subs: SubscriberSet) {
        let mut rx = self.bus.subscribe();
        let stop = self.listener.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => subs.emit(&ev),
                        Err(RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "subscriber listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
            subs.shutdown().await;
        });
    }

    /// Configuration this orchestrator was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// The event bus; subscribe to observe events without a [`Subscribe`](crate::Subscribe) impl.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Registers `job` under `name`, replacing any earlier job of that name.
    pub fn add(&self, name: impl Into<String>, job: Job) {
        let name = name.into();
        let kind = match self.registry.insert(name.clone(), Arc::new(job)) {
            Inserted::New => EventKind::TaskAdded,
            Inserted::Replaced => EventKind::TaskReplaced,
        };
        tracing::debug!(task = %name, ?kind, "job registered");
        self.bus.publish(Event::new(kind).with_task(name));
    }

    /// Removes the job registered under `name`. Runs already started are unaffected.
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.registry.remove(name).is_some();
        if removed {
            self.bus
                .publish(Event::new(EventKind::TaskRemoved).with_task(name));
        }
        removed
    }

    /// True if a job is registered under `name`.
    pub fn has_task(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Sorted list of registered names.
    pub fn tasks(&self) -> Vec<String> {
        self.registry.list()
    }

    /// True while the most recently started run has neither completed nor failed.
    ///
    /// `false` before any run, and after a `start` whose name was not found.
    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(RunStatus::is_running)
    }

    /// Starts the job named `name`; `handler` is called exactly once with
    /// `None` on success or the run's error.
    ///
    /// The job is invoked before this returns. Must be called within a tokio runtime.
    pub fn start<H>(&self, name: &str, handler: H) -> JoinHandle<()>
    where
        H: FnOnce(Option<TaskError>) + Send + 'static,
    {
        let run = self.begin(name);
        tokio::spawn(async move { handler(run.await.err()) })
    }

    /// Runs the job named `name` and waits for its outcome.
    pub async fn run(&self, name: &str) -> Result<Report, TaskError> {
        self.begin(name).await
    }

    fn begin(&self, name: &str) -> BoxFuture<'static, Result<Report, TaskError>> {
        let Some(job) = self.registry.get(name) else {
            self.set_current(None);
            tracing::warn!(task = %name, "task not found");
            self.bus
                .publish(Event::new(EventKind::TaskNotFound).with_task(name));
            let err = TaskError::NotFound {
                name: name.to_string(),
            };
            return futures::future::ready(Err(err)).boxed();
        };

        let started = Instant::now();
        let pending = self.launch(&job);
        let method = pending.method();
        self.bus.publish(
            Event::new(EventKind::TaskStarting)
                .with_task(name)
                .with_method(method),
        );

        let bus = self.bus.clone();
        let task: Arc<str> = Arc::from(name);
        async move {
            let res = pending.await;
            match &res {
                Ok(report) => bus.publish(
                    Event::new(EventKind::TaskStopped)
                        .with_task(task)
                        .with_duration(report.duration)
                        .with_method(report.method),
                ),
                Err(e) => bus.publish(
                    Event::new(EventKind::TaskFailed)
                        .with_task(task)
                        .with_reason(e.to_string())
                        .with_duration(started.elapsed())
                        .with_method(method),
                ),
            }
            res
        }
        .boxed()
    }

    fn launch(&self, job: &JobRef) -> super::runner::PendingRun {
        let ctl = RunController::new().with_relieve_duplex(self.cfg.relieve_duplex);
        // Publish the status before invoking: a job may settle synchronously.
        self.set_current(Some(ctl.status()));
        ctl.launch(job)
    }

    fn set_current(&self, status: Option<RunStatus>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.listener.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::completion::RunMethod;
    use crate::error::StreamError;
    use crate::streams::{Readable, StreamState, Writable};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn unknown_name_reports_not_found() {
        let orch = Orchestrator::default();
        let mut rx = orch.bus().subscribe();
        let (tx, got) = oneshot::channel();

        orch.start("missing", move |err| {
            let _ = tx.send(err);
        })
        .await
        .unwrap();

        match got.await.unwrap() {
            Some(TaskError::NotFound { name }) => assert_eq!(name, "missing"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!orch.is_running());
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::TaskNotFound);
    }

    #[tokio::test]
    async fn is_running_tracks_the_latest_run() {
        let orch = Arc::new(Orchestrator::default());
        let (release, gate) = oneshot::channel::<()>();
        let gate = Mutex::new(Some(gate));

        orch.add(
            "wait",
            Job::callback(move |done| {
                let gate = gate.lock().unwrap().take();
                tokio::spawn(async move {
                    if let Some(gate) = gate {
                        let _ = gate.await;
                    }
                    done.ok();
                });
            }),
        );
        assert!(!orch.is_running());

        let (tx, seen) = oneshot::channel();
        let inner = Arc::clone(&orch);
        let handle = orch.start("wait", move |err| {
            let _ = tx.send((err.is_none(), inner.is_running()));
        });
        assert!(orch.is_running());

        release.send(()).unwrap();
        handle.await.unwrap();
        assert_eq!(seen.await.unwrap(), (true, false));
        assert!(!orch.is_running());
    }

    #[tokio::test]
    async fn add_replaces_existing_job() {
        let orch = Orchestrator::default();
        orch.add("job", Job::sync(|| Err::<(), _>("old")));
        orch.add("job", Job::sync(|| Ok::<_, StreamError>(())));

        assert_eq!(orch.tasks(), vec!["job".to_string()]);
        assert!(orch.run("job").await.is_ok());

        assert!(orch.remove("job"));
        assert!(!orch.has_task("job"));
        assert!(matches!(
            orch.run("job").await,
            Err(TaskError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn readable_job_is_drained() {
        let orch = Orchestrator::default();
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulled);
        orch.add(
            "object",
            Job::returning(move || {
                let c = Arc::clone(&counter);
                let mut n = 0u32;
                Readable::from_fn(2, move || {
                    n += 1;
                    if n > 100 {
                        return None;
                    }
                    c.fetch_add(1, Ordering::SeqCst);
                    Some(n)
                })
            }),
        );

        let (tx, got) = oneshot::channel();
        orch.start("object", move |err| {
            let _ = tx.send(err);
        });
        assert!(got.await.unwrap().is_none());
        assert_eq!(pulled.load(Ordering::SeqCst), 100);
    }

    #[tokio::test]
    async fn handler_called_once_when_stream_ends_then_errors() {
        let orch = Orchestrator::default();
        let keep: Arc<Mutex<Option<Writable<u8>>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&keep);
        orch.add(
            "sink",
            Job::returning(move || {
                let ws = Writable::new(1, |_| Ok::<_, StreamError>(()));
                *slot.lock().unwrap() = Some(ws.clone());
                ws.end();
                ws
            }),
        );

        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        orch.start("sink", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

        if let Some(ws) = keep.lock().unwrap().take() {
            ws.destroy("late failure");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// Waits for the handler of `name`, counting how many times it fired.
    async fn settle_counted(orch: &Orchestrator, name: &str) -> (Option<TaskError>, usize) {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let (tx, rx) = oneshot::channel();
        orch.start(name, move |err| {
            c.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(err);
        });
        let err = rx.await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        (err, calls.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn end_and_destroy_inside_the_job_settle_once() {
        let orch = Orchestrator::default();
        let keep: Arc<Mutex<Option<Writable<u8>>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&keep);
        orch.add(
            "sink",
            Job::returning(move || {
                let ws = Writable::new(1, |_| Ok::<_, StreamError>(()));
                *slot.lock().unwrap() = Some(ws.clone());
                ws.end();
                ws.destroy("disk detached");
                ws
            }),
        );

        let (err, calls) = settle_counted(&orch, "sink").await;
        assert_eq!(calls, 1);
        match err {
            Some(TaskError::Fail { error }) => assert_eq!(error.to_string(), "disk detached"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        let ws = keep.lock().unwrap().take().unwrap();
        assert!(matches!(ws.state(), StreamState::Errored(_)));
    }

    #[tokio::test]
    async fn destroying_a_draining_source_settles_once_with_its_error() {
        let orch = Orchestrator::default();
        let keep: Arc<Mutex<Option<Readable<u32>>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&keep);
        orch.add(
            "numbers",
            Job::returning(move || {
                let rs = Readable::from_iter(2, 0..100u32);
                *slot.lock().unwrap() = Some(rs.clone());
                rs
            }),
        );

        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let (tx, rx) = oneshot::channel();
        orch.start("numbers", move |err| {
            c.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(err);
        });
        // The drainer has taken the source but none of its tasks has run yet.
        let rs = keep.lock().unwrap().take().unwrap();
        assert!(rs.is_flowing());
        assert!(rs.destroy("upstream reset"));

        match rx.await.unwrap() {
            Some(TaskError::Fail { error }) => assert_eq!(error.to_string(), "upstream reset"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(rs.state(), StreamState::Errored(_)));
    }

    #[tokio::test]
    async fn panicking_source_piped_into_returned_sink_fails_the_run() {
        let orch = Orchestrator::default();
        let delivered = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&delivered);
        orch.add(
            "copy",
            Job::returning(move || {
                let mut n = 0u32;
                let rs = Readable::from_fn(2, move || {
                    n += 1;
                    if n == 5 {
                        panic!("bad frame");
                    }
                    Some(n)
                });
                let d = Arc::clone(&d);
                let ws = Writable::new(2, move |_| {
                    d.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, StreamError>(())
                });
                rs.pipe(&ws).unwrap();
                ws
            }),
        );

        let (err, calls) = settle_counted(&orch, "copy").await;
        assert_eq!(calls, 1);
        match err {
            Some(TaskError::Panicked { info }) => assert_eq!(info, "bad frame"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(delivered.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn events_carry_method_and_reason() {
        let orch = Orchestrator::default();
        let mut rx = orch.bus().subscribe();
        orch.add("bad", Job::future(|| async { Err::<(), _>("broken") }));

        assert!(orch.run("bad").await.is_err());

        let added = rx.recv().await.unwrap();
        assert_eq!(added.kind, EventKind::TaskAdded);
        let starting = rx.recv().await.unwrap();
        assert_eq!(starting.kind, EventKind::TaskStarting);
        assert_eq!(starting.method, Some(RunMethod::Future));
        let failed = rx.recv().await.unwrap();
        assert_eq!(failed.kind, EventKind::TaskFailed);
        assert_eq!(failed.reason.as_deref(), Some("execution failed: broken"));
        assert!(failed.seq > starting.seq);
    }
}
