//! # Orchestrator events.
//!
//! Every registry change and every run transition is published as an [`Event`].
//!
//! | Kind                 | `task`          | `reason`      | `duration_ms` | `method` |
//! |----------------------|-----------------|---------------|---------------|----------|
//! | `TaskAdded`          | name            |               |               |          |
//! | `TaskReplaced`       | name            |               |               |          |
//! | `TaskRemoved`        | name            |               |               |          |
//! | `TaskNotFound`       | requested name  |               |               |          |
//! | `TaskStarting`       | name            |               |               | ✓        |
//! | `TaskStopped`        | name            |               | ✓             | ✓        |
//! | `TaskFailed`         | name            | error text    | ✓             | ✓        |
//! | `SubscriberPanicked` | subscriber name | panic message |               |          |
//! | `SubscriberOverflow` | subscriber name | `full`/`closed` |             |          |
//!
//! `seq` is drawn from one process-wide counter, so sorting by `seq` restores
//! publication order across runs and subscribers.
//!
//! ```rust
//! use std::time::Duration;
//! use orchestrator::{Event, EventKind, RunMethod};
//!
//! let ev = Event::new(EventKind::TaskStopped)
//!     .with_task("build")
//!     .with_duration(Duration::from_millis(42))
//!     .with_method(RunMethod::Stream);
//!
//! assert_eq!(ev.kind, EventKind::TaskStopped);
//! assert_eq!(ev.task.as_deref(), Some("build"));
//! assert_eq!(ev.duration_ms, Some(42));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use crate::completion::RunMethod;

static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// What happened. See the module table for the fields each kind sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A name was registered for the first time.
    TaskAdded,
    /// A registration was overwritten (last write wins).
    TaskReplaced,
    /// A registration was removed.
    TaskRemoved,
    /// `start` / `run` was called with an unknown name; nothing was invoked.
    TaskNotFound,
    /// The job was invoked and its completion signal wired.
    TaskStarting,
    /// The run settled successfully.
    TaskStopped,
    /// The run settled with an error.
    TaskFailed,
    /// A subscriber panicked; the event it was handling is lost for it.
    SubscriberPanicked,
    /// A subscriber's queue rejected an event.
    SubscriberOverflow,
}

/// One published event.
#[derive(Clone, Debug)]
pub struct Event {
    /// Process-wide publication order.
    pub seq: u64,
    /// Wall-clock time of creation.
    pub at: SystemTime,
    /// What happened.
    pub kind: EventKind,
    /// Task name, or subscriber name for subscriber faults.
    pub task: Option<Arc<str>>,
    /// Error text for `TaskFailed`, panic text or overflow cause for subscriber faults.
    pub reason: Option<Arc<str>>,
    /// Invocation to settlement, saturating at `u32::MAX`.
    pub duration_ms: Option<u32>,
    /// How the run signals completion.
    pub method: Option<RunMethod>,
}

impl Event {
    /// Stamps a new event with the next `seq` and the current time.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: NEXT_SEQ.fetch_add(1, Ordering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            reason: None,
            duration_ms: None,
            method: None,
        }
    }

    #[inline]
    pub fn with_task(self, task: impl Into<Arc<str>>) -> Self {
        Self {
            task: Some(task.into()),
            ..self
        }
    }

    #[inline]
    pub fn with_reason(self, reason: impl Into<Arc<str>>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..self
        }
    }

    #[inline]
    pub fn with_duration(self, d: Duration) -> Self {
        let ms = u32::try_from(d.as_millis()).unwrap_or(u32::MAX);
        Self {
            duration_ms: Some(ms),
            ..self
        }
    }

    #[inline]
    pub fn with_method(self, method: RunMethod) -> Self {
        Self {
            method: Some(method),
            ..self
        }
    }

    pub(crate) fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(reason)
    }

    pub(crate) fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// True for overflow reports, which are never re-reported when they overflow themselves.
    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        self.kind == EventKind::SubscriberOverflow
    }
}
