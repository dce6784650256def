//! # Units of work.
//!
//! A [`Job`] is the opaque function a run invokes exactly once. How it signals
//! completion is fixed by the constructor used:
//!
//! | Constructor         | Job signature                     | Completion                          |
//! |---------------------|-----------------------------------|-------------------------------------|
//! | [`Job::callback`]   | `Fn(Done)`                        | first call of [`Done`]              |
//! | [`Job::returning`]  | `Fn() -> impl Into<Returned>`     | classified return value             |
//! | [`Job::future`]     | `Fn() -> impl Future<Result>`     | future resolves                     |
//! | [`Job::sync`]       | `Fn() -> Result<(), E>`           | immediately, with the returned error |
//!
//! Declaring the callback fully determines the strategy: a callback job has no return
//! value to classify.
//!
//! ## Example
//! ```rust
//! use orchestrator::{Job, Readable};
//!
//! let by_callback = Job::callback(|done| {
//!     std::thread::spawn(move || done.ok());
//! });
//! let by_stream = Job::returning(|| Readable::from_iter(2, 0..100u32));
//! let by_return = Job::sync(|| Ok::<_, std::io::Error>(()));
//!
//! assert!(by_callback.declares_callback());
//! assert!(!by_stream.declares_callback());
//! assert!(!by_return.declares_callback());
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::completion::Returned;
use crate::error::{BoxError, TaskError};
use crate::tasks::done::Done;

pub(crate) type ReturningFn = dyn Fn() -> Returned + Send + Sync;
pub(crate) type CallbackFn = dyn Fn(Done) + Send + Sync;
pub(crate) type SyncFn = dyn Fn() -> Result<(), TaskError> + Send + Sync;

pub(crate) enum JobKind {
    Returning(Box<ReturningFn>),
    Callback(Box<CallbackFn>),
    Sync(Box<SyncFn>),
}

/// A unit of work invoked once per run.
pub struct Job {
    kind: JobKind,
}

/// Shared handle to a job, as stored by the registry.
pub type JobRef = Arc<Job>;

impl Job {
    /// Job completing through the value it returns.
    pub fn returning<F, R>(f: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: Into<Returned>,
    {
        Self {
            kind: JobKind::Returning(Box::new(move || f().into())),
        }
    }

    /// Job completing when it calls the [`Done`] callback it receives.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Done) + Send + Sync + 'static,
    {
        Self {
            kind: JobKind::Callback(Box::new(f)),
        }
    }

    /// Job completing when the future it creates resolves.
    pub fn future<F, Fut, E>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::returning(move || Returned::future(f()))
    }

    /// Job that is complete when it returns.
    pub fn sync<F, E>(f: F) -> Self
    where
        F: Fn() -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self {
            kind: JobKind::Sync(Box::new(move || f().map_err(TaskError::fail))),
        }
    }

    /// True if the job takes a completion callback.
    pub fn declares_callback(&self) -> bool {
        matches!(self.kind, JobKind::Callback(_))
    }

    pub(crate) fn kind(&self) -> &JobKind {
        &self.kind
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            JobKind::Returning(_) => "returning",
            JobKind::Callback(_) => "callback",
            JobKind::Sync(_) => "sync",
        };
        f.debug_struct("Job").field("kind", &kind).finish()
    }
}
