//! Error types used by the orchestrator runtime, jobs and streams.
//!
//! This module defines two main error enums:
//!
//! - [`TaskError`]: the single outcome error delivered to a run's caller.
//! - [`StreamError`]: errors raised by stream operations ([`Readable`](crate::Readable),
//!   [`Writable`](crate::Writable)).
//!
//! [`TaskError`] provides helper methods (`as_label`, `as_message`) for logs/metrics.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error accepted from user code.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Shared, cloneable error preserved verbatim from the job.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// # Errors delivered as the outcome of a run.
///
/// A run settles with exactly one `Result<_, TaskError>`. Job failures are carried
/// verbatim inside [`TaskError::Fail`]; the remaining variants are raised by the
/// runtime itself.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum TaskError {
    /// The job reported a failure (callback error, future `Err`, stream error).
    #[error("execution failed: {error}")]
    Fail {
        /// The original error produced by the job.
        error: SharedError,
    },

    /// No job is registered under this name.
    #[error("task '{name}' not found")]
    NotFound {
        /// The requested task name.
        name: String,
    },

    /// The job panicked while being invoked.
    #[error("task panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// Every completion signal was dropped before the run settled.
    #[error("completion signal dropped before settlement")]
    Abandoned,
}

impl TaskError {
    /// Wraps a job error, keeping the original value reachable via [`TaskError::source_error`].
    ///
    /// # Example
    /// ```
    /// use orchestrator::TaskError;
    ///
    /// let err = TaskError::fail("disk full");
    /// assert_eq!(err.as_label(), "task_failed");
    /// assert_eq!(err.to_string(), "execution failed: disk full");
    /// ```
    pub fn fail(error: impl Into<BoxError>) -> Self {
        TaskError::Fail {
            error: Arc::from(error.into()),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::NotFound { .. } => "task_not_found",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Abandoned => "task_abandoned",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::NotFound { name } => format!("not found: {name}"),
            TaskError::Panicked { info } => format!("panic: {info}"),
            TaskError::Abandoned => "abandoned".to_string(),
        }
    }

    /// Returns the original job error for [`TaskError::Fail`].
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            TaskError::Fail { error } => Some(error.as_ref()),
            _ => None,
        }
    }
}

impl From<SharedError> for TaskError {
    fn from(error: SharedError) -> Self {
        TaskError::Fail { error }
    }
}

/// # Errors produced by stream operations.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum StreamError {
    /// The writable side was already ended; no more writes are accepted.
    #[error("write after end")]
    Ended,

    /// The other side of the stream went away.
    #[error("stream closed")]
    Closed,

    /// The stream is already being consumed by another reader.
    #[error("stream already consumed")]
    AlreadyConsumed,

    /// The stream failed; carries the original error.
    #[error("stream errored: {0}")]
    Errored(SharedError),

    /// The task producing or flushing items panicked.
    #[error("stream worker panicked: {0}")]
    Panicked(String),
}

/// Renders a panic payload as text.
pub(crate) fn panic_info(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
