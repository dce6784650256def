//! # Completion callback handed to callback-style jobs.
//!
//! [`Done`] settles the run it belongs to. It may be cloned, moved to another task,
//! or called more than once; only the **first** call counts.
//!
//! Dropping every `Done` of a run without calling it settles the run with
//! [`TaskError::Abandoned`](crate::TaskError::Abandoned).

use crate::completion::Outcome;
use crate::error::{BoxError, TaskError};

/// Completion callback `(error?)` of a run.
#[derive(Clone)]
pub struct Done {
    outcome: Outcome,
}

impl Done {
    pub(crate) fn new(outcome: Outcome) -> Self {
        Self { outcome }
    }

    /// Reports completion; `None` means success.
    ///
    /// Returns `true` if this call settled the run.
    pub fn call(&self, error: Option<BoxError>) -> bool {
        match error {
            None => self.outcome.settle(Ok(())),
            Some(e) => self.outcome.settle(Err(TaskError::fail(e))),
        }
    }

    /// Reports success.
    pub fn ok(&self) -> bool {
        self.outcome.settle(Ok(()))
    }

    /// Reports failure with `error`.
    pub fn fail(&self, error: impl Into<BoxError>) -> bool {
        self.outcome.settle(Err(TaskError::fail(error)))
    }

    /// Reports a `Result`.
    pub fn finish<E: Into<BoxError>>(&self, res: Result<(), E>) -> bool {
        self.outcome.settle(res.map_err(TaskError::fail))
    }

    /// True once the run was settled, by this callback or otherwise.
    pub fn is_settled(&self) -> bool {
        self.outcome.is_settled()
    }
}

impl std::fmt::Debug for Done {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Done")
            .field("settled", &self.is_settled())
            .finish()
    }
}
