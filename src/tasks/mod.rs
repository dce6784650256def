//! # Jobs and their completion callback.
//!
//! This module provides the unit-of-work types:
//! - [`Job`] - a function invoked once per run, in one of several completion styles
//! - [`JobRef`] - shared reference to a job (`Arc<Job>`)
//! - [`Done`] - completion callback handed to callback-style jobs

mod done;
mod job;

pub use done::Done;
pub use job::{Job, JobRef};
pub(crate) use job::JobKind;
