//! # Job registry: name → job, last write wins.
//!
//! ## Rules
//! - Registering an existing name replaces the job; runs already started keep
//!   the job they resolved.
//! - Lookups hand out a [`JobRef`] clone, so no lock is held while a job runs.
//! - A poisoned lock is recovered: the map holds no invariants a panic could break.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::tasks::JobRef;

/// Whether [`Registry::insert`] created or replaced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Inserted {
    New,
    Replaced,
}

#[derive(Default)]
pub(crate) struct Registry {
    jobs: RwLock<HashMap<String, JobRef>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, name: String, job: JobRef) -> Inserted {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        match jobs.insert(name, job) {
            None => Inserted::New,
            Some(_) => Inserted::Replaced,
        }
    }

    pub(crate) fn remove(&self, name: &str) -> Option<JobRef> {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub(crate) fn get(&self, name: &str) -> Option<JobRef> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Sorted list of registered names.
    pub(crate) fn list(&self) -> Vec<String> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = jobs.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}
