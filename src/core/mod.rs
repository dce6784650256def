//! Runtime core: the facade and the per-run controller.
//!
//! - [`orchestrator`]: named jobs, `start` / `run`, lifecycle events;
//! - [`runner`]: drives one invocation to its settled outcome;
//! - [`registry`]: name → job map, last write wins;
//! - [`builder`]: wires the bus and subscribers;
//! - [`config`]: orchestrator settings.

mod builder;
mod config;
mod orchestrator;
mod registry;
mod runner;

pub use builder::OrchestratorBuilder;
pub use config::Config;
pub use orchestrator::Orchestrator;
pub use runner::{PendingRun, Report, RunController, RunStatus};
