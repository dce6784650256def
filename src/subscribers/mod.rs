//! # Event subscribers.
//!
//! - [`Subscribe`] trait for custom observers
//! - [`SubscriberSet`] fan-out with per-subscriber queues and panic isolation
//! - [`LogWriter`] built-in `tracing` logger (feature `logging`)
//!
//! ```text
//! Orchestrator ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                           ├──► LogWriter
//!                                                           └──► custom ...
//! ```

#[cfg(feature = "logging")]
mod log;
mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
