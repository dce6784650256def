//! # Observers of orchestrator events.
//!
//! Implement [`Subscribe`] to react to registry changes and run transitions, e.g.
//! to export run durations or alert on `TaskFailed`. The orchestrator hands each
//! subscriber its own bounded queue (sized by [`Subscribe::queue_capacity`]) and
//! its own worker task:
//!
//! ```text
//! listener ──► queue("metrics") ──► worker ──► Metrics::on_event   (FIFO)
//!          └─► queue("audit")   ──► worker ──► Audit::on_event     (FIFO)
//!                                      └─ panic ──► SubscriberPanicked on the bus
//! ```
//!
//! ## Rules
//! - A full queue drops the event for that subscriber only and reports `SubscriberOverflow`.
//! - A panic loses only the event being handled; the worker keeps going.
//! - Subscribers never delay a run's outcome or its handler.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use orchestrator::{Event, EventKind, Subscribe};
//!
//! struct Failures;
//!
//! #[async_trait]
//! impl Subscribe for Failures {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::TaskFailed) {
//!             // page someone
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failures" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of orchestrator events.
///
/// Implementations should use async I/O and handle their own errors; a panic is
/// caught and reported, but the event that caused it is lost.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event, called from the subscriber's own worker task.
    async fn on_event(&self, event: &Event);

    /// Name used in logs and in overflow/panic events.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to at least 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
