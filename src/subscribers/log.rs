//! # Logging subscriber.
//!
//! [`LogWriter`] forwards every event to `tracing` with structured fields.
//! Install a `tracing` subscriber in the host application to see the output.
//!
//! ```text
//! INFO  task added     task=build
//! DEBUG task starting  task=build method=stream
//! INFO  task stopped   task=build method=stream duration_ms=12
//! WARN  task failed    task=build reason="execution failed: disk full"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that logs events through `tracing`.
///
/// Enabled via the `logging` feature.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let method = e.method.map(|m| m.as_label()).unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::TaskAdded | EventKind::TaskReplaced | EventKind::TaskRemoved => {
                tracing::info!(seq = e.seq, task, kind = ?e.kind, "registry changed");
            }
            EventKind::TaskStarting => {
                tracing::debug!(seq = e.seq, task, method, "task starting");
            }
            EventKind::TaskStopped => {
                tracing::info!(seq = e.seq, task, method, duration_ms = ?e.duration_ms, "task stopped");
            }
            EventKind::TaskFailed => {
                tracing::warn!(seq = e.seq, task, method, duration_ms = ?e.duration_ms, reason, "task failed");
            }
            EventKind::TaskNotFound => {
                tracing::warn!(seq = e.seq, task, "task not found");
            }
            EventKind::SubscriberPanicked | EventKind::SubscriberOverflow => {
                tracing::error!(seq = e.seq, subscriber = task, reason, kind = ?e.kind, "subscriber fault");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
