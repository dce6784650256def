use std::sync::Arc;

use super::{config::Config, orchestrator::Orchestrator};
use crate::{
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for an [`Orchestrator`] with event subscribers.
///
/// ```rust
/// use std::sync::Arc;
/// use orchestrator::{Config, Orchestrator, Subscribe};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let subs: Vec<Arc<dyn Subscribe>> = Vec::new();
/// let orch = Orchestrator::builder(Config::default())
///     .with_subscribers(subs)
///     .build();
/// assert!(orch.tasks().is_empty());
/// # }
/// ```
pub struct OrchestratorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers.
    ///
    /// Each subscriber gets its own worker and bounded queue.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber.
    pub fn subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the orchestrator.
    ///
    /// With subscribers, this spawns their workers and the bus listener and must
    /// be called within a tokio runtime.
    pub fn build(self) -> Arc<Orchestrator> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let orch = Orchestrator::new_internal(self.cfg, bus.clone());

        if !self.subscribers.is_empty() {
            let subs = SubscriberSet::new(self.subscribers, bus);
            orch.spawn_subscriber_listener(subs);
        }
        Arc::new(orch)
    }
}
