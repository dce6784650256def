//! # Orchestrator configuration.
//!
//! [`Config`] is consumed by [`OrchestratorBuilder`](crate::OrchestratorBuilder).
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1

/// Settings for an [`Orchestrator`](crate::Orchestrator).
///
/// ## Field semantics
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `relieve_duplex`: drain the readable side of a returned duplex that nobody consumes
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel.
    ///
    /// Subscribers lagging more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,

    /// Whether the readable side of a returned duplex is drained when paused.
    ///
    /// Completion of a duplex always follows its writable side; this only keeps
    /// an unconsumed output buffer from stalling the writable side.
    pub relieve_duplex: bool,
}

impl Config {
    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// - `bus_capacity = 1024`
    /// - `relieve_duplex = true`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            relieve_duplex: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bus_capacity_is_clamped() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(Config::default().bus_capacity_clamped(), 1024);
        assert!(Config::default().relieve_duplex);
    }
}
