use thiserror::Error;

use super::events::DomainEvent;

/// Error raised by an observer while handling an event.
///
/// Failures are isolated per observer: the bus logs them and keeps
/// invoking the remaining observers, and nothing surfaces to the
/// publisher's caller.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ObserverError {
    message: String,
}

impl ObserverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A passive consumer of domain events.
///
/// Observers are the reactive, cross-cutting components of the system:
/// audit logging, metrics counters, operator alerts, usage analytics.
/// New concerns attach to the bus without touching the publisher.
pub trait Observer: Send + Sync {
    /// Handle a published event. Runs synchronously on the publisher's
    /// call path, so implementations must not block.
    fn on_event(&self, event: &DomainEvent) -> Result<(), ObserverError>;

    /// Human-readable name for logging and debugging
    fn name(&self) -> &'static str;
}

/// A no-op observer for tests that need an `Observer` but no behavior
pub struct NoOpObserver;

impl Observer for NoOpObserver {
    fn on_event(&self, _event: &DomainEvent) -> Result<(), ObserverError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "NoOpObserver"
    }
}
