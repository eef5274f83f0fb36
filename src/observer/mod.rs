// Event-notification fan-out
//
// The room store publishes domain events here; cross-cutting consumers
// (logging, metrics, alerting, analytics) attach without the store
// knowing about any of them.

// Public API - what other modules can use
pub use bus::{EventBus, ObserverHandle};
pub use events::{DomainEvent, EventKind};
pub use handler::{NoOpObserver, Observer, ObserverError};
pub use observers::{
    AnalyticsObserver, LoggingObserver, MetricsObserver, Notification, NotificationObserver,
};

// Internal modules
mod bus;
mod events;
mod handler;
mod observers;
