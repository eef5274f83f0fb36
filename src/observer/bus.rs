use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

use super::events::{DomainEvent, EventKind};
use super::handler::Observer;

/// Subscription proof returned by [`EventBus::subscribe`].
///
/// Unsubscribing takes the handle back, so a registration can only be
/// removed by whoever holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverHandle {
    id: u64,
    kind: Option<EventKind>,
}

/// Synchronous publish/subscribe fan-out for domain events.
///
/// Observers register under a specific event kind or under the wildcard
/// channel (`None`). A publish invokes the kind-specific observers first,
/// then the wildcard observers, each in registration order. An observer
/// failure is logged and never aborts the publish.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<Mutex<HashMap<Option<EventKind>, Vec<Registration>>>>,
    next_id: Arc<AtomicU64>,
}

struct Registration {
    id: u64,
    observer: Arc<dyn Observer>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Registers an observer under `kind`, or under the wildcard channel
    /// when `kind` is `None`
    pub fn subscribe(&self, kind: Option<EventKind>, observer: Arc<dyn Observer>) -> ObserverHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(
            observer = observer.name(),
            channel = kind.map(|k| k.as_str()).unwrap_or("*"),
            "Observer subscribed"
        );

        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(kind)
            .or_default()
            .push(Registration { id, observer });

        ObserverHandle { id, kind }
    }

    /// Removes the registration the handle denotes. Idempotent.
    pub fn unsubscribe(&self, handle: &ObserverHandle) {
        let mut channels = self.channels.lock().unwrap();
        if let Some(registrations) = channels.get_mut(&handle.kind) {
            registrations.retain(|r| r.id != handle.id);
            if registrations.is_empty() {
                channels.remove(&handle.kind);
            }
        }
    }

    /// Synchronously delivers `event` to every observer of its kind, then
    /// to every wildcard observer, in registration order
    pub fn publish(&self, event: &DomainEvent) {
        let targets: Vec<Arc<dyn Observer>> = {
            let channels = self.channels.lock().unwrap();
            let specific = channels
                .get(&Some(event.kind()))
                .into_iter()
                .flatten()
                .map(|r| r.observer.clone());
            let wildcard = channels
                .get(&None)
                .into_iter()
                .flatten()
                .map(|r| r.observer.clone());
            specific.chain(wildcard).collect()
        };

        debug!(
            event = event.kind().as_str(),
            room_id = event.room_id(),
            observers = targets.len(),
            "Publishing event"
        );

        for observer in targets {
            if let Err(e) = observer.on_event(event) {
                // Isolate the failure; remaining observers still run.
                error!(
                    observer = observer.name(),
                    event = event.kind().as_str(),
                    error = %e,
                    "Observer failed"
                );
            }
        }
    }

    /// Number of observers on a specific channel, or on the wildcard channel
    pub fn subscriber_count(&self, kind: Option<EventKind>) -> usize {
        let channels = self.channels.lock().unwrap();
        channels.get(&kind).map(|v| v.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::handler::ObserverError;
    use crate::room::models::{Room, RoomSpec};
    use std::sync::Mutex as StdMutex;

    struct RecordingObserver {
        name: &'static str,
        seen: StdMutex<Vec<&'static str>>,
    }

    impl RecordingObserver {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                seen: StdMutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<&'static str> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Observer for RecordingObserver {
        fn on_event(&self, event: &DomainEvent) -> Result<(), ObserverError> {
            self.seen.lock().unwrap().push(event.kind().as_str());
            Ok(())
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    struct FailingObserver;

    impl Observer for FailingObserver {
        fn on_event(&self, _event: &DomainEvent) -> Result<(), ObserverError> {
            Err(ObserverError::new("simulated failure"))
        }

        fn name(&self) -> &'static str {
            "FailingObserver"
        }
    }

    fn created_event() -> DomainEvent {
        DomainEvent::RoomCreated {
            room: Room::from_spec(RoomSpec {
                id: Some("r1".to_string()),
                ..Default::default()
            }),
        }
    }

    fn deleted_event() -> DomainEvent {
        DomainEvent::RoomDeleted {
            room_id: "r1".to_string(),
            deleted_by: "u1".to_string(),
        }
    }

    #[test]
    fn test_specific_channel_only_sees_its_kind() {
        let bus = EventBus::new();
        let observer = RecordingObserver::new("specific");
        bus.subscribe(Some(EventKind::RoomCreated), observer.clone());

        bus.publish(&created_event());
        bus.publish(&deleted_event());

        assert_eq!(observer.seen(), vec!["roomCreated"]);
    }

    #[test]
    fn test_wildcard_sees_every_kind() {
        let bus = EventBus::new();
        let observer = RecordingObserver::new("wildcard");
        bus.subscribe(None, observer.clone());

        bus.publish(&created_event());
        bus.publish(&deleted_event());

        assert_eq!(observer.seen(), vec!["roomCreated", "roomDeleted"]);
    }

    #[test]
    fn test_failing_observer_does_not_stop_the_rest() {
        let bus = EventBus::new();
        let after = RecordingObserver::new("after");
        bus.subscribe(Some(EventKind::RoomCreated), Arc::new(FailingObserver));
        bus.subscribe(Some(EventKind::RoomCreated), after.clone());

        bus.publish(&created_event());

        assert_eq!(after.seen(), vec!["roomCreated"]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent_and_exact() {
        let bus = EventBus::new();
        let kept = RecordingObserver::new("kept");
        let removed = RecordingObserver::new("removed");

        bus.subscribe(Some(EventKind::RoomCreated), kept.clone());
        let handle = bus.subscribe(Some(EventKind::RoomCreated), removed.clone());

        bus.unsubscribe(&handle);
        bus.unsubscribe(&handle); // no-op the second time

        bus.publish(&created_event());

        assert_eq!(kept.seen(), vec!["roomCreated"]);
        assert!(removed.seen().is_empty());
    }

    #[test]
    fn test_subscriber_counts_per_channel() {
        use crate::observer::NoOpObserver;

        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(Some(EventKind::RoomCreated)), 0);
        assert_eq!(bus.subscriber_count(None), 0);

        bus.subscribe(Some(EventKind::RoomCreated), Arc::new(NoOpObserver));
        bus.subscribe(Some(EventKind::RoomCreated), Arc::new(NoOpObserver));
        let handle = bus.subscribe(None, Arc::new(NoOpObserver));

        assert_eq!(bus.subscriber_count(Some(EventKind::RoomCreated)), 2);
        assert_eq!(bus.subscriber_count(None), 1);

        bus.unsubscribe(&handle);
        assert_eq!(bus.subscriber_count(None), 0);
    }

    #[test]
    fn test_registration_order_is_preserved() {
        let bus = EventBus::new();
        let order: Arc<StdMutex<Vec<&'static str>>> = Arc::new(StdMutex::new(Vec::new()));

        struct Tagged {
            tag: &'static str,
            order: Arc<StdMutex<Vec<&'static str>>>,
        }
        impl Observer for Tagged {
            fn on_event(&self, _event: &DomainEvent) -> Result<(), ObserverError> {
                self.order.lock().unwrap().push(self.tag);
                Ok(())
            }
            fn name(&self) -> &'static str {
                self.tag
            }
        }

        bus.subscribe(
            Some(EventKind::RoomCreated),
            Arc::new(Tagged {
                tag: "first",
                order: order.clone(),
            }),
        );
        bus.subscribe(
            None,
            Arc::new(Tagged {
                tag: "wildcard",
                order: order.clone(),
            }),
        );
        bus.subscribe(
            Some(EventKind::RoomCreated),
            Arc::new(Tagged {
                tag: "second",
                order: order.clone(),
            }),
        );

        bus.publish(&created_event());

        // Specific channel in registration order, then the wildcard channel.
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "wildcard"]);
    }
}
