use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{info, warn};

use super::events::{DomainEvent, EventKind};
use super::handler::{Observer, ObserverError};

/// Writes a structured log line for every event it sees
pub struct LoggingObserver;

impl Observer for LoggingObserver {
    fn on_event(&self, event: &DomainEvent) -> Result<(), ObserverError> {
        info!(
            event = event.kind().as_str(),
            room_id = event.room_id(),
            "Domain event"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LoggingObserver"
    }
}

/// Counts occurrences per event kind
#[derive(Default)]
pub struct MetricsObserver {
    counts: Mutex<HashMap<EventKind, u64>>,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, kind: EventKind) -> u64 {
        self.counts.lock().unwrap().get(&kind).copied().unwrap_or(0)
    }

    pub fn metrics(&self) -> HashMap<EventKind, u64> {
        self.counts.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.counts.lock().unwrap().clear();
    }
}

impl Observer for MetricsObserver {
    fn on_event(&self, event: &DomainEvent) -> Result<(), ObserverError> {
        let mut counts = self.counts.lock().unwrap();
        *counts.entry(event.kind()).or_insert(0) += 1;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MetricsObserver"
    }
}

/// A timestamped record of an observed event
#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: EventKind,
    pub room_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Retains a timestamped feed of events and flags room deletions, which
/// operators usually want to hear about
#[derive(Default)]
pub struct NotificationObserver {
    notifications: Mutex<Vec<Notification>>,
}

impl NotificationObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.notifications.lock().unwrap().clear();
    }
}

impl Observer for NotificationObserver {
    fn on_event(&self, event: &DomainEvent) -> Result<(), ObserverError> {
        self.notifications.lock().unwrap().push(Notification {
            kind: event.kind(),
            room_id: event.room_id().to_string(),
            timestamp: Utc::now(),
        });

        if let DomainEvent::RoomDeleted {
            room_id,
            deleted_by,
        } = event
        {
            warn!(
                room_id = %room_id,
                deleted_by = %deleted_by,
                "Room deleted"
            );
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "NotificationObserver"
    }
}

#[derive(Debug, Clone)]
struct KindUsage {
    count: u64,
    last_occurrence: DateTime<Utc>,
}

/// Tracks per-kind usage: how often each event fires and when it last did
#[derive(Default)]
pub struct AnalyticsObserver {
    usage: Mutex<HashMap<EventKind, KindUsage>>,
}

impl AnalyticsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_count(&self, kind: EventKind) -> u64 {
        self.usage
            .lock()
            .unwrap()
            .get(&kind)
            .map(|u| u.count)
            .unwrap_or(0)
    }

    pub fn last_occurrence(&self, kind: EventKind) -> Option<DateTime<Utc>> {
        self.usage
            .lock()
            .unwrap()
            .get(&kind)
            .map(|u| u.last_occurrence)
    }
}

impl Observer for AnalyticsObserver {
    fn on_event(&self, event: &DomainEvent) -> Result<(), ObserverError> {
        let mut usage = self.usage.lock().unwrap();
        let entry = usage.entry(event.kind()).or_insert(KindUsage {
            count: 0,
            last_occurrence: Utc::now(),
        });
        entry.count += 1;
        entry.last_occurrence = Utc::now();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "AnalyticsObserver"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::models::{Room, RoomSpec};

    fn created() -> DomainEvent {
        DomainEvent::RoomCreated {
            room: Room::from_spec(RoomSpec {
                id: Some("r1".to_string()),
                ..Default::default()
            }),
        }
    }

    fn deleted() -> DomainEvent {
        DomainEvent::RoomDeleted {
            room_id: "r1".to_string(),
            deleted_by: "admin".to_string(),
        }
    }

    #[test]
    fn test_metrics_observer_counts_per_kind() {
        let metrics = MetricsObserver::new();

        metrics.on_event(&created()).unwrap();
        metrics.on_event(&created()).unwrap();
        metrics.on_event(&deleted()).unwrap();

        assert_eq!(metrics.count(EventKind::RoomCreated), 2);
        assert_eq!(metrics.count(EventKind::RoomDeleted), 1);
        assert_eq!(metrics.count(EventKind::UserJoinedRoom), 0);

        metrics.reset();
        assert_eq!(metrics.count(EventKind::RoomCreated), 0);
    }

    #[test]
    fn test_notification_observer_retains_records() {
        let notifications = NotificationObserver::new();

        notifications.on_event(&created()).unwrap();
        notifications.on_event(&deleted()).unwrap();

        let records = notifications.notifications();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, EventKind::RoomCreated);
        assert_eq!(records[1].kind, EventKind::RoomDeleted);
        assert_eq!(records[1].room_id, "r1");

        notifications.clear();
        assert!(notifications.notifications().is_empty());
    }

    #[test]
    fn test_analytics_observer_tracks_usage() {
        let analytics = AnalyticsObserver::new();
        assert_eq!(analytics.event_count(EventKind::RoomCreated), 0);
        assert!(analytics.last_occurrence(EventKind::RoomCreated).is_none());

        analytics.on_event(&created()).unwrap();
        analytics.on_event(&created()).unwrap();

        assert_eq!(analytics.event_count(EventKind::RoomCreated), 2);
        assert!(analytics.last_occurrence(EventKind::RoomCreated).is_some());
    }
}
