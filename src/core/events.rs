// Event System for EDDN Relay
// Typed pub/sub bus over a closed set of domain event kinds

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::core::types::{
    PlanetScan, PlanetScanNewlyDiscovered, SystemBoop, SystemScanCompleted,
};

// ============================================================================
// Event Kind
// ============================================================================

/// The closed set of event kinds the relay routes. Each kind doubles as the
/// broadcast channel name subscribers see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    SystemBoop,
    PlanetScan,
    PlanetScanNewlyDiscovered,
    SystemScanCompleted,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::SystemBoop,
        EventKind::PlanetScan,
        EventKind::PlanetScanNewlyDiscovered,
        EventKind::SystemScanCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SystemBoop => "SystemBoop",
            EventKind::PlanetScan => "PlanetScan",
            EventKind::PlanetScanNewlyDiscovered => "PlanetScanNewlyDiscovered",
            EventKind::SystemScanCompleted => "SystemScanCompleted",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Domain Event
// ============================================================================

/// One classified feed message. Immutable once constructed; carries no
/// identity beyond its payload and is dropped after all handlers have run.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    SystemBoop(SystemBoop),
    PlanetScan(PlanetScan),
    PlanetScanNewlyDiscovered(PlanetScanNewlyDiscovered),
    SystemScanCompleted(SystemScanCompleted),
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::SystemBoop(_) => EventKind::SystemBoop,
            DomainEvent::PlanetScan(_) => EventKind::PlanetScan,
            DomainEvent::PlanetScanNewlyDiscovered(_) => EventKind::PlanetScanNewlyDiscovered,
            DomainEvent::SystemScanCompleted(_) => EventKind::SystemScanCompleted,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::SystemBoop(e) => e.timestamp,
            DomainEvent::PlanetScan(e) => e.timestamp,
            DomainEvent::PlanetScanNewlyDiscovered(e) => e.timestamp,
            DomainEvent::SystemScanCompleted(e) => e.timestamp,
        }
    }

    /// Payload as it goes over the wire to subscribers.
    pub fn payload_json(&self) -> serde_json::Value {
        match self {
            DomainEvent::SystemBoop(e) => serde_json::json!(e),
            DomainEvent::PlanetScan(e) => serde_json::json!(e),
            DomainEvent::PlanetScanNewlyDiscovered(e) => serde_json::json!(e),
            DomainEvent::SystemScanCompleted(e) => serde_json::json!(e),
        }
    }
}

impl fmt::Display for DomainEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainEvent::SystemBoop(e) => write!(f, "{}", e),
            DomainEvent::PlanetScan(e) => write!(f, "{}", e),
            DomainEvent::PlanetScanNewlyDiscovered(e) => write!(f, "{}", e),
            DomainEvent::SystemScanCompleted(e) => write!(f, "{}", e),
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

type EventHandler = Arc<dyn Fn(&DomainEvent) + Send + Sync>;

/// In-process pub/sub registry keyed by [`EventKind`].
///
/// Handlers for a kind run synchronously in registration order; `publish`
/// returns only after every handler has returned, which is what the fanout
/// ordering contract leans on. Handlers deal with their own failures (log
/// and return) so one handler never blocks the rest.
pub struct EventBus {
    handlers: RwLock<HashMap<EventKind, Vec<EventHandler>>>,
    stats: RwLock<EventBusStats>,
}

#[derive(Debug, Clone, Default)]
struct EventBusStats {
    total_published: u64,
    total_delivered: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            stats: RwLock::new(EventBusStats::default()),
        }
    }

    /// Register a handler for one event kind. Handlers run in the order
    /// they were registered.
    pub fn add_handler<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&DomainEvent) + Send + Sync + 'static,
    {
        self.handlers.write().entry(kind).or_default().push(Arc::new(handler));
        tracing::debug!(kind = %kind, "Registered event handler");
    }

    /// Deliver an event to every handler of its kind, in registration order.
    pub fn publish(&self, event: &DomainEvent) {
        self.stats.write().total_published += 1;

        // Clone the handler list out so a handler that registers further
        // handlers cannot deadlock against the registry lock.
        let callbacks: Vec<EventHandler> = self
            .handlers
            .read()
            .get(&event.kind())
            .map(|list| list.to_vec())
            .unwrap_or_default();

        for callback in &callbacks {
            callback(event);
        }

        self.stats.write().total_delivered += callbacks.len() as u64;
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.read().get(&kind).map_or(0, Vec::len)
    }

    pub fn get_stats(&self) -> EventBusStatsSnapshot {
        let stats = self.stats.read();
        let handlers = self.handlers.read();

        EventBusStatsSnapshot {
            total_published: stats.total_published,
            total_delivered: stats.total_delivered,
            registered_kinds: handlers.len(),
            handler_count: handlers.values().map(Vec::len).sum(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of event bus statistics
#[derive(Debug, Clone)]
pub struct EventBusStatsSnapshot {
    pub total_published: u64,
    pub total_delivered: u64,
    pub registered_kinds: usize,
    pub handler_count: usize,
}

impl fmt::Display for EventBusStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EventBus(published={}, delivered={}, kinds={}, handlers={})",
            self.total_published, self.total_delivered, self.registered_kinds, self.handler_count
        )
    }
}

// ============================================================================
// Global Event Bus (thread-safe singleton)
// ============================================================================

static GLOBAL_EVENT_BUS: OnceLock<Arc<EventBus>> = OnceLock::new();

/// Get global event bus instance (singleton)
pub fn get_event_bus() -> Arc<EventBus> {
    Arc::clone(GLOBAL_EVENT_BUS.get_or_init(|| Arc::new(EventBus::new())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Coordinates;

    fn make_boop_event() -> DomainEvent {
        DomainEvent::SystemBoop(SystemBoop::new(
            "Wredguia WD-K d8-1".to_string(),
            Coordinates::new(-38.5, 25.2, -6.1),
            "2024-06-01T10:00:00Z".parse().unwrap(),
            "CMDR Test".to_string(),
        ))
    }

    fn make_completed_event() -> DomainEvent {
        DomainEvent::SystemScanCompleted(SystemScanCompleted::new(
            9999,
            23,
            "2024-06-01T10:05:00Z".parse().unwrap(),
        ))
    }

    #[test]
    fn test_kind_names_match_channel_names() {
        assert_eq!(EventKind::SystemBoop.as_str(), "SystemBoop");
        assert_eq!(EventKind::PlanetScan.as_str(), "PlanetScan");
        assert_eq!(
            EventKind::PlanetScanNewlyDiscovered.as_str(),
            "PlanetScanNewlyDiscovered"
        );
        assert_eq!(EventKind::SystemScanCompleted.as_str(), "SystemScanCompleted");
        assert_eq!(EventKind::ALL.len(), 4);
    }

    #[test]
    fn test_event_kind_dispatch() {
        let event = make_boop_event();
        assert_eq!(event.kind(), EventKind::SystemBoop);
        assert_eq!(make_completed_event().kind(), EventKind::SystemScanCompleted);
    }

    #[test]
    fn test_payload_json_is_camel_case() {
        let json = make_boop_event().payload_json();
        assert_eq!(json["systemName"], "Wredguia WD-K d8-1");
        assert_eq!(json["reporter"], "CMDR Test");
        assert!(json["coordinates"]["x"].is_number());
    }

    #[test]
    fn test_publish_reaches_handler_of_same_kind_only() {
        let bus = EventBus::new();
        let hits = Arc::new(RwLock::new(Vec::new()));

        let hits_boop = Arc::clone(&hits);
        bus.add_handler(EventKind::SystemBoop, move |event| {
            hits_boop.write().push(format!("boop:{}", event.kind()));
        });
        let hits_done = Arc::clone(&hits);
        bus.add_handler(EventKind::SystemScanCompleted, move |event| {
            hits_done.write().push(format!("done:{}", event.kind()));
        });

        bus.publish(&make_boop_event());
        bus.publish(&make_boop_event());
        bus.publish(&make_completed_event());

        let seen = hits.read().clone();
        assert_eq!(
            seen,
            vec![
                "boop:SystemBoop".to_string(),
                "boop:SystemBoop".to_string(),
                "done:SystemScanCompleted".to_string(),
            ]
        );
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(RwLock::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.add_handler(EventKind::SystemBoop, move |_event| {
                order.write().push(label);
            });
        }

        bus.publish(&make_boop_event());
        assert_eq!(*order.read(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_publish_without_handlers_is_noop() {
        let bus = EventBus::new();
        bus.publish(&make_boop_event());

        let stats = bus.get_stats();
        assert_eq!(stats.total_published, 1);
        assert_eq!(stats.total_delivered, 0);
    }

    #[test]
    fn test_stats_count_deliveries() {
        let bus = EventBus::new();
        bus.add_handler(EventKind::SystemBoop, |_| {});
        bus.add_handler(EventKind::SystemBoop, |_| {});
        bus.publish(&make_boop_event());

        let stats = bus.get_stats();
        assert_eq!(stats.total_published, 1);
        assert_eq!(stats.total_delivered, 2);
        assert_eq!(bus.handler_count(EventKind::SystemBoop), 2);
        assert_eq!(bus.handler_count(EventKind::PlanetScan), 0);
    }
}
