// Fanout Coordinator - wires bus events to the subscriber hub and the store
// For a new discovery the order is fixed: broadcast the raw event, record it,
// then re-derive and broadcast the daily summary

use serde_json::json;
use tracing::error;

use crate::core::{DomainEvent, EventBus, EventKind, PlanetScanRecord};
use crate::fanout::hub::{SubscriberHub, SUMMARY_CHANNEL};
use crate::store::PlanetScanStore;

/// Register one handler per event kind on the bus.
///
/// Three kinds pass straight through to subscribers on the channel named
/// after the kind. `PlanetScanNewlyDiscovered` additionally drives the store:
/// the raw event goes out first, the scan is recorded, and only then is the
/// refreshed summary broadcast, so every subscriber sees a summary that
/// already includes the discovery that preceded it.
pub fn register_fanout(bus: &EventBus, hub: &SubscriberHub, store: &PlanetScanStore) {
    for kind in [
        EventKind::SystemBoop,
        EventKind::PlanetScan,
        EventKind::SystemScanCompleted,
    ] {
        let hub = hub.clone();
        bus.add_handler(kind, move |event| {
            hub.broadcast(event.kind().as_str(), event.payload_json());
        });
    }

    let hub = hub.clone();
    let store = store.clone();
    bus.add_handler(EventKind::PlanetScanNewlyDiscovered, move |event| {
        hub.broadcast(event.kind().as_str(), event.payload_json());

        if let DomainEvent::PlanetScanNewlyDiscovered(discovery) = event {
            let record = PlanetScanRecord::from(discovery);
            if let Err(e) = store.insert(&record) {
                error!(error = %e, record = %record, "Failed to record discovery, summary not refreshed");
                return;
            }
            match store.newly_discovered_by_simplified_planet_class_today() {
                Ok(summary) => hub.broadcast(SUMMARY_CHANNEL, json!(summary)),
                Err(e) => error!(error = %e, "Failed to derive daily summary"),
            }
        }
    });
}
