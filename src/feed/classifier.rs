// Event Classifier - lookup-table mapping from feed envelopes to domain events
// One envelope yields zero, one, or two domain events

use crate::core::{
    Coordinates, DomainEvent, EventKind, PlanetScan, PlanetScanNewlyDiscovered, SystemBoop,
    SystemScanCompleted,
};
use crate::feed::decoder::{
    DecodedEnvelope, SCHEMA_ALL_BODIES_FOUND, SCHEMA_DISCOVERY_SCAN, SCHEMA_JOURNAL,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::trace;

// ============================================================================
// Discovery Ledger
// ============================================================================

/// Lookup into previously recorded scans, used to decide whether a planet
/// scan also counts as a new discovery. The store implements this.
pub trait DiscoveryLedger: Send + Sync {
    fn is_known(&self, system_address: i64, body_id: i64) -> bool;
}

// ============================================================================
// Raw message structures (feed field names)
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawDiscoveryScan {
    #[serde(rename = "SystemName")]
    system_name: String,
    #[serde(rename = "StarPos")]
    star_pos: [f64; 3],
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct RawAllBodiesFound {
    #[serde(rename = "SystemAddress")]
    system_address: i64,
    #[serde(rename = "Count")]
    count: i64,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct RawJournalScan {
    #[serde(rename = "SystemAddress")]
    system_address: i64,
    #[serde(rename = "BodyID")]
    body_id: i64,
    // Stars carry StarType instead; only planetary scans have PlanetClass.
    #[serde(rename = "PlanetClass")]
    planet_class: Option<String>,
    timestamp: String,
}

// ============================================================================
// Classifier statistics
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ClassifierStats {
    pub system_boops: u64,
    pub planet_scans: u64,
    pub newly_discovered: u64,
    pub system_scans_completed: u64,
    pub discards: u64,
}

impl ClassifierStats {
    pub fn events_emitted(&self) -> u64 {
        self.system_boops + self.planet_scans + self.newly_discovered + self.system_scans_completed
    }
}

// ============================================================================
// EventClassifier
// ============================================================================

/// Maps decoded envelopes onto the closed set of domain events.
///
/// Classification is a total function: an envelope that matches no entry in
/// the lookup table, or is missing a field an entry requires, yields an empty
/// result rather than an error.
pub struct EventClassifier {
    ledger: Arc<dyn DiscoveryLedger>,
    pub stats: ClassifierStats,
}

impl EventClassifier {
    pub fn new(ledger: Arc<dyn DiscoveryLedger>) -> Self {
        Self {
            ledger,
            stats: ClassifierStats::default(),
        }
    }

    /// Classify one envelope into its domain events, in emission order.
    ///
    /// A planetary scan of a body the ledger does not know yields the base
    /// [`DomainEvent::PlanetScan`] first and the newly-discovered refinement
    /// second.
    pub fn classify(&mut self, envelope: &DecodedEnvelope) -> Vec<DomainEvent> {
        let events: Vec<DomainEvent> = if envelope.schema_matches(SCHEMA_DISCOVERY_SCAN) {
            self.classify_discovery_scan(envelope).into_iter().collect()
        } else if envelope.schema_matches(SCHEMA_ALL_BODIES_FOUND) {
            self.classify_all_bodies_found(envelope).into_iter().collect()
        } else if envelope.schema_matches(SCHEMA_JOURNAL) {
            self.classify_journal_scan(envelope)
        } else {
            Vec::new()
        };

        if events.is_empty() {
            self.stats.discards += 1;
            trace!(schema = %envelope.schema_ref, "Envelope matched no domain event");
        } else {
            for event in &events {
                self.record(event.kind());
            }
        }

        events
    }

    fn classify_discovery_scan(&self, envelope: &DecodedEnvelope) -> Option<DomainEvent> {
        let raw: RawDiscoveryScan = serde_json::from_value(envelope.message.clone()).ok()?;
        let timestamp = parse_timestamp(&raw.timestamp)?;

        Some(DomainEvent::SystemBoop(SystemBoop::new(
            raw.system_name,
            Coordinates::from(raw.star_pos),
            timestamp,
            envelope.header.uploader_id.clone(),
        )))
    }

    fn classify_all_bodies_found(&self, envelope: &DecodedEnvelope) -> Option<DomainEvent> {
        let raw: RawAllBodiesFound = serde_json::from_value(envelope.message.clone()).ok()?;
        let timestamp = parse_timestamp(&raw.timestamp)?;

        Some(DomainEvent::SystemScanCompleted(SystemScanCompleted::new(
            raw.system_address,
            raw.count,
            timestamp,
        )))
    }

    fn classify_journal_scan(&self, envelope: &DecodedEnvelope) -> Vec<DomainEvent> {
        let event_name = envelope
            .message
            .get("event")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        if event_name != "Scan" {
            return Vec::new();
        }

        let raw: RawJournalScan = match serde_json::from_value(envelope.message.clone()) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        let planet_class = match raw.planet_class {
            Some(class) => class,
            None => return Vec::new(),
        };
        let timestamp = match parse_timestamp(&raw.timestamp) {
            Some(ts) => ts,
            None => return Vec::new(),
        };

        let mut events = vec![DomainEvent::PlanetScan(PlanetScan::new(
            raw.system_address,
            raw.body_id,
            planet_class.clone(),
            timestamp,
            envelope.message.clone(),
        ))];

        if !self.ledger.is_known(raw.system_address, raw.body_id) {
            events.push(DomainEvent::PlanetScanNewlyDiscovered(
                PlanetScanNewlyDiscovered::new(
                    raw.system_address,
                    raw.body_id,
                    simplify_planet_class(&planet_class),
                    timestamp,
                    envelope.message.clone(),
                ),
            ));
        }

        events
    }

    fn record(&mut self, kind: EventKind) {
        match kind {
            EventKind::SystemBoop => self.stats.system_boops += 1,
            EventKind::PlanetScan => self.stats.planet_scans += 1,
            EventKind::PlanetScanNewlyDiscovered => self.stats.newly_discovered += 1,
            EventKind::SystemScanCompleted => self.stats.system_scans_completed += 1,
        }
    }

    /// Reset all statistics
    pub fn reset_stats(&mut self) {
        self.stats = ClassifierStats::default();
    }
}

// ============================================================================
// Standalone helpers
// ============================================================================

/// Collapse the game's planet class zoo into coarse buckets for aggregation.
/// Every gas giant subclass folds into "Gas giant"; all other classes pass
/// through unchanged.
pub fn simplify_planet_class(planet_class: &str) -> String {
    if planet_class.to_lowercase().contains("gas giant") {
        "Gas giant".to_string()
    } else {
        planet_class.to_string()
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
