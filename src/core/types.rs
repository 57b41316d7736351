// Core Type Definitions for EDDN Relay
// Domain event payloads and connection state shared across the pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Subscribed,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// Coordinates
// ============================================================================

/// Galactic position of a star system (the feed reports it as `[x, y, z]`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coordinates {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<[f64; 3]> for Coordinates {
    fn from(pos: [f64; 3]) -> Self {
        Self::new(pos[0], pos[1], pos[2])
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ============================================================================
// SystemBoop
// ============================================================================

/// A commander fired the discovery scanner in a system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemBoop {
    pub system_name: String,
    pub coordinates: Coordinates,
    pub timestamp: DateTime<Utc>,
    pub reporter: String,
}

impl SystemBoop {
    pub fn new(
        system_name: String,
        coordinates: Coordinates,
        timestamp: DateTime<Utc>,
        reporter: String,
    ) -> Self {
        Self {
            system_name,
            coordinates,
            timestamp,
            reporter,
        }
    }
}

impl fmt::Display for SystemBoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SystemBoop(system={}, pos={}, reporter={})",
            self.system_name, self.coordinates, self.reporter
        )
    }
}

// ============================================================================
// PlanetScan
// ============================================================================

/// A detailed surface scan of a planetary body.
///
/// `scan_payload` retains the full journal message so downstream consumers
/// see every field the feed carried, not just the ones classified here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanetScan {
    pub system_address: i64,
    pub body_id: i64,
    pub planet_class: String,
    pub timestamp: DateTime<Utc>,
    pub scan_payload: serde_json::Value,
}

impl PlanetScan {
    pub fn new(
        system_address: i64,
        body_id: i64,
        planet_class: String,
        timestamp: DateTime<Utc>,
        scan_payload: serde_json::Value,
    ) -> Self {
        Self {
            system_address,
            body_id,
            planet_class,
            timestamp,
            scan_payload,
        }
    }
}

impl fmt::Display for PlanetScan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PlanetScan(system={}, body={}, class={})",
            self.system_address, self.body_id, self.planet_class
        )
    }
}

// ============================================================================
// PlanetScanNewlyDiscovered
// ============================================================================

/// Refinement of [`PlanetScan`] for a body no scan has been recorded for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanetScanNewlyDiscovered {
    pub system_address: i64,
    pub body_id: i64,
    pub simplified_planet_class: String,
    pub timestamp: DateTime<Utc>,
    pub scan_payload: serde_json::Value,
}

impl PlanetScanNewlyDiscovered {
    pub fn new(
        system_address: i64,
        body_id: i64,
        simplified_planet_class: String,
        timestamp: DateTime<Utc>,
        scan_payload: serde_json::Value,
    ) -> Self {
        Self {
            system_address,
            body_id,
            simplified_planet_class,
            timestamp,
            scan_payload,
        }
    }
}

impl fmt::Display for PlanetScanNewlyDiscovered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PlanetScanNewlyDiscovered(system={}, body={}, class={})",
            self.system_address, self.body_id, self.simplified_planet_class
        )
    }
}

// ============================================================================
// SystemScanCompleted
// ============================================================================

/// All bodies in a system have been found.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemScanCompleted {
    pub system_address: i64,
    pub body_count: i64,
    pub timestamp: DateTime<Utc>,
}

impl SystemScanCompleted {
    pub fn new(system_address: i64, body_count: i64, timestamp: DateTime<Utc>) -> Self {
        Self {
            system_address,
            body_count,
            timestamp,
        }
    }
}

impl fmt::Display for SystemScanCompleted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SystemScanCompleted(system={}, bodies={})",
            self.system_address, self.body_count
        )
    }
}

// ============================================================================
// PlanetScanRecord
// ============================================================================

/// Durable form of a newly discovered scan, keyed by `(system_address,
/// body_id)`. The store stamps the insertion time itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanetScanRecord {
    pub system_address: i64,
    pub body_id: i64,
    pub simplified_planet_class: String,
    pub scanned_at: DateTime<Utc>,
}

impl PlanetScanRecord {
    pub fn new(
        system_address: i64,
        body_id: i64,
        simplified_planet_class: String,
        scanned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            system_address,
            body_id,
            simplified_planet_class,
            scanned_at,
        }
    }
}

impl From<&PlanetScanNewlyDiscovered> for PlanetScanRecord {
    fn from(event: &PlanetScanNewlyDiscovered) -> Self {
        Self::new(
            event.system_address,
            event.body_id,
            event.simplified_planet_class.clone(),
            event.timestamp,
        )
    }
}

impl fmt::Display for PlanetScanRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PlanetScanRecord(system={}, body={}, class={})",
            self.system_address, self.body_id, self.simplified_planet_class
        )
    }
}
