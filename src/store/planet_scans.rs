// Planet Scan Store - SQLite-backed record of first-seen planetary scans
// Keyed by (system_address, body_id); the daily summary is derived on read

use chrono::{DateTime, NaiveTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::PlanetScanRecord;
use crate::feed::classifier::DiscoveryLedger;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

// ============================================================================
// Daily summary
// ============================================================================

/// Count of scans first recorded today, grouped by simplified planet class.
///
/// Ordered map so serialized summaries list classes deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DailyDiscoverySummary(pub BTreeMap<String, i64>);

impl DailyDiscoverySummary {
    pub fn total(&self) -> i64 {
        self.0.values().sum()
    }

    pub fn count_for(&self, simplified_planet_class: &str) -> i64 {
        self.0.get(simplified_planet_class).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DailyDiscoverySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DailyDiscoverySummary(classes={}, total={})",
            self.0.len(),
            self.total()
        )
    }
}

// ============================================================================
// PlanetScanStore
// ============================================================================

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS planet_scans (
    system_address          INTEGER NOT NULL,
    body_id                 INTEGER NOT NULL,
    simplified_planet_class TEXT NOT NULL,
    scanned_at              TEXT NOT NULL,
    inserted_at             INTEGER NOT NULL,
    PRIMARY KEY (system_address, body_id)
);

CREATE INDEX IF NOT EXISTS idx_planet_scans_inserted_at
    ON planet_scans (inserted_at);
"#;

/// SQLite store of every planetary body first seen by this relay.
///
/// One row per body. A repeat scan of the same body is a no-op, so the table
/// doubles as the dedup ledger the classifier consults.
#[derive(Clone)]
pub struct PlanetScanStore {
    conn: Arc<Mutex<Connection>>,
}

impl PlanetScanStore {
    /// Open (or create) the database at `db_path` and apply the schema.
    /// `:memory:` is accepted for an ephemeral store.
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch(SCHEMA)?;

        info!(db_path = %db_path, "Planet scan store ready");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Record a newly discovered scan. Returns `true` if the row was
    /// inserted, `false` if the body was already recorded.
    pub fn insert(&self, record: &PlanetScanRecord) -> Result<bool, StoreError> {
        self.insert_at(record, Utc::now())
    }

    /// Record a scan with an explicit insertion instant. The instant decides
    /// which UTC day the scan counts toward in the daily summary.
    pub fn insert_at(
        &self,
        record: &PlanetScanRecord,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            r#"
            INSERT INTO planet_scans (
                system_address, body_id, simplified_planet_class, scanned_at, inserted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(system_address, body_id) DO NOTHING
            "#,
            params![
                record.system_address,
                record.body_id,
                record.simplified_planet_class,
                record.scanned_at.to_rfc3339(),
                now.timestamp(),
            ],
        )?;

        if inserted == 0 {
            debug!(
                system_address = record.system_address,
                body_id = record.body_id,
                "Scan already recorded"
            );
        }
        Ok(inserted > 0)
    }

    /// Whether a scan of this body has been recorded.
    pub fn contains(&self, system_address: i64, body_id: i64) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT 1 FROM planet_scans WHERE system_address = ?1 AND body_id = ?2",
        )?;
        let known = stmt.exists(params![system_address, body_id])?;
        Ok(known)
    }

    /// Summary of scans first recorded since the start of the current UTC
    /// day, grouped by simplified planet class. Always computed from the
    /// table, never cached.
    pub fn newly_discovered_by_simplified_planet_class_today(
        &self,
    ) -> Result<DailyDiscoverySummary, StoreError> {
        self.summary_at(Utc::now())
    }

    /// Daily summary relative to an explicit "now": scans recorded within
    /// the UTC day containing that instant.
    pub fn summary_at(&self, now: DateTime<Utc>) -> Result<DailyDiscoverySummary, StoreError> {
        let day_start = day_start_epoch(now);
        let day_end = day_start + 86_400;
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            r#"
            SELECT simplified_planet_class, COUNT(*)
            FROM planet_scans
            WHERE inserted_at >= ?1 AND inserted_at < ?2
            GROUP BY simplified_planet_class
            "#,
        )?;

        let rows = stmt.query_map(params![day_start, day_end], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut classes = BTreeMap::new();
        for row in rows {
            let (class, count) = row?;
            classes.insert(class, count);
        }
        Ok(DailyDiscoverySummary(classes))
    }

    /// Total number of recorded scans across all days.
    pub fn scan_count(&self) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        let count = conn.query_row("SELECT COUNT(*) FROM planet_scans", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl DiscoveryLedger for PlanetScanStore {
    /// A read failure classifies the body as undiscovered: the duplicate
    /// discovery that may produce is deduplicated again at insert time.
    fn is_known(&self, system_address: i64, body_id: i64) -> bool {
        match self.contains(system_address, body_id) {
            Ok(known) => known,
            Err(e) => {
                warn!(error = %e, "Ledger lookup failed, treating body as undiscovered");
                false
            }
        }
    }
}

/// Epoch second of 00:00:00 UTC on the day containing `now`.
fn day_start_epoch(now: DateTime<Utc>) -> i64 {
    now.date_naive().and_time(NaiveTime::MIN).and_utc().timestamp()
}
