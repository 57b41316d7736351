// Store layer: durable scan records and the derived daily summary

pub mod planet_scans;

pub use planet_scans::{DailyDiscoverySummary, PlanetScanStore, StoreError};
