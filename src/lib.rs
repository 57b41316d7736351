// EDDN Relay - exploration telemetry ingestion and fanout
// Feed connector -> decoder -> classifier -> event bus -> store + subscribers

pub mod core;
pub mod fanout;
pub mod feed;
pub mod server;
pub mod store;
