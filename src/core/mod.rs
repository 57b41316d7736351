// Core Module - Foundational types, config, logging, events

pub mod types;
pub mod config;
pub mod logger;
pub mod events;

// Re-export commonly used items for convenience
pub use types::*;
pub use config::{
    ConfigError, ConfigSummary, FeedConfig, HttpConfig, LoggingConfig, RelayConfig, StoreConfig,
};
pub use logger::setup_logging;
pub use events::{DomainEvent, EventBus, EventBusStatsSnapshot, EventKind, get_event_bus};
