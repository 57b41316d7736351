// Feed layer: EDDN connectivity, wire decoding, and event classification

pub mod classifier;
pub mod connector;
pub mod decoder;

pub use classifier::{simplify_planet_class, ClassifierStats, DiscoveryLedger, EventClassifier};
pub use connector::{ConnectorStats, EddnConnector};
pub use decoder::{
    schema_is_recognized, DecodeError, DecodedEnvelope, DecoderStats, EnvelopeHeader, FeedDecoder,
    RECOGNIZED_SCHEMAS, SCHEMA_ALL_BODIES_FOUND, SCHEMA_DISCOVERY_SCAN, SCHEMA_JOURNAL,
};
