// Fanout layer: ordered delivery of domain events and summaries to subscribers

pub mod coordinator;
pub mod hub;

pub use coordinator::register_fanout;
pub use hub::{OutboundEvent, SubscriberHub, SUMMARY_CHANNEL};
