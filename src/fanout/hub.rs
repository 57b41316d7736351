// Subscriber Hub - single broadcast pipe carrying channel-tagged events
// One pipe (not one channel per topic) so subscribers observe events in
// exactly the order they were broadcast, across channels

use serde::Serialize;
use std::fmt;
use tokio::sync::broadcast;
use tracing::trace;

/// Channel carrying the refreshed daily summary after each new discovery.
pub const SUMMARY_CHANNEL: &str = "NewlyDiscoveredBySimplifiedPlanetClassToday";

const DEFAULT_CAPACITY: usize = 256;

// ============================================================================
// OutboundEvent
// ============================================================================

/// One event as delivered to subscribers: a channel name plus its payload.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundEvent {
    pub channel: String,
    pub payload: serde_json::Value,
}

impl OutboundEvent {
    pub fn new(channel: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            channel: channel.into(),
            payload,
        }
    }
}

impl fmt::Display for OutboundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutboundEvent(channel={})", self.channel)
    }
}

// ============================================================================
// SubscriberHub
// ============================================================================

/// Fanout point for everything the relay pushes to clients.
///
/// Thread-safe and cloneable; clones share the same pipe. A subscriber that
/// falls more than the pipe capacity behind loses the oldest events rather
/// than stalling the producer.
#[derive(Clone)]
pub struct SubscriberHub {
    tx: broadcast::Sender<OutboundEvent>,
}

impl SubscriberHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Broadcast a payload on a channel. No-op if nobody is subscribed.
    pub fn broadcast(&self, channel: &str, payload: serde_json::Value) {
        trace!(channel = channel, "Broadcasting event");
        // Ignore send errors (no active receivers)
        let _ = self.tx.send(OutboundEvent::new(channel, payload));
    }

    /// Subscribe to the pipe, receiving every event from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<OutboundEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SubscriberHub {
    fn default() -> Self {
        Self::new()
    }
}
