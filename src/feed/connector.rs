// EDDN Connector - ZeroMQ subscriber with automatic reconnection
// Messages flow through one sequential stream: receive, decode, classify, publish

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};
use zeromq::{Socket, SocketRecv, SubSocket};

use crate::core::{ConnectionStatus, EventBus, FeedConfig};
use crate::feed::classifier::{DiscoveryLedger, EventClassifier};
use crate::feed::decoder::FeedDecoder;

// ============================================================================
// Connector statistics
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ConnectorStats {
    pub messages_received: u64,
    pub decode_failures: u64,
    pub unrecognized_schemas: u64,
    pub discards: u64,
    pub events_published: u64,
    pub reconnects: u64,
}

impl fmt::Display for ConnectorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConnectorStats(received={}, decode_failures={}, unrecognized={}, discards={}, published={}, reconnects={})",
            self.messages_received,
            self.decode_failures,
            self.unrecognized_schemas,
            self.discards,
            self.events_published,
            self.reconnects
        )
    }
}

// ============================================================================
// EddnConnector
// ============================================================================

/// Subscribes to the EDDN relay and feeds every frame through the decode and
/// classify stages, publishing the resulting domain events on the bus.
///
/// All messages are processed on one task in arrival order, so events reach
/// the bus in the order the feed delivered them.
pub struct EddnConnector {
    config: FeedConfig,
    bus: Arc<EventBus>,
    ledger: Arc<dyn DiscoveryLedger>,
    status: Arc<RwLock<ConnectionStatus>>,
    stats: Arc<RwLock<ConnectorStats>>,
}

impl EddnConnector {
    pub fn new(config: FeedConfig, bus: Arc<EventBus>, ledger: Arc<dyn DiscoveryLedger>) -> Self {
        Self {
            config,
            bus,
            ledger,
            status: Arc::new(RwLock::new(ConnectionStatus::Disconnected)),
            stats: Arc::new(RwLock::new(ConnectorStats::default())),
        }
    }

    /// Establish the initial subscription and spawn the receive loop.
    ///
    /// The first connection attempt is not retried: if the feed cannot be
    /// reached at startup the error propagates to the caller. Once this
    /// returns `Ok`, the loop reconnects on its own for as long as the
    /// process lives.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let socket = connect_and_subscribe(&self.config.endpoint, &self.status).await?;

        let config = self.config.clone();
        let bus = self.bus.clone();
        let ledger = self.ledger.clone();
        let status = self.status.clone();
        let stats = self.stats.clone();

        tokio::spawn(async move {
            run_feed(socket, config, bus, ledger, status, stats).await;
        });

        Ok(())
    }

    /// Current connection state
    pub fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    pub fn is_subscribed(&self) -> bool {
        self.status() == ConnectionStatus::Subscribed
    }

    /// Get statistics snapshot
    pub fn get_stats(&self) -> ConnectorStats {
        self.stats.read().clone()
    }
}

// ============================================================================
// Receive loop
// ============================================================================

/// Main feed loop: receive frames until the socket errors or goes quiet,
/// then reconnect with exponential backoff. Never returns.
async fn run_feed(
    mut socket: SubSocket,
    config: FeedConfig,
    bus: Arc<EventBus>,
    ledger: Arc<dyn DiscoveryLedger>,
    status: Arc<RwLock<ConnectionStatus>>,
    stats: Arc<RwLock<ConnectorStats>>,
) {
    let mut decoder = FeedDecoder::new();
    let mut classifier = EventClassifier::new(ledger);
    let read_timeout = Duration::from_secs(config.read_timeout_secs);

    loop {
        match timeout(read_timeout, socket.recv()).await {
            Ok(Ok(message)) => {
                let frame = match message.get(0) {
                    Some(frame) => frame,
                    None => {
                        warn!("Feed delivered a message without frames");
                        continue;
                    }
                };
                stats.write().messages_received += 1;
                process_frame(frame, &mut decoder, &mut classifier, &bus, &stats);
            }
            Ok(Err(e)) => {
                error!(error = %e, "Feed receive error");
                socket = reconnect(&config, &status, &stats).await;
            }
            Err(_) => {
                warn!(
                    timeout_secs = config.read_timeout_secs,
                    "Feed went quiet, reconnecting"
                );
                socket = reconnect(&config, &status, &stats).await;
            }
        }
    }
}

/// Process one raw frame end to end. Failures are logged and dropped; a bad
/// message never takes the loop down.
fn process_frame(
    frame: &[u8],
    decoder: &mut FeedDecoder,
    classifier: &mut EventClassifier,
    bus: &EventBus,
    stats: &Arc<RwLock<ConnectorStats>>,
) {
    let envelope = match decoder.decode(frame) {
        Ok(envelope) => envelope,
        Err(e) if e.is_unrecognized_schema() => {
            trace!(error = %e, "Skipping feed message");
            stats.write().unrecognized_schemas += 1;
            return;
        }
        Err(e) => {
            warn!(error = %e, "Failed to decode feed message");
            stats.write().decode_failures += 1;
            return;
        }
    };

    let events = classifier.classify(&envelope);
    if events.is_empty() {
        stats.write().discards += 1;
        return;
    }

    for event in &events {
        debug!(event = %event, "Publishing domain event");
        bus.publish(event);
    }
    stats.write().events_published += events.len() as u64;
}

// ============================================================================
// Connection management
// ============================================================================

async fn connect_and_subscribe(
    endpoint: &str,
    status: &Arc<RwLock<ConnectionStatus>>,
) -> Result<SubSocket, Box<dyn std::error::Error + Send + Sync>> {
    *status.write() = ConnectionStatus::Connecting;
    debug!(endpoint = %endpoint, "Connecting to feed");

    let mut socket = SubSocket::new();
    socket.connect(endpoint).await?;
    // Empty topic: the feed publishes everything on one channel.
    socket.subscribe("").await?;

    *status.write() = ConnectionStatus::Subscribed;
    info!(endpoint = %endpoint, "Subscribed to feed");
    Ok(socket)
}

/// Retry until a fresh subscription is live, sleeping between attempts.
/// The attempt counter resets once a connection is established.
async fn reconnect(
    config: &FeedConfig,
    status: &Arc<RwLock<ConnectionStatus>>,
    stats: &Arc<RwLock<ConnectorStats>>,
) -> SubSocket {
    *status.write() = ConnectionStatus::Disconnected;
    let mut attempt = 0u32;

    loop {
        let delay_secs = backoff_delay_secs(attempt, config.max_backoff_secs);
        attempt = attempt.saturating_add(1);
        warn!(delay_secs = delay_secs, attempt = attempt, "Reconnecting to feed");
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;

        match connect_and_subscribe(&config.endpoint, status).await {
            Ok(socket) => {
                stats.write().reconnects += 1;
                return socket;
            }
            Err(e) => {
                error!(error = %e, attempt = attempt, "Feed reconnect failed");
            }
        }
    }
}

fn backoff_delay_secs(attempt: u32, max_backoff_secs: u64) -> u64 {
    std::cmp::min(2_u64.saturating_pow(attempt), max_backoff_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EventKind;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use parking_lot::Mutex;
    use std::io::Write;

    struct EmptyLedger;

    impl DiscoveryLedger for EmptyLedger {
        fn is_known(&self, _system_address: i64, _body_id: i64) -> bool {
            false
        }
    }

    fn compress(text: &str) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    fn make_connector() -> EddnConnector {
        EddnConnector::new(
            FeedConfig::default(),
            Arc::new(EventBus::new()),
            Arc::new(EmptyLedger),
        )
    }

    #[test]
    fn test_connector_starts_disconnected() {
        let connector = make_connector();
        assert_eq!(connector.status(), ConnectionStatus::Disconnected);
        assert!(!connector.is_subscribed());
        assert_eq!(connector.get_stats().messages_received, 0);
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        assert_eq!(backoff_delay_secs(0, 60), 1);
        assert_eq!(backoff_delay_secs(1, 60), 2);
        assert_eq!(backoff_delay_secs(5, 60), 32);
        assert_eq!(backoff_delay_secs(6, 60), 60);
        assert_eq!(backoff_delay_secs(20, 60), 60);
        // Large attempt counts must not overflow.
        assert_eq!(backoff_delay_secs(200, 60), 60);
    }

    #[test]
    fn test_process_frame_publishes_in_order() {
        let bus = EventBus::new();
        let seen: Arc<Mutex<Vec<EventKind>>> = Arc::new(Mutex::new(Vec::new()));
        for kind in EventKind::ALL {
            let seen = seen.clone();
            bus.add_handler(kind, move |event| {
                seen.lock().push(event.kind());
            });
        }

        let mut decoder = FeedDecoder::new();
        let mut classifier = EventClassifier::new(Arc::new(EmptyLedger));
        let stats = Arc::new(RwLock::new(ConnectorStats::default()));

        let frame = compress(
            r#"{
                "$schemaRef": "https://eddn.edcd.io/schemas/journal/1",
                "header": {"uploaderID": "CMDR Test"},
                "message": {
                    "event": "Scan",
                    "SystemAddress": 99,
                    "BodyID": 4,
                    "PlanetClass": "Water world",
                    "timestamp": "2024-06-01T10:00:00Z"
                }
            }"#,
        );
        process_frame(&frame, &mut decoder, &mut classifier, &bus, &stats);

        assert_eq!(
            *seen.lock(),
            vec![EventKind::PlanetScan, EventKind::PlanetScanNewlyDiscovered]
        );
        assert_eq!(stats.read().events_published, 2);
    }

    #[test]
    fn test_process_frame_survives_garbage() {
        let bus = EventBus::new();
        let mut decoder = FeedDecoder::new();
        let mut classifier = EventClassifier::new(Arc::new(EmptyLedger));
        let stats = Arc::new(RwLock::new(ConnectorStats::default()));

        process_frame(b"not zlib at all", &mut decoder, &mut classifier, &bus, &stats);
        assert_eq!(stats.read().decode_failures, 1);
        assert_eq!(stats.read().events_published, 0);
    }

    #[test]
    fn test_process_frame_counts_unrecognized_schema() {
        let bus = EventBus::new();
        let mut decoder = FeedDecoder::new();
        let mut classifier = EventClassifier::new(Arc::new(EmptyLedger));
        let stats = Arc::new(RwLock::new(ConnectorStats::default()));

        let frame = compress(
            r#"{"$schemaRef": "https://eddn.edcd.io/schemas/commodity/3", "message": {}}"#,
        );
        process_frame(&frame, &mut decoder, &mut classifier, &bus, &stats);
        assert_eq!(stats.read().unrecognized_schemas, 1);
        assert_eq!(stats.read().decode_failures, 0);
    }
}
