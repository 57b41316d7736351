// Feed Decoder - EDDN wire format
// Each feed frame is a zlib-compressed JSON envelope tagged with a schema reference

use flate2::read::ZlibDecoder;
use serde::Deserialize;
use std::io::Read;

// ============================================================================
// Recognized Schemas
// ============================================================================

pub const SCHEMA_DISCOVERY_SCAN: &str = "https://eddn.edcd.io/schemas/fssdiscoveryscan/1";
pub const SCHEMA_ALL_BODIES_FOUND: &str = "https://eddn.edcd.io/schemas/fssallbodiesfound/1";
pub const SCHEMA_JOURNAL: &str = "https://eddn.edcd.io/schemas/journal/1";

/// Schema prefixes this relay consumes. The feed carries many more (commodity
/// prices, shipyard stock, ...) which are dropped at the decode stage.
pub const RECOGNIZED_SCHEMAS: [&str; 3] = [
    SCHEMA_DISCOVERY_SCAN,
    SCHEMA_ALL_BODIES_FOUND,
    SCHEMA_JOURNAL,
];

// ============================================================================
// Decoded Envelope
// ============================================================================

/// Outer envelope of one feed message. The payload stays untyped here; the
/// classifier gives it shape per schema.
#[derive(Debug, Clone, Deserialize)]
pub struct DecodedEnvelope {
    #[serde(rename = "$schemaRef")]
    pub schema_ref: String,
    #[serde(default)]
    pub header: EnvelopeHeader,
    pub message: serde_json::Value,
}

impl DecodedEnvelope {
    pub fn schema_matches(&self, prefix: &str) -> bool {
        self.schema_ref.starts_with(prefix)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvelopeHeader {
    #[serde(rename = "uploaderID", default)]
    pub uploader_id: String,
    #[serde(rename = "softwareName", default)]
    pub software_name: String,
    #[serde(rename = "softwareVersion", default)]
    pub software_version: String,
    #[serde(rename = "gatewayTimestamp", default)]
    pub gateway_timestamp: Option<String>,
}

// ============================================================================
// Decode Error
// ============================================================================

#[derive(Debug)]
pub enum DecodeError {
    Decompress(String),
    InvalidJson(String),
    UnrecognizedSchema(String),
}

impl DecodeError {
    /// Unrecognized schemas are expected traffic, not corruption; callers log
    /// them at a quieter level.
    pub fn is_unrecognized_schema(&self) -> bool {
        matches!(self, DecodeError::UnrecognizedSchema(_))
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Decompress(e) => write!(f, "Decompression failed: {}", e),
            DecodeError::InvalidJson(e) => write!(f, "Invalid JSON: {}", e),
            DecodeError::UnrecognizedSchema(s) => write!(f, "Unrecognized schema: {}", s),
        }
    }
}

impl std::error::Error for DecodeError {}

// ============================================================================
// FeedDecoder - Stateful decoder with stats
// ============================================================================

/// Decoder statistics
#[derive(Debug, Clone, Default)]
pub struct DecoderStats {
    pub envelopes_decoded: u64,
    pub decompress_failures: u64,
    pub parse_failures: u64,
    pub unrecognized_schemas: u64,
}

/// Turns raw feed buffers into [`DecodedEnvelope`]s: inflate, parse the outer
/// envelope, then check the schema reference against [`RECOGNIZED_SCHEMAS`].
pub struct FeedDecoder {
    pub stats: DecoderStats,
}

impl FeedDecoder {
    pub fn new() -> Self {
        Self {
            stats: DecoderStats::default(),
        }
    }

    /// Decode one raw buffer into an envelope.
    pub fn decode(&mut self, raw: &[u8]) -> Result<DecodedEnvelope, DecodeError> {
        let text = match inflate(raw) {
            Ok(text) => text,
            Err(e) => {
                self.stats.decompress_failures += 1;
                return Err(e);
            }
        };

        let envelope: DecodedEnvelope = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.stats.parse_failures += 1;
                return Err(DecodeError::InvalidJson(e.to_string()));
            }
        };

        if !schema_is_recognized(&envelope.schema_ref) {
            self.stats.unrecognized_schemas += 1;
            return Err(DecodeError::UnrecognizedSchema(envelope.schema_ref));
        }

        self.stats.envelopes_decoded += 1;
        Ok(envelope)
    }

    /// Reset all statistics
    pub fn reset_stats(&mut self) {
        self.stats = DecoderStats::default();
    }
}

impl Default for FeedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Standalone helpers
// ============================================================================

/// zlib-inflate a raw feed buffer into its JSON text.
fn inflate(raw: &[u8]) -> Result<String, DecodeError> {
    let mut decoder = ZlibDecoder::new(raw);
    let mut text = String::new();
    decoder
        .read_to_string(&mut text)
        .map_err(|e| DecodeError::Decompress(e.to_string()))?;
    Ok(text)
}

/// Check a schema reference against the recognized prefixes. Test-channel
/// schemas (suffix `/test`) are excluded even when the prefix matches.
pub fn schema_is_recognized(schema_ref: &str) -> bool {
    if schema_ref.ends_with("/test") {
        return false;
    }
    RECOGNIZED_SCHEMAS
        .iter()
        .any(|prefix| schema_ref.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn compress(text: &str) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    fn make_journal_envelope() -> Vec<u8> {
        compress(
            r#"{
                "$schemaRef": "https://eddn.edcd.io/schemas/journal/1",
                "header": {
                    "uploaderID": "CMDR Test",
                    "softwareName": "EDDiscovery",
                    "softwareVersion": "1.0",
                    "gatewayTimestamp": "2024-06-01T10:00:00.000000Z"
                },
                "message": {"event": "Scan", "timestamp": "2024-06-01T10:00:00Z"}
            }"#,
        )
    }

    #[test]
    fn test_decode_valid_envelope() {
        let mut decoder = FeedDecoder::new();
        let envelope = decoder.decode(&make_journal_envelope()).unwrap();

        assert_eq!(envelope.schema_ref, "https://eddn.edcd.io/schemas/journal/1");
        assert_eq!(envelope.header.uploader_id, "CMDR Test");
        assert_eq!(envelope.message["event"], "Scan");
        assert_eq!(decoder.stats.envelopes_decoded, 1);
    }

    #[test]
    fn test_decode_rejects_garbage_bytes() {
        let mut decoder = FeedDecoder::new();
        let result = decoder.decode(b"definitely not zlib");

        assert!(matches!(result, Err(DecodeError::Decompress(_))));
        assert_eq!(decoder.stats.decompress_failures, 1);
        assert_eq!(decoder.stats.envelopes_decoded, 0);
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        let mut decoder = FeedDecoder::new();
        let result = decoder.decode(&compress("still { not json"));

        assert!(matches!(result, Err(DecodeError::InvalidJson(_))));
        assert_eq!(decoder.stats.parse_failures, 1);
    }

    #[test]
    fn test_decode_requires_schema_ref_and_message() {
        let mut decoder = FeedDecoder::new();
        let result = decoder.decode(&compress(r#"{"header": {}}"#));

        assert!(matches!(result, Err(DecodeError::InvalidJson(_))));
    }

    #[test]
    fn test_decode_rejects_unrecognized_schema() {
        let mut decoder = FeedDecoder::new();
        let raw = compress(
            r#"{"$schemaRef": "https://eddn.edcd.io/schemas/commodity/3", "message": {}}"#,
        );
        let result = decoder.decode(&raw);

        match result {
            Err(ref e) => assert!(e.is_unrecognized_schema(), "got {:?}", result),
            Ok(_) => panic!("commodity schema should not decode"),
        }
        assert_eq!(decoder.stats.unrecognized_schemas, 1);
    }

    #[test]
    fn test_decode_rejects_test_channel_schema() {
        let mut decoder = FeedDecoder::new();
        let raw = compress(
            r#"{"$schemaRef": "https://eddn.edcd.io/schemas/journal/1/test", "message": {}}"#,
        );
        assert!(matches!(
            decoder.decode(&raw),
            Err(DecodeError::UnrecognizedSchema(_))
        ));
    }

    #[test]
    fn test_missing_header_defaults_to_empty() {
        let mut decoder = FeedDecoder::new();
        let raw = compress(
            r#"{"$schemaRef": "https://eddn.edcd.io/schemas/journal/1", "message": {"event": "Scan"}}"#,
        );
        let envelope = decoder.decode(&raw).unwrap();
        assert_eq!(envelope.header.uploader_id, "");
        assert!(envelope.header.gateway_timestamp.is_none());
    }

    #[test]
    fn test_schema_prefix_matching() {
        assert!(schema_is_recognized(
            "https://eddn.edcd.io/schemas/fssdiscoveryscan/1"
        ));
        assert!(schema_is_recognized(
            "https://eddn.edcd.io/schemas/fssallbodiesfound/1"
        ));
        assert!(!schema_is_recognized("https://eddn.edcd.io/schemas/shipyard/2"));
        assert!(!schema_is_recognized(
            "https://eddn.edcd.io/schemas/fssdiscoveryscan/1/test"
        ));
    }
}
