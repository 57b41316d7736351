// Structured Logging for EDDN Relay
// tracing-based setup, JSON by default to match the rest of the deployment

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Setup structured logging for the entire application
pub fn setup_logging(log_level: Option<&str>, json_format: Option<bool>) {
    let log_level_str = log_level.unwrap_or("DEBUG");
    let json_format = json_format.unwrap_or(true);

    // Parse log level
    let level = match log_level_str.to_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "INFO" => Level::INFO,
        "WARN" | "WARNING" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => Level::DEBUG,
    };

    INIT.call_once(|| {
        // Suppress noisy libraries; the feed socket alone would otherwise
        // produce a trace line per frame.
        let filter = EnvFilter::from_default_env()
            .add_directive(level.into())
            .add_directive("zeromq=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("tower_http=warn".parse().unwrap())
            .add_directive("axum=warn".parse().unwrap());

        if json_format {
            tracing_subscriber::fmt()
                .json()
                .with_target(true)
                .with_env_filter(filter)
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_target(true)
                .with_env_filter(filter)
                .init();
        }

        tracing::info!(log_level = %log_level_str, json = json_format, "Logging initialized");
    });
}
