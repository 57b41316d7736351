// EDDN Relay - process entry point
// Bootstrap order: config, logging, store, fanout wiring, feed, HTTP server

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use eddn_relay::core::{get_event_bus, setup_logging, RelayConfig};
use eddn_relay::fanout::{register_fanout, SubscriberHub};
use eddn_relay::feed::EddnConnector;
use eddn_relay::server::{build_router, AppState};
use eddn_relay::store::PlanetScanStore;

#[tokio::main]
async fn main() {
    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    setup_logging(Some(&config.logging.level), Some(config.logging.json));

    if let Err(e) = config.validate() {
        error!(error = %e, "Configuration rejected");
        std::process::exit(1);
    }

    info!(config = %config.summary(), "Starting EDDN relay");

    let store = match PlanetScanStore::open(&config.store.db_path) {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, db_path = %config.store.db_path, "Failed to open planet scan store");
            std::process::exit(1);
        }
    };

    // Fanout handlers must be on the bus before the feed publishes anything.
    let bus = get_event_bus();
    let hub = SubscriberHub::new();
    register_fanout(&bus, &hub, &store);

    let connector = Arc::new(EddnConnector::new(
        config.feed.clone(),
        bus,
        Arc::new(store.clone()),
    ));
    if let Err(e) = connector.start().await {
        error!(error = %e, endpoint = %config.feed.endpoint, "Failed to subscribe to feed");
        std::process::exit(1);
    }
    spawn_stats_logger(connector.clone());

    let state = AppState { store, hub };
    let router = match build_router(state, &config.http) {
        Ok(router) => router,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP router");
            std::process::exit(1);
        }
    };

    let addr = format!("0.0.0.0:{}", config.http.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            std::process::exit(1);
        }
    };
    info!(addr = %addr, "HTTP server listening");

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "HTTP server error");
        std::process::exit(1);
    }

    info!("EDDN relay stopped");
}

/// Log feed statistics once a minute.
fn spawn_stats_logger(connector: Arc<EddnConnector>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        // The first tick fires immediately; skip it.
        interval.tick().await;
        loop {
            interval.tick().await;
            info!(
                stats = %connector.get_stats(),
                status = %connector.status(),
                "Feed status"
            );
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}
