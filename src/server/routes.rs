// HTTP Server - liveness, daily summary query, and the SSE event stream
// Read-only surface over the same store and hub the pipeline writes

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::convert::Infallible;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::core::HttpConfig;
use crate::fanout::{SubscriberHub, SUMMARY_CHANNEL};
use crate::store::{DailyDiscoverySummary, PlanetScanStore};

/// State shared by all routes. Cheap to clone; both members are handles.
#[derive(Clone)]
pub struct AppState {
    pub store: PlanetScanStore,
    pub hub: SubscriberHub,
}

/// Build the router with CORS locked to the configured origin.
pub fn build_router(
    state: AppState,
    config: &HttpConfig,
) -> Result<Router, Box<dyn std::error::Error + Send + Sync>> {
    let origin: HeaderValue = config.cors_origin.parse()?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET]);

    Ok(Router::new()
        .route("/health", get(health))
        .route("/api/discoveries/today", get(discoveries_today))
        .route("/api/events/stream", get(event_stream))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

async fn health() -> &'static str {
    "ok"
}

/// Current-day summary, derived from the store on every request.
async fn discoveries_today(
    State(state): State<AppState>,
) -> Result<Json<DailyDiscoverySummary>, StatusCode> {
    match state.store.newly_discovered_by_simplified_planet_class_today() {
        Ok(summary) => Ok(Json(summary)),
        Err(e) => {
            error!(error = %e, "Failed to read daily summary");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// SSE bridge over the subscriber hub. The stream opens with the current
/// daily summary, then carries each broadcast as one SSE event named by its
/// channel; a receiver that lags past the pipe capacity has the lost events
/// logged and skipped rather than ending the stream.
async fn event_stream(State(state): State<AppState>) -> impl IntoResponse {
    // Opening frame: today's summary as of connect. Snapshot before
    // subscribing, so the frame never includes a discovery whose raw event
    // is still queued behind it on the live pipe.
    let opening = match state.store.newly_discovered_by_simplified_planet_class_today() {
        Ok(summary) => Some(Ok::<_, Infallible>(
            Event::default()
                .event(SUMMARY_CHANNEL)
                .data(json!(summary).to_string()),
        )),
        Err(e) => {
            error!(error = %e, "Failed to load opening summary for subscriber");
            None
        }
    };

    let rx = state.hub.subscribe();
    info!(
        subscribers = state.hub.subscriber_count(),
        "Event stream subscriber connected"
    );

    let live = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(outbound) => Some(Ok::<_, Infallible>(
                Event::default()
                    .event(outbound.channel.as_str())
                    .data(outbound.payload.to_string()),
            )),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped = skipped, "Event stream subscriber lagged, dropping events");
                None
            }
        }
    });

    Sse::new(stream::iter(opening).chain(live)).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlanetScanRecord;
    use axum::body::BodyDataStream;
    use std::time::Duration;
    use tokio::time::timeout;

    fn make_state() -> AppState {
        AppState {
            store: PlanetScanStore::open(":memory:").unwrap(),
            hub: SubscriberHub::new(),
        }
    }

    async fn next_frame(frames: &mut BodyDataStream) -> String {
        let chunk = timeout(Duration::from_secs(5), frames.next())
            .await
            .expect("timed out waiting for an SSE frame")
            .expect("SSE stream ended")
            .expect("SSE body error");
        String::from_utf8(chunk.to_vec()).expect("SSE frame is not utf8")
    }

    fn make_record(body_id: i64, class: &str) -> PlanetScanRecord {
        PlanetScanRecord::new(
            42,
            body_id,
            class.to_string(),
            "2024-06-01T10:00:00Z".parse().unwrap(),
        )
    }

    #[tokio::test]
    async fn test_health_returns_ok() {
        assert_eq!(health().await, "ok");
    }

    #[tokio::test]
    async fn test_discoveries_today_reflects_store() {
        let state = make_state();
        state.store.insert(&make_record(1, "Icy body")).unwrap();
        state.store.insert(&make_record(2, "Icy body")).unwrap();
        state.store.insert(&make_record(3, "Gas giant")).unwrap();

        let Json(summary) = discoveries_today(State(state)).await.unwrap();
        assert_eq!(summary.count_for("Icy body"), 2);
        assert_eq!(summary.count_for("Gas giant"), 1);
    }

    #[tokio::test]
    async fn test_discoveries_today_empty_store() {
        let Json(summary) = discoveries_today(State(make_state())).await.unwrap();
        assert!(summary.is_empty());
    }

    #[tokio::test]
    async fn test_event_stream_opens_with_summary_then_carries_broadcasts() {
        let state = make_state();
        state.store.insert(&make_record(1, "Icy body")).unwrap();

        let response = event_stream(State(state.clone())).await.into_response();
        let mut frames = response.into_body().into_data_stream();

        // The opening frame reflects the store as of connect, before
        // anything from the live pipe.
        let opening = next_frame(&mut frames).await;
        assert!(opening.contains(&format!("event: {}", SUMMARY_CHANNEL)));
        assert!(opening.contains(r#"{"Icy body":1}"#));

        state.hub.broadcast("PlanetScanNewlyDiscovered", json!({"bodyId": 2}));
        state.hub.broadcast(SUMMARY_CHANNEL, json!({"Icy body": 2}));

        let raw = next_frame(&mut frames).await;
        assert!(raw.contains("event: PlanetScanNewlyDiscovered"));
        assert!(raw.contains(r#""bodyId":2"#));

        let summary = next_frame(&mut frames).await;
        assert!(summary.contains(&format!("event: {}", SUMMARY_CHANNEL)));
        assert!(summary.contains(r#"{"Icy body":2}"#));
    }

    #[test]
    fn test_build_router_accepts_configured_origin() {
        let config = HttpConfig::default();
        assert!(build_router(make_state(), &config).is_ok());
    }

    #[test]
    fn test_build_router_rejects_malformed_origin() {
        let config = HttpConfig {
            cors_origin: "bad\norigin".to_string(),
            ..HttpConfig::default()
        };
        assert!(build_router(make_state(), &config).is_err());
    }
}
