//! HTTP ingest endpoints.
//!
//! The wire contract is fixed: every ingest request is answered `200 OK`
//! with the literal body `responseMessage`, whatever happened inside.
//! Upstream producers key on that response, so it must not change;
//! outcomes go to the logs instead.

use crate::handler::Relay;
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

const RESPONSE_BODY: &str = "responseMessage";

/// Build the ingest router.
pub fn build_router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ingest/telemetry", post(ingest_telemetry))
        .route("/ingest/properties", post(ingest_properties))
        .with_state(relay)
}

async fn health() -> &'static str {
    "ok"
}

async fn ingest_telemetry(State(relay): State<Arc<Relay>>, body: Bytes) -> &'static str {
    let outcome = relay.handle_telemetry(&body).await;
    tracing::info!(?outcome, "Telemetry ingest handled");
    RESPONSE_BODY
}

async fn ingest_properties(State(relay): State<Arc<Relay>>, body: Bytes) -> &'static str {
    let outcome = relay.handle_properties(&body).await;
    tracing::info!(?outcome, "Properties ingest handled");
    RESPONSE_BODY
}
