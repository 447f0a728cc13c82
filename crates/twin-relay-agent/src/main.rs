//! # Twin Relay Agent
//!
//! Relays telemetry events from an IoT message bus or HTTP callers into a
//! digital-twin graph store.
//!
//! ## Architecture
//!
//! Two ingest paths feed one handler:
//! 1. **HTTP**: `POST /ingest/telemetry` and `POST /ingest/properties`
//! 2. **Bus**: MQTT-pushed hub envelopes
//!
//! Each event runs parse → translate → patch independently; the handler
//! never fails the trigger, and the store client is shared read-only
//! across in-flight invocations.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use twin_relay_adapter_adt::{AdtClient, AdtClientConfig, MemoryTwinStore, TwinStore};
use twin_relay_adapter_hub::{HubSubscriber, HubSubscriberConfig};
use twin_relay_core::RuleSet;
use uuid::Uuid;

mod config;
mod handler;
mod http;

pub use config::{RelayConfig, StoreKind};
pub use handler::{Relay, RelayOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting twin-relay agent"
    );

    let config = RelayConfig::from_env()?;

    let store: Arc<dyn TwinStore> = match config.store {
        StoreKind::Memory => Arc::new(MemoryTwinStore::new()),
        StoreKind::Adt => {
            // A missing endpoint does not abort: the relay keeps answering
            // triggers and the store calls fail (and are logged) instead.
            let endpoint = match &config.twin_service_url {
                Some(url) => url.clone(),
                None => {
                    tracing::error!("Application setting TWIN_RELAY_TWIN_SERVICE_URL not set");
                    String::new()
                }
            };

            let mut client_config = AdtClientConfig::for_endpoint(endpoint);
            client_config.bearer_token = config.bearer_token.clone();

            let client =
                AdtClient::new(client_config).context("Failed to create twin-store client")?;
            tracing::info!("Twin-store client created");
            Arc::new(client)
        }
    };

    let relay = Arc::new(Relay::new(store, RuleSet::standard()));

    if let Some(broker) = config.mqtt_broker.clone() {
        let subscriber = HubSubscriber::new(HubSubscriberConfig {
            mqtt_broker: broker,
            client_id: format!("twin-relay-{}", Uuid::new_v4()),
            topic: config.mqtt_topic.clone(),
            ..HubSubscriberConfig::default()
        })
        .context("Failed to create hub subscriber")?;

        subscriber
            .subscribe()
            .await
            .context("Failed to subscribe to bus events")?;

        let mut events = subscriber.start();
        let bus_relay = Arc::clone(&relay);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let outcome = bus_relay.handle_envelope(&event.payload).await;
                tracing::info!(topic = %event.topic, ?outcome, "Bus event handled");
            }
        });
    }

    let app = http::build_router(Arc::clone(&relay));
    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.http_addr))?;
    tracing::info!(addr = %config.http_addr, "HTTP ingest listening");
    axum::serve(listener, app).await?;

    Ok(())
}
