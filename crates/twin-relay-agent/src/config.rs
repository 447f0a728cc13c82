//! Agent configuration.

use anyhow::{bail, Result};

/// Which twin-store backend the agent talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// The real twin-store REST API.
    Adt,
    /// In-process store, for local runs without a service.
    Memory,
}

impl StoreKind {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "adt" => Some(Self::Adt),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Twin-store service endpoint URL. Required for the `adt` backend;
    /// absence is logged at startup but does not abort processing.
    pub twin_service_url: Option<String>,

    /// Bearer token attached to store calls, if any.
    pub bearer_token: Option<String>,

    /// Store backend: "adt" or "memory".
    pub store: StoreKind,

    /// HTTP ingest listen address.
    pub http_addr: String,

    /// MQTT broker URL; bus ingest is enabled only when set.
    pub mqtt_broker: Option<String>,

    /// MQTT topic filter carrying device events.
    pub mqtt_topic: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            twin_service_url: None,
            bearer_token: None,
            store: StoreKind::Adt,
            http_addr: "0.0.0.0:7071".to_string(),
            mqtt_broker: None,
            mqtt_topic: "devices/+/messages/events".to_string(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TWIN_RELAY_TWIN_SERVICE_URL`: Twin-store endpoint URL
    /// - `TWIN_RELAY_BEARER_TOKEN`: Bearer token for store calls
    /// - `TWIN_RELAY_STORE`: "adt" (default) or "memory"
    /// - `TWIN_RELAY_HTTP_ADDR`: HTTP listen address
    /// - `TWIN_RELAY_MQTT_BROKER`: MQTT broker URL (enables bus ingest)
    /// - `TWIN_RELAY_MQTT_TOPIC`: MQTT topic filter for device events
    ///
    /// # Errors
    ///
    /// Returns error if a variable holds an unparseable value.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("TWIN_RELAY_TWIN_SERVICE_URL") {
            config.twin_service_url = Some(url);
        }

        if let Ok(token) = std::env::var("TWIN_RELAY_BEARER_TOKEN") {
            config.bearer_token = Some(token);
        }

        if let Ok(store) = std::env::var("TWIN_RELAY_STORE") {
            match StoreKind::parse(&store) {
                Some(kind) => config.store = kind,
                None => bail!("Invalid TWIN_RELAY_STORE '{store}' (expected adt or memory)"),
            }
        }

        if let Ok(addr) = std::env::var("TWIN_RELAY_HTTP_ADDR") {
            config.http_addr = addr;
        }

        if let Ok(broker) = std::env::var("TWIN_RELAY_MQTT_BROKER") {
            config.mqtt_broker = Some(broker);
        }

        if let Ok(topic) = std::env::var("TWIN_RELAY_MQTT_TOPIC") {
            config.mqtt_topic = topic;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_kind_parses() {
        assert_eq!(StoreKind::parse("adt"), Some(StoreKind::Adt));
        assert_eq!(StoreKind::parse("memory"), Some(StoreKind::Memory));
        assert_eq!(StoreKind::parse("sqlite"), None);
    }

    #[test]
    fn defaults_are_sane() {
        let config = RelayConfig::default();
        assert_eq!(config.store, StoreKind::Adt);
        assert!(config.twin_service_url.is_none());
        assert!(config.mqtt_broker.is_none());
        assert_eq!(config.http_addr, "0.0.0.0:7071");
    }
}
