//! MQTT subscriber for bus event ingestion.

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

/// Configuration for the hub subscriber.
#[derive(Debug, Clone)]
pub struct HubSubscriberConfig {
    /// MQTT broker URL (e.g. <tcp://localhost:1883>)
    pub mqtt_broker: String,
    /// Client ID for the MQTT connection
    pub client_id: String,
    /// Topic filter carrying device events
    pub topic: String,
    /// Keep-alive interval
    pub keep_alive: Duration,
}

impl Default for HubSubscriberConfig {
    fn default() -> Self {
        Self {
            mqtt_broker: "tcp://localhost:1883".to_string(),
            client_id: "twin-relay-hub".to_string(),
            topic: "devices/+/messages/events".to_string(),
            keep_alive: Duration::from_secs(30),
        }
    }
}

/// One raw event delivered by the bus.
#[derive(Debug, Clone)]
pub struct BusEvent {
    /// Topic the event was published on.
    pub topic: String,
    /// Raw event body; a hub envelope in JSON.
    pub payload: Vec<u8>,
}

/// MQTT subscriber for bus-pushed device events.
pub struct HubSubscriber {
    client: AsyncClient,
    eventloop: EventLoop,
    config: HubSubscriberConfig,
}

impl HubSubscriber {
    /// Create a new hub subscriber.
    ///
    /// # Errors
    ///
    /// Returns error if the broker URL cannot be parsed.
    pub fn new(config: HubSubscriberConfig) -> Result<Self, SubscriberError> {
        let (host, port) = parse_mqtt_url(&config.mqtt_broker)?;

        let mut mqtt_options = MqttOptions::new(&config.client_id, host, port);
        mqtt_options.set_keep_alive(config.keep_alive);

        let (client, eventloop) = AsyncClient::new(mqtt_options, 100);

        Ok(Self {
            client,
            eventloop,
            config,
        })
    }

    /// Subscribe to the device event topic.
    ///
    /// # Errors
    ///
    /// Returns error if the subscription request fails.
    pub async fn subscribe(&self) -> Result<(), SubscriberError> {
        tracing::info!(topic = %self.config.topic, "Subscribing to bus events");

        self.client
            .subscribe(&self.config.topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| SubscriberError::Subscribe(e.to_string()))?;

        Ok(())
    }

    /// Start receiving events.
    ///
    /// Returns a channel receiver of raw bus events. The subscriber keeps
    /// polling in a background task and retries after transport errors.
    pub fn start(mut self) -> mpsc::Receiver<BusEvent> {
        let (tx, rx) = mpsc::channel(100);

        tokio::spawn(async move {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let event = BusEvent {
                            topic: publish.topic.clone(),
                            payload: publish.payload.to_vec(),
                        };

                        tracing::debug!(
                            topic = %event.topic,
                            payload_len = event.payload.len(),
                            "Received bus event"
                        );

                        if tx.send(event).await.is_err() {
                            tracing::warn!("Event receiver dropped, stopping subscriber");
                            break;
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        tracing::info!("Connected to MQTT broker");
                    }
                    Ok(Event::Incoming(Packet::SubAck(_))) => {
                        tracing::info!("Subscription acknowledged");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "MQTT error");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        rx
    }
}

/// Parse MQTT URL into host and port.
fn parse_mqtt_url(input: &str) -> Result<(String, u16), SubscriberError> {
    if input.contains("://") {
        let url =
            Url::parse(input).map_err(|e| SubscriberError::InvalidUrl(format!("{input}: {e}")))?;

        match url.scheme() {
            "tcp" | "mqtt" => {}
            scheme => {
                return Err(SubscriberError::InvalidUrl(format!(
                    "{input}: unsupported scheme '{scheme}'"
                )));
            }
        }

        let host = url
            .host_str()
            .ok_or_else(|| SubscriberError::InvalidUrl(format!("{input}: missing host")))?;
        let port = url.port().unwrap_or(1883);

        return Ok((host.to_string(), port));
    }

    let mut parts = input.split(':');
    let host = parts
        .next()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| SubscriberError::InvalidUrl(format!("{input}: missing host")))?;
    let port = match parts.next() {
        None => 1883,
        Some(port) => port
            .parse()
            .map_err(|_| SubscriberError::InvalidUrl(format!("{input}: invalid port '{port}'")))?,
    };
    if parts.next().is_some() {
        return Err(SubscriberError::InvalidUrl(format!(
            "{input}: too many ':' separators"
        )));
    }

    Ok((host.to_string(), port))
}

/// Errors that can occur with the subscriber.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubscriberError {
    /// Invalid MQTT URL
    #[error("invalid MQTT URL: {0}")]
    InvalidUrl(String),
    /// Subscription request failed
    #[error("subscribe failed: {0}")]
    Subscribe(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_with_scheme_parses() {
        assert_eq!(
            parse_mqtt_url("tcp://broker.local:1884").unwrap(),
            ("broker.local".to_string(), 1884)
        );
        assert_eq!(
            parse_mqtt_url("mqtt://broker.local").unwrap(),
            ("broker.local".to_string(), 1883)
        );
    }

    #[test]
    fn bare_host_port_parses() {
        assert_eq!(
            parse_mqtt_url("localhost:1883").unwrap(),
            ("localhost".to_string(), 1883)
        );
        assert_eq!(
            parse_mqtt_url("localhost").unwrap(),
            ("localhost".to_string(), 1883)
        );
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        assert!(parse_mqtt_url("http://broker.local").is_err());
    }

    #[test]
    fn malformed_urls_are_rejected() {
        assert!(parse_mqtt_url("").is_err());
        assert!(parse_mqtt_url("host:notaport").is_err());
        assert!(parse_mqtt_url("a:1:2").is_err());
    }
}
