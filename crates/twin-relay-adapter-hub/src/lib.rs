//! # Hub Adapter
//!
//! MQTT ingestion of device-to-cloud events pushed by the IoT message bus.
//!
//! The bus re-publishes each device event as one MQTT message whose payload
//! is the hub envelope JSON (`systemProperties` wrapper plus `body`). The
//! adapter subscribes to the event topic and hands raw payloads to the
//! relay over a channel; it never interprets them.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod subscriber;

pub use subscriber::{BusEvent, HubSubscriber, HubSubscriberConfig, SubscriberError};
