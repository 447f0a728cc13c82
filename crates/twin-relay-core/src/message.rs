//! Device message model and payload parsing.
//!
//! Inbound events arrive in three wire shapes: a telemetry-object shape
//! (IoT Central continuous export over HTTP), a properties-array shape
//! (legacy HTTP trigger), and a hub envelope (bus push wrapping the payload
//! in `systemProperties`/`body`). The trigger source decides which parser
//! applies. Field names are part of the wire contract with upstream
//! producers and must be preserved exactly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Envelope key holding the originating device id.
pub const ENVELOPE_DEVICE_ID_KEY: &str = "iothub-connection-device-id";

/// Body field naming the device type in hub envelopes.
pub const ENVELOPE_DEVICE_TYPE_FIELD: &str = "DeviceType";

/// Which wire shape a message was parsed from.
///
/// Translation dispatches on this tag: the telemetry-object shape fans out
/// generically, the other two are rule-driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageShape {
    /// Arbitrary key/value pairs under a `telemetry` field.
    TelemetryObject,
    /// Boolean reports under an indexed `properties` array.
    PropertiesArray,
    /// Bus envelope with a nested device id and a `body` object.
    HubEnvelope,
}

/// One entry of the properties-array shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyReport {
    /// Property name as reported by the device.
    pub name: String,
    /// Reported boolean state.
    pub value: bool,
}

/// Enrichment attached by the upstream application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    /// Enrichment name.
    pub name: String,
    /// Enrichment value.
    pub value: bool,
}

/// A parsed inbound device message, independent of wire shape.
#[derive(Debug, Clone)]
pub struct DeviceMessage {
    /// Device identifier; keys the target twin. Always non-empty.
    pub device_id: String,
    /// Device-type tag selecting a translation rule, when present.
    pub device_type: Option<String>,
    /// Telemetry (or envelope body) fields, in wire order.
    pub telemetry: Map<String, Value>,
    /// Property reports from the properties-array shape.
    pub properties: Vec<PropertyReport>,
    /// Optional enrichment; carried through, never acted on.
    pub enrichments: Option<Enrichment>,
    /// Shape the message was parsed from.
    pub shape: MessageShape,
    /// Upstream application id, if the producer sent one.
    pub application_id: Option<String>,
    /// Producer-side enqueue timestamp.
    pub enqueued_time: Option<DateTime<Utc>>,
}

/// Errors produced while parsing an inbound event body.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    /// The body is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(String),
    /// The message carries no device id (or an empty one).
    #[error("message has no device id")]
    MissingDeviceId,
    /// A hub envelope has no `body` object.
    #[error("envelope has no body object")]
    MissingBody,
}

#[derive(Deserialize)]
struct TelemetryWire {
    #[serde(rename = "deviceId")]
    device_id: Option<String>,
    #[serde(default)]
    telemetry: Map<String, Value>,
    enrichments: Option<Enrichment>,
    #[serde(rename = "applicationId")]
    application_id: Option<String>,
    #[serde(rename = "enqueuedTime")]
    enqueued_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct PropertiesWire {
    #[serde(rename = "deviceId")]
    device_id: Option<String>,
    #[serde(rename = "deviceType")]
    device_type: Option<String>,
    #[serde(default)]
    properties: Vec<PropertyReport>,
    enrichments: Option<Enrichment>,
    #[serde(rename = "applicationId")]
    application_id: Option<String>,
    #[serde(rename = "enqueuedTime")]
    enqueued_time: Option<DateTime<Utc>>,
}

impl DeviceMessage {
    /// Parse the telemetry-object shape: `deviceId` plus a generic
    /// key/value `telemetry` object. Unknown fields are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the body is not valid JSON or `deviceId`
    /// is absent or empty.
    pub fn from_telemetry_json(raw: &[u8]) -> Result<Self, ParseError> {
        let wire: TelemetryWire =
            serde_json::from_slice(raw).map_err(|e| ParseError::Json(e.to_string()))?;
        let device_id = require_device_id(wire.device_id)?;

        Ok(Self {
            device_id,
            device_type: None,
            telemetry: wire.telemetry,
            properties: Vec::new(),
            enrichments: wire.enrichments,
            shape: MessageShape::TelemetryObject,
            application_id: wire.application_id,
            enqueued_time: wire.enqueued_time,
        })
    }

    /// Parse the properties-array shape: `deviceId` plus an indexed
    /// `properties` array of boolean reports.
    ///
    /// Messages of this shape that name no `deviceType` fall into the
    /// `"test"` rule, matching the legacy trigger's fixed branch.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the body is not valid JSON or `deviceId`
    /// is absent or empty.
    pub fn from_properties_json(raw: &[u8]) -> Result<Self, ParseError> {
        let wire: PropertiesWire =
            serde_json::from_slice(raw).map_err(|e| ParseError::Json(e.to_string()))?;
        let device_id = require_device_id(wire.device_id)?;
        let device_type = wire.device_type.or_else(|| Some("test".to_string()));

        Ok(Self {
            device_id,
            device_type,
            telemetry: Map::new(),
            properties: wire.properties,
            enrichments: wire.enrichments,
            shape: MessageShape::PropertiesArray,
            application_id: wire.application_id,
            enqueued_time: wire.enqueued_time,
        })
    }

    /// Parse a hub envelope: device id under
    /// `systemProperties["iothub-connection-device-id"]`, device type and
    /// telemetry fields under `body`.
    ///
    /// The whole `body` object becomes the telemetry mapping, in wire
    /// order; rule-driven translation reads the fields it needs by name.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the body is not valid JSON, the envelope
    /// device id is absent or empty, or there is no `body` object.
    pub fn from_hub_envelope(raw: &[u8]) -> Result<Self, ParseError> {
        let root: Value =
            serde_json::from_slice(raw).map_err(|e| ParseError::Json(e.to_string()))?;

        let device_id = root
            .get("systemProperties")
            .and_then(|sp| sp.get(ENVELOPE_DEVICE_ID_KEY))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or(ParseError::MissingDeviceId)?
            .to_string();

        let body = root
            .get("body")
            .and_then(Value::as_object)
            .ok_or(ParseError::MissingBody)?;

        let device_type = body
            .get(ENVELOPE_DEVICE_TYPE_FIELD)
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            device_id,
            device_type,
            telemetry: body.clone(),
            properties: Vec::new(),
            enrichments: None,
            shape: MessageShape::HubEnvelope,
            application_id: None,
            enqueued_time: None,
        })
    }
}

fn require_device_id(device_id: Option<String>) -> Result<String, ParseError> {
    match device_id {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(ParseError::MissingDeviceId),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telemetry_shape_parses() {
        let raw = br#"{"deviceId":"Sensor1","telemetry":{"temp":42.5,"humidity":10}}"#;
        let msg = DeviceMessage::from_telemetry_json(raw).unwrap();

        assert_eq!(msg.device_id, "Sensor1");
        assert_eq!(msg.shape, MessageShape::TelemetryObject);
        assert!(msg.device_type.is_none());
        let keys: Vec<&str> = msg.telemetry.keys().map(String::as_str).collect();
        assert_eq!(keys, ["temp", "humidity"]);
    }

    #[test]
    fn telemetry_keys_keep_wire_order() {
        let raw = br#"{"deviceId":"d","telemetry":{"z":1,"a":2,"m":3}}"#;
        let msg = DeviceMessage::from_telemetry_json(raw).unwrap();
        let keys: Vec<&str> = msg.telemetry.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn telemetry_unknown_fields_ignored() {
        let raw = br#"{"deviceId":"d","schema":"default@v1","templateId":"t","telemetry":{}}"#;
        assert!(DeviceMessage::from_telemetry_json(raw).is_ok());
    }

    #[test]
    fn empty_body_is_parse_error() {
        let err = DeviceMessage::from_telemetry_json(b"").unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn non_json_body_is_parse_error() {
        let err = DeviceMessage::from_telemetry_json(b"not json at all").unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn missing_device_id_is_parse_error() {
        let err = DeviceMessage::from_telemetry_json(br#"{"telemetry":{"x":1}}"#).unwrap_err();
        assert!(matches!(err, ParseError::MissingDeviceId));
    }

    #[test]
    fn empty_device_id_is_parse_error() {
        let err =
            DeviceMessage::from_telemetry_json(br#"{"deviceId":"","telemetry":{}}"#).unwrap_err();
        assert!(matches!(err, ParseError::MissingDeviceId));
    }

    #[test]
    fn properties_shape_defaults_to_test_rule() {
        let raw = br#"{"deviceId":"Motor1","properties":[{"name":"MotorStatus","value":true}]}"#;
        let msg = DeviceMessage::from_properties_json(raw).unwrap();

        assert_eq!(msg.shape, MessageShape::PropertiesArray);
        assert_eq!(msg.device_type.as_deref(), Some("test"));
        assert_eq!(msg.properties.len(), 1);
        assert!(msg.properties[0].value);
    }

    #[test]
    fn properties_shape_honors_explicit_device_type() {
        let raw = br#"{"deviceId":"Motor1","deviceType":"Other","properties":[]}"#;
        let msg = DeviceMessage::from_properties_json(raw).unwrap();
        assert_eq!(msg.device_type.as_deref(), Some("Other"));
    }

    #[test]
    fn hub_envelope_parses() {
        let raw = br#"{
            "systemProperties": {"iothub-connection-device-id": "DevA"},
            "body": {"DeviceType": "MouldingSensor", "ChasisTemperature": 88.2, "PowerUsage": 5.1}
        }"#;
        let msg = DeviceMessage::from_hub_envelope(raw).unwrap();

        assert_eq!(msg.device_id, "DevA");
        assert_eq!(msg.shape, MessageShape::HubEnvelope);
        assert_eq!(msg.device_type.as_deref(), Some("MouldingSensor"));
        assert_eq!(msg.telemetry["ChasisTemperature"], 88.2);
    }

    #[test]
    fn hub_envelope_without_device_id_is_parse_error() {
        let raw = br#"{"systemProperties": {}, "body": {"x": 1}}"#;
        let err = DeviceMessage::from_hub_envelope(raw).unwrap_err();
        assert!(matches!(err, ParseError::MissingDeviceId));
    }

    #[test]
    fn hub_envelope_without_body_is_parse_error() {
        let raw = br#"{"systemProperties": {"iothub-connection-device-id": "DevA"}}"#;
        let err = DeviceMessage::from_hub_envelope(raw).unwrap_err();
        assert!(matches!(err, ParseError::MissingBody));
    }

    #[test]
    fn enqueued_time_is_carried() {
        let raw = br#"{"deviceId":"d","enqueuedTime":"2024-05-01T12:00:00Z","telemetry":{}}"#;
        let msg = DeviceMessage::from_telemetry_json(raw).unwrap();
        assert!(msg.enqueued_time.is_some());
    }
}
