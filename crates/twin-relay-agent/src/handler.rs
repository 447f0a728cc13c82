//! The relay entry handler.
//!
//! One invocation per inbound event: parse, translate, apply, log. The
//! trigger contract is "never fail": whatever happens inside stays inside,
//! caught and logged, and the caller sees a fixed success response. The
//! internal [`RelayOutcome`] records what actually happened so tests and
//! monitoring are not blind.

use std::sync::Arc;
use twin_relay_adapter_adt::TwinStore;
use twin_relay_core::{translate, DeviceMessage, ParseError, RuleSet, Translation, TwinPatch};

/// Internal outcome of handling one event.
///
/// Not surfaced on the wire; the HTTP response stays a fixed 200.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayOutcome {
    /// Patches applied to the store.
    Applied {
        /// Number of twins patched.
        twins: usize,
        /// Total operations applied.
        ops: usize,
    },
    /// Translation succeeded but produced no operations.
    NothingToApply,
    /// The device type has no translation rule; event dropped.
    UnknownDeviceType(String),
    /// The event body did not parse.
    ParseFailed(String),
    /// A rule input field was missing or unconvertible.
    TranslateFailed(String),
    /// A store call failed; later patches of the same event were skipped.
    StoreFailed(String),
}

/// Shared relay state: the store handle and the rule table, both read-only
/// across concurrent invocations.
pub struct Relay {
    store: Arc<dyn TwinStore>,
    rules: RuleSet,
}

impl Relay {
    /// Build a relay around a store handle and a rule table.
    pub fn new(store: Arc<dyn TwinStore>, rules: RuleSet) -> Self {
        Self { store, rules }
    }

    /// Handle one telemetry-object event (HTTP trigger).
    pub async fn handle_telemetry(&self, raw: &[u8]) -> RelayOutcome {
        tracing::info!(body_len = raw.len(), "Telemetry request received");

        let msg = match DeviceMessage::from_telemetry_json(raw) {
            Ok(msg) => msg,
            Err(err) => return parse_failed(&err),
        };

        self.log_twin(&msg.device_id).await;
        self.run(&msg).await
    }

    /// Handle one properties-array event (legacy HTTP trigger).
    pub async fn handle_properties(&self, raw: &[u8]) -> RelayOutcome {
        tracing::info!(body_len = raw.len(), "Properties request received");

        let msg = match DeviceMessage::from_properties_json(raw) {
            Ok(msg) => msg,
            Err(err) => return parse_failed(&err),
        };

        self.run(&msg).await
    }

    /// Handle one bus-pushed hub envelope.
    pub async fn handle_envelope(&self, raw: &[u8]) -> RelayOutcome {
        tracing::info!(body_len = raw.len(), "Bus envelope received");

        let msg = match DeviceMessage::from_hub_envelope(raw) {
            Ok(msg) => msg,
            Err(err) => return parse_failed(&err),
        };

        self.run(&msg).await
    }

    /// Fetch and log the current twin before patching. Purely
    /// informational; failures are logged and ignored.
    async fn log_twin(&self, twin_id: &str) {
        match self.store.get_twin(twin_id).await {
            Ok(twin) => tracing::debug!(twin_id, %twin, "Current twin state"),
            Err(err) => {
                tracing::debug!(twin_id, error = %err, "Could not fetch twin before patching");
            }
        }
    }

    async fn run(&self, msg: &DeviceMessage) -> RelayOutcome {
        let translation = match translate(msg, &self.rules) {
            Ok(translation) => translation,
            Err(err) => {
                tracing::warn!(device_id = %msg.device_id, error = %err, "Translation failed");
                return RelayOutcome::TranslateFailed(err.to_string());
            }
        };

        let patches = match translation {
            Translation::Patches(patches) => patches,
            Translation::UnknownDeviceType => {
                let device_type = msg.device_type.clone().unwrap_or_default();
                tracing::info!(
                    device_id = %msg.device_id,
                    device_type,
                    "No rule for device type, dropping event"
                );
                return RelayOutcome::UnknownDeviceType(device_type);
            }
        };

        self.apply(patches).await
    }

    async fn apply(&self, patches: Vec<TwinPatch>) -> RelayOutcome {
        let mut twins = 0;
        let mut ops = 0;

        for patch in &patches {
            if patch.ops.is_empty() {
                tracing::debug!(twin_id = %patch.twin_id, "No operations for twin, skipping call");
                continue;
            }

            if let Err(err) = self.store.apply_patch(&patch.twin_id, &patch.ops).await {
                tracing::error!(twin_id = %patch.twin_id, error = %err, "Twin patch failed");
                return RelayOutcome::StoreFailed(err.to_string());
            }

            tracing::info!(
                twin_id = %patch.twin_id,
                op_count = patch.ops.len(),
                "Twin patched"
            );
            twins += 1;
            ops += patch.ops.len();
        }

        if twins == 0 {
            RelayOutcome::NothingToApply
        } else {
            RelayOutcome::Applied { twins, ops }
        }
    }
}

fn parse_failed(err: &ParseError) -> RelayOutcome {
    tracing::warn!(error = %err, "Event body did not parse");
    RelayOutcome::ParseFailed(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};
    use twin_relay_adapter_adt::MemoryTwinStore;

    fn relay_with_store() -> (Arc<MemoryTwinStore>, Relay) {
        let store = Arc::new(MemoryTwinStore::new());
        let relay = Relay::new(Arc::clone(&store) as Arc<dyn TwinStore>, RuleSet::standard());
        (store, relay)
    }

    #[tokio::test]
    async fn telemetry_event_patches_own_twin() {
        let (store, relay) = relay_with_store();
        store.insert_twin("Sensor1", Map::new());

        let outcome = relay
            .handle_telemetry(br#"{"deviceId":"Sensor1","telemetry":{"temp":42.5,"humidity":10}}"#)
            .await;

        assert_eq!(outcome, RelayOutcome::Applied { twins: 1, ops: 2 });
        let twin = store.twin("Sensor1").unwrap();
        assert_eq!(twin["temp"], json!(42.5));
        assert_eq!(twin["humidity"], json!(10));
    }

    #[tokio::test]
    async fn moulding_envelope_patches_device_twin() {
        let (store, relay) = relay_with_store();
        store.insert_twin("DevA", Map::new());

        let outcome = relay
            .handle_envelope(
                br#"{
                    "systemProperties": {"iothub-connection-device-id": "DevA"},
                    "body": {"DeviceType": "MouldingSensor", "ChasisTemperature": 88.2, "PowerUsage": 5.1}
                }"#,
            )
            .await;

        assert_eq!(outcome, RelayOutcome::Applied { twins: 1, ops: 2 });
        let twin = store.twin("DevA").unwrap();
        assert_eq!(twin["ChasisTemperature"], json!(88.2));
        assert_eq!(twin["PowerUsage"], json!(5.1));
    }

    #[tokio::test]
    async fn motor_on_patches_source_and_companion() {
        let (store, relay) = relay_with_store();
        store.insert_twin("Motor1", Map::new());
        store.insert_twin("GenericSensor04", Map::new());

        let outcome = relay
            .handle_properties(
                br#"{"deviceId":"Motor1","properties":[{"name":"MotorStatus","value":true}]}"#,
            )
            .await;

        assert_eq!(outcome, RelayOutcome::Applied { twins: 2, ops: 2 });
        assert_eq!(store.twin("Motor1").unwrap()["MotorStatus"], json!(true));
        assert_eq!(store.twin("GenericSensor04").unwrap()["double01"], json!(30));
    }

    #[tokio::test]
    async fn motor_off_zeroes_companion() {
        let (store, relay) = relay_with_store();
        store.insert_twin("Motor1", Map::new());
        store.insert_twin("GenericSensor04", Map::new());

        relay
            .handle_properties(
                br#"{"deviceId":"Motor1","properties":[{"name":"MotorStatus","value":false}]}"#,
            )
            .await;

        assert_eq!(store.twin("GenericSensor04").unwrap()["double01"], json!(0));
    }

    #[tokio::test]
    async fn malformed_bodies_never_escape_the_handler() {
        let (_, relay) = relay_with_store();

        for raw in [
            &b""[..],
            b"not json",
            br#"{"telemetry":{"x":1}}"#,
            br#"{"deviceId":""}"#,
        ] {
            let outcome = relay.handle_telemetry(raw).await;
            assert!(matches!(outcome, RelayOutcome::ParseFailed(_)), "{raw:?}");
        }

        let outcome = relay.handle_envelope(b"{}").await;
        assert!(matches!(outcome, RelayOutcome::ParseFailed(_)));
    }

    #[tokio::test]
    async fn unknown_device_type_is_reported() {
        let (_, relay) = relay_with_store();

        let outcome = relay
            .handle_envelope(
                br#"{
                    "systemProperties": {"iothub-connection-device-id": "DevA"},
                    "body": {"DeviceType": "NoSuchSensor", "x": 1}
                }"#,
            )
            .await;

        assert_eq!(
            outcome,
            RelayOutcome::UnknownDeviceType("NoSuchSensor".to_string())
        );
    }

    #[tokio::test]
    async fn missing_rule_field_is_translate_failure() {
        let (_, relay) = relay_with_store();

        let outcome = relay
            .handle_envelope(
                br#"{
                    "systemProperties": {"iothub-connection-device-id": "DevA"},
                    "body": {"DeviceType": "MouldingSensor", "ChasisTemperature": 88.2}
                }"#,
            )
            .await;

        assert!(matches!(outcome, RelayOutcome::TranslateFailed(_)));
    }

    #[tokio::test]
    async fn store_failure_is_caught_and_reported() {
        // no twin seeded: the memory store answers NotFound
        let (_, relay) = relay_with_store();

        let outcome = relay
            .handle_telemetry(br#"{"deviceId":"Ghost","telemetry":{"temp":1}}"#)
            .await;

        assert!(matches!(outcome, RelayOutcome::StoreFailed(_)));
    }

    #[tokio::test]
    async fn empty_telemetry_is_nothing_to_apply() {
        let (store, relay) = relay_with_store();
        store.insert_twin("Sensor1", Map::new());

        let outcome = relay
            .handle_telemetry(br#"{"deviceId":"Sensor1","telemetry":{}}"#)
            .await;

        assert_eq!(outcome, RelayOutcome::NothingToApply);
    }
}
