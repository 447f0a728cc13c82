//! The event-to-twin-patch translation rule.
//!
//! Telemetry-object messages fan out generically: one `add` per telemetry
//! key, in wire order, value verbatim. Properties-array and hub-envelope
//! messages are rule-driven: the device type selects a rule whose field
//! list fixes both the patch set and its order. The translator performs no
//! retries and no validation of produced paths.

use crate::message::{DeviceMessage, MessageShape};
use crate::patch::{PatchOperation, TwinPatch};
use crate::rules::{Conversion, FieldSource, RuleSet};
use serde_json::Value;

/// Outcome of translating one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    /// Ordered patches, one entry per target twin.
    Patches(Vec<TwinPatch>),
    /// The message named a device type with no rule; nothing to apply.
    ///
    /// Kept distinct from an empty patch list so callers can tell a
    /// silent drop from "nothing to do".
    UnknownDeviceType,
}

/// Errors surfaced while applying a device rule.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TranslateError {
    /// A rule input field is absent from the message.
    #[error("input field {0} missing from message")]
    MissingField(String),
    /// A rule input value does not convert to the declared type.
    #[error("field {field} is not convertible to {expected}")]
    TypeMismatch {
        /// Input field that failed to convert.
        field: String,
        /// Type the rule declared.
        expected: &'static str,
    },
}

/// Translate a parsed message into an ordered list of twin patches.
///
/// # Errors
///
/// Returns [`TranslateError`] when a rule input field is missing or does
/// not convert to the declared type. The generic fan-out path is
/// infallible.
pub fn translate(msg: &DeviceMessage, rules: &RuleSet) -> Result<Translation, TranslateError> {
    match msg.shape {
        MessageShape::TelemetryObject => Ok(Translation::Patches(fan_out(msg))),
        MessageShape::PropertiesArray | MessageShape::HubEnvelope => rule_driven(msg, rules),
    }
}

/// One patch per telemetry key, path `/` + key, value untouched.
fn fan_out(msg: &DeviceMessage) -> Vec<TwinPatch> {
    let ops = msg
        .telemetry
        .iter()
        .map(|(key, value)| PatchOperation::add(key, value.clone()))
        .collect();
    vec![TwinPatch::new(msg.device_id.clone(), ops)]
}

fn rule_driven(msg: &DeviceMessage, rules: &RuleSet) -> Result<Translation, TranslateError> {
    let Some(device_type) = msg.device_type.as_deref() else {
        return Ok(Translation::UnknownDeviceType);
    };
    let Some(rule) = rules.get(device_type) else {
        tracing::debug!(device_type, "no rule for device type");
        return Ok(Translation::UnknownDeviceType);
    };

    let mut ops = Vec::with_capacity(rule.fields.len());
    for field in &rule.fields {
        let value = read_source(msg, &field.source)?;
        ops.push(PatchOperation::add_at(
            field.path.clone(),
            convert(value, field.convert, &field.source)?,
        ));
    }

    let mut patches = vec![TwinPatch::new(msg.device_id.clone(), ops)];

    if let Some(companion) = &rule.companion {
        let triggered = read_source(msg, &companion.trigger)?
            .as_bool()
            .ok_or_else(|| TranslateError::TypeMismatch {
                field: companion.trigger.to_string(),
                expected: "bool",
            })?;
        let value = if triggered {
            companion.on_true.clone()
        } else {
            companion.on_false.clone()
        };
        patches.push(TwinPatch::new(
            companion.twin_id.clone(),
            vec![PatchOperation::add_at(companion.path.clone(), value)],
        ));
    }

    Ok(Translation::Patches(patches))
}

fn read_source(msg: &DeviceMessage, source: &FieldSource) -> Result<Value, TranslateError> {
    match source {
        FieldSource::Field(name) => msg
            .telemetry
            .get(name)
            .cloned()
            .ok_or_else(|| TranslateError::MissingField(name.clone())),
        FieldSource::Property(index) => msg
            .properties
            .get(*index)
            .map(|p| Value::Bool(p.value))
            .ok_or_else(|| TranslateError::MissingField(source.to_string())),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn convert(
    value: Value,
    conversion: Conversion,
    source: &FieldSource,
) -> Result<Value, TranslateError> {
    let mismatch = |expected: &'static str| TranslateError::TypeMismatch {
        field: source.to_string(),
        expected,
    };
    match conversion {
        Conversion::Double => value
            .as_f64()
            .map(Value::from)
            .ok_or_else(|| mismatch("double")),
        Conversion::Int => value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f.round() as i64))
            .map(Value::from)
            .ok_or_else(|| mismatch("int")),
        Conversion::Bool => value
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| mismatch("bool")),
    }
}
