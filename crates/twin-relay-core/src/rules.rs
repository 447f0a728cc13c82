//! Data-driven translation rules.
//!
//! A device type maps to a fixed list of (output path, input field,
//! conversion) triples, optionally with a derived patch onto a second,
//! fixed companion twin. The table replaces per-device branching: new
//! device types are added by data, not code. Rule sets are built once at
//! startup and never mutated.

use serde_json::Value;
use std::fmt;

/// Where a rule reads its input value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    /// Named field of the telemetry / envelope body mapping.
    Field(String),
    /// Index into the properties array of boolean reports.
    Property(usize),
}

impl fmt::Display for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Property(index) => write!(f, "properties[{index}]"),
        }
    }
}

/// Conversion a field rule applies before forwarding a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Forward as a 64-bit float.
    Double,
    /// Forward as a signed integer (floats are rounded).
    Int,
    /// Forward as a boolean.
    Bool,
}

/// One output property derived from one input field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    /// Rooted output path on the target twin (`/ChasisTemperature`).
    pub path: String,
    /// Input field the value is read from.
    pub source: FieldSource,
    /// Conversion applied before forwarding.
    pub convert: Conversion,
}

impl FieldRule {
    /// Rule reading a named body/telemetry field.
    #[must_use]
    pub fn field(path: &str, source: &str, convert: Conversion) -> Self {
        Self {
            path: path.to_string(),
            source: FieldSource::Field(source.to_string()),
            convert,
        }
    }

    /// Rule reading an indexed boolean property report.
    #[must_use]
    pub fn property(path: &str, index: usize, convert: Conversion) -> Self {
        Self {
            path: path.to_string(),
            source: FieldSource::Property(index),
            convert,
        }
    }
}

/// A derived patch onto a fixed companion twin, keyed off a boolean input.
///
/// A status change on one twin propagates a derived value onto a hardcoded
/// companion: `on_true` when the trigger reads true, `on_false` otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanionRule {
    /// Fixed companion twin id.
    pub twin_id: String,
    /// Rooted output path on the companion twin.
    pub path: String,
    /// Boolean input deciding which value is written.
    pub trigger: FieldSource,
    /// Value written when the trigger is true.
    pub on_true: Value,
    /// Value written when the trigger is false.
    pub on_false: Value,
}

/// Translation rule for one device type.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRule {
    /// Device-type tag this rule matches, case-sensitive.
    pub device_type: String,
    /// Field patches in emission order.
    pub fields: Vec<FieldRule>,
    /// Optional companion-twin patch, emitted after the field patches.
    pub companion: Option<CompanionRule>,
}

impl DeviceRule {
    /// Rule with field patches only.
    #[must_use]
    pub fn new(device_type: &str, fields: Vec<FieldRule>) -> Self {
        Self {
            device_type: device_type.to_string(),
            fields,
            companion: None,
        }
    }

    /// Attach a companion-twin patch to the rule.
    #[must_use]
    pub fn with_companion(mut self, companion: CompanionRule) -> Self {
        self.companion = Some(companion);
        self
    }
}

/// Immutable set of device rules, fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<DeviceRule>,
}

impl RuleSet {
    /// Empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, replacing any earlier rule for the same device type.
    #[must_use]
    pub fn with_rule(mut self, rule: DeviceRule) -> Self {
        self.rules.retain(|r| r.device_type != rule.device_type);
        self.rules.push(rule);
        self
    }

    /// Look up the rule for a device type.
    #[must_use]
    pub fn get(&self, device_type: &str) -> Option<&DeviceRule> {
        self.rules.iter().find(|r| r.device_type == device_type)
    }

    /// The built-in table for the factory sensor fleet.
    ///
    /// Paths, field names, and conversions mirror the upstream device
    /// templates exactly; `/FanSpeed` really does read the `Force` field.
    #[must_use]
    pub fn standard() -> Self {
        use Conversion::{Bool, Double, Int};

        Self::new()
            .with_rule(DeviceRule::new(
                "FanningSensor",
                vec![
                    FieldRule::field("/ChasisTemperature", "ChasisTemperature", Double),
                    FieldRule::field("/FanSpeed", "Force", Double),
                    FieldRule::field("/RoastingTime", "RoastingTime", Int),
                    FieldRule::field("/PowerUsage", "PowerUsage", Double),
                ],
            ))
            .with_rule(DeviceRule::new(
                "GrindingSensor",
                vec![
                    FieldRule::field("/ChasisTemperature", "ChasisTemperature", Double),
                    FieldRule::field("/Force", "Force", Double),
                    FieldRule::field("/PowerUsage", "PowerUsage", Double),
                    FieldRule::field("/Vibration", "Vibration", Double),
                ],
            ))
            .with_rule(DeviceRule::new(
                "MouldingSensor",
                vec![
                    FieldRule::field("/ChasisTemperature", "ChasisTemperature", Double),
                    FieldRule::field("/PowerUsage", "PowerUsage", Double),
                ],
            ))
            .with_rule(DeviceRule::new(
                "MetroSensor",
                vec![
                    FieldRule::field("/number03", "number03", Int),
                    FieldRule::field("/double01", "double01", Double),
                    FieldRule::field("/double02", "double02", Double),
                ],
            ))
            .with_rule(
                DeviceRule::new(
                    "test",
                    vec![FieldRule::property("/MotorStatus", 0, Bool)],
                )
                .with_companion(CompanionRule {
                    twin_id: "GenericSensor04".to_string(),
                    path: "/double01".to_string(),
                    trigger: FieldSource::Property(0),
                    on_true: Value::from(30),
                    on_false: Value::from(0),
                }),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_covers_known_types() {
        let rules = RuleSet::standard();
        for device_type in [
            "FanningSensor",
            "GrindingSensor",
            "MouldingSensor",
            "MetroSensor",
            "test",
        ] {
            assert!(rules.get(device_type).is_some(), "{device_type}");
        }
        assert!(rules.get("UnknownSensor").is_none());
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let rules = RuleSet::standard();
        assert!(rules.get("fanningsensor").is_none());
    }

    #[test]
    fn fanning_sensor_maps_force_to_fan_speed() {
        let rules = RuleSet::standard();
        let rule = rules.get("FanningSensor").unwrap();
        let fan_speed = &rule.fields[1];
        assert_eq!(fan_speed.path, "/FanSpeed");
        assert_eq!(fan_speed.source, FieldSource::Field("Force".to_string()));
    }

    #[test]
    fn test_rule_carries_companion() {
        let rules = RuleSet::standard();
        let companion = rules.get("test").unwrap().companion.as_ref().unwrap();
        assert_eq!(companion.twin_id, "GenericSensor04");
        assert_eq!(companion.path, "/double01");
        assert_eq!(companion.on_true, Value::from(30));
        assert_eq!(companion.on_false, Value::from(0));
    }

    #[test]
    fn with_rule_replaces_same_type() {
        let rules = RuleSet::new()
            .with_rule(DeviceRule::new("X", vec![]))
            .with_rule(DeviceRule::new(
                "X",
                vec![FieldRule::field("/a", "a", Conversion::Double)],
            ));
        assert_eq!(rules.get("X").unwrap().fields.len(), 1);
    }
}
