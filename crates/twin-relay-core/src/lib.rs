//! # Twin Relay Core
//!
//! Message model and the event-to-twin-patch translation rule for relaying
//! IoT telemetry into a digital-twin graph store.
//!
//! This crate provides:
//! - Parsing of the three inbound wire shapes (telemetry object,
//!   properties array, hub envelope)
//! - The data-driven device-type rule table
//! - The translator producing ordered twin-patch lists
//!
//! No I/O happens here; the store adapter and the agent own the network.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod message;
pub mod patch;
pub mod rules;
pub mod translate;

pub use message::{DeviceMessage, Enrichment, MessageShape, ParseError, PropertyReport};
pub use patch::{PatchOp, PatchOperation, TwinPatch};
pub use rules::{CompanionRule, Conversion, DeviceRule, FieldRule, FieldSource, RuleSet};
pub use translate::{translate, TranslateError, Translation};
