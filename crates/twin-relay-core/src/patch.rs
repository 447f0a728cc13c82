//! Twin patch operations.
//!
//! The relay's only output: ordered JSON Patch `add` operations grouped per
//! target twin. Paths are `/` followed by the exact, case-sensitive property
//! name, matching the twin store's contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON Patch verbs issued against the twin store.
///
/// The relay only ever emits `add`, which the store treats as
/// add-or-replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Add or replace the property at `path`.
    Add,
}

/// One property update at a twin path.
///
/// Wire form: `{"op":"add","path":"/FanSpeed","value":12.5}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    /// Patch verb.
    pub op: PatchOp,
    /// Rooted property path (`/` + property name).
    pub path: String,
    /// New property value, forwarded verbatim.
    pub value: Value,
}

impl PatchOperation {
    /// Build an `add` operation from a bare property name.
    #[must_use]
    pub fn add(name: &str, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path: format!("/{name}"),
            value,
        }
    }

    /// Build an `add` operation from an already-rooted path.
    #[must_use]
    pub fn add_at(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path: path.into(),
            value,
        }
    }
}

/// All operations destined for a single twin, applied as one store call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwinPatch {
    /// Target twin id.
    pub twin_id: String,
    /// Operations in emission order. No dedup: if a path repeats, the
    /// store decides which write wins.
    pub ops: Vec<PatchOperation>,
}

impl TwinPatch {
    /// Group a list of operations under one target twin.
    #[must_use]
    pub fn new(twin_id: impl Into<String>, ops: Vec<PatchOperation>) -> Self {
        Self {
            twin_id: twin_id.into(),
            ops,
        }
    }
}
