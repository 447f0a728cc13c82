//! In-memory twin store.
//!
//! Backs handler tests and local runs without a real store. Semantics
//! mirror the REST store where the relay can observe them: patching or
//! fetching an unknown twin is `NotFound`, and an `add` at an existing
//! path replaces the value (last write wins).

use crate::store::{TwinStore, TwinStoreError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use twin_relay_core::PatchOperation;

/// In-process map of twin documents.
#[derive(Debug, Default)]
pub struct MemoryTwinStore {
    twins: Mutex<HashMap<String, Map<String, Value>>>,
}

impl MemoryTwinStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or reset) a twin with the given properties.
    pub fn insert_twin(&self, twin_id: &str, properties: Map<String, Value>) {
        self.twins
            .lock()
            .expect("twin map lock poisoned")
            .insert(twin_id.to_string(), properties);
    }

    /// Snapshot a twin's properties, if it exists.
    #[must_use]
    pub fn twin(&self, twin_id: &str) -> Option<Map<String, Value>> {
        self.twins
            .lock()
            .expect("twin map lock poisoned")
            .get(twin_id)
            .cloned()
    }
}

#[async_trait]
impl TwinStore for MemoryTwinStore {
    async fn get_twin(&self, twin_id: &str) -> Result<Value, TwinStoreError> {
        self.twin(twin_id)
            .map(Value::Object)
            .ok_or_else(|| TwinStoreError::NotFound(twin_id.to_string()))
    }

    async fn apply_patch(
        &self,
        twin_id: &str,
        ops: &[PatchOperation],
    ) -> Result<(), TwinStoreError> {
        let mut twins = self.twins.lock().expect("twin map lock poisoned");
        let twin = twins
            .get_mut(twin_id)
            .ok_or_else(|| TwinStoreError::NotFound(twin_id.to_string()))?;

        for op in ops {
            let name = op.path.trim_start_matches('/');
            twin.insert(name.to_string(), op.value.clone());
        }

        Ok(())
    }
}
