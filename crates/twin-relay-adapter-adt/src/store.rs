//! The twin-store contract consumed by the relay.

use async_trait::async_trait;
use serde_json::Value;
use twin_relay_core::PatchOperation;

/// External twin-store collaborator.
///
/// One implementation wraps the real REST API ([`crate::AdtClient`]); the
/// in-memory one ([`crate::MemoryTwinStore`]) backs tests. A single handle
/// is shared read-only across concurrent handler invocations.
#[async_trait]
pub trait TwinStore: Send + Sync {
    /// Fetch a twin document by id.
    ///
    /// # Errors
    ///
    /// Returns [`TwinStoreError::NotFound`] for an unknown twin, or a
    /// transport/API error.
    async fn get_twin(&self, twin_id: &str) -> Result<Value, TwinStoreError>;

    /// Apply a patch list to one twin, as a single store call.
    ///
    /// # Errors
    ///
    /// Returns [`TwinStoreError::NotFound`] for an unknown twin, or a
    /// transport/API error.
    async fn apply_patch(
        &self,
        twin_id: &str,
        ops: &[PatchOperation],
    ) -> Result<(), TwinStoreError>;
}

/// Errors that can occur against the twin store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TwinStoreError {
    /// Client initialization failed
    #[error("client init error: {0}")]
    Init(String),
    /// HTTP request failed
    #[error("request error: {0}")]
    Request(String),
    /// The twin does not exist
    #[error("twin {0} not found")]
    NotFound(String),
    /// Store API returned an error status
    #[error("store error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the store
        message: String,
    },
    /// Response parsing failed
    #[error("parse error: {0}")]
    Parse(String),
}
