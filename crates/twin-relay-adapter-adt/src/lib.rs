//! # Twin Store Adapter
//!
//! REST client for the external digital-twin graph store, the [`TwinStore`]
//! trait the relay programs against, and an in-memory store for tests and
//! local runs.
//!
//! The relay never inspects twin contents beyond logging them: the adapter
//! exposes exactly the two calls the core contract needs, fetch twin by id
//! and apply a patch list to a twin by id.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod encoding;
pub mod memory;
pub mod store;

pub use client::{AdtClient, AdtClientConfig};
pub use encoding::encode_twin_id;
pub use memory::MemoryTwinStore;
pub use store::{TwinStore, TwinStoreError};
