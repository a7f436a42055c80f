//! shipyard-state — the deployment registry for Shipyard.
//!
//! Backed by [redb](https://docs.rs/redb), tracks one record per named
//! application per tenant namespace: the stable (traffic-serving) version,
//! an optional prepared preview, and the previous stable retained as the
//! rollback target.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns.
//! Composite keys (`{namespace}/{name}`, `{namespace}/{name}:{color}`)
//! enable efficient prefix scans per tenant namespace.
//!
//! The `RegistryStore` is `Clone` + `Send` + `Sync` (backed by
//! `Arc<Database>`) and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{RegistryError, RegistryResult};
pub use store::RegistryStore;
pub use types::*;
