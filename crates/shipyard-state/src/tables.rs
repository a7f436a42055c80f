//! redb table definitions for the Shipyard registry.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain
//! types). Composite keys follow the pattern `{namespace}/{name}` for
//! application records and `{namespace}/{name}:{color}` for replica
//! snapshots.

use redb::TableDefinition;

/// Application records keyed by `{namespace}/{name}`.
pub const APPS: TableDefinition<&str, &[u8]> = TableDefinition::new("apps");

/// Observed replica counts keyed by `{namespace}/{name}:{color}`.
pub const REPLICAS: TableDefinition<&str, &[u8]> = TableDefinition::new("replicas");
