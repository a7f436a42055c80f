//! Domain types for the Shipyard deployment registry.
//!
//! These types represent the persisted state of applications: the version
//! descriptor serving production traffic (`stable`), an optional prepared
//! preview, and the previous stable retained for rollback. All types are
//! serializable to/from JSON for storage in redb tables.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Composite registry key, `{namespace}/{name}`.
pub type AppKey = String;

/// A single environment variable injected into a workload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// A deployable version of an application.
///
/// Exactly one `VersionSpec` per application is live at any time (the
/// record's `stable`); previews and rollback targets carry the same shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionSpec {
    /// Container image repository (e.g. `org/api`).
    pub image: String,
    /// Image tag (e.g. `v2`).
    pub tag: String,
    /// Container port, 1–65535.
    pub port: u16,
    /// HTTP path probed for liveness (e.g. `/healthz`).
    pub health_path: String,
    /// HTTP path gating Promote (e.g. `/ready`).
    pub readiness_path: String,
    /// HTTP path scraped for metrics (e.g. `/metrics`).
    pub metrics_path: String,
    /// Requested replica count, ≥ 1.
    pub replicas: u32,
    /// Environment variables for the workload.
    pub env: Vec<EnvVar>,
}

impl VersionSpec {
    /// `image:tag` as shown in status listings.
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }
}

/// Which side of the blue/green pair a version is provisioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Blue,
    Green,
}

impl Color {
    /// The opposite side — where the next preview lands.
    pub fn other(self) -> Color {
        match self {
            Color::Blue => Color::Green,
            Color::Green => Color::Blue,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Color::Blue => "blue",
            Color::Green => "green",
        }
    }
}

/// One record per `(namespace, name)` application.
///
/// Invariants enforced by the blue/green controller:
/// - `stable` is always present once the record exists.
/// - `preview` is present only between a successful Prepare and the
///   following Promote (or its replacement by another Prepare).
/// - `previous_stable` is set by Promote and consumed by Rollback or
///   overwritten by the next Promote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppRecord {
    pub namespace: String,
    pub name: String,
    /// The version descriptor currently serving production traffic.
    pub stable: VersionSpec,
    /// A prepared-but-not-promoted version, isolated from traffic.
    pub preview: Option<VersionSpec>,
    /// The version displaced by the most recent Promote (rollback target).
    pub previous_stable: Option<VersionSpec>,
    /// Which color `stable` is provisioned on.
    pub active_color: Color,
    /// Unix timestamp (seconds) when this record was created.
    pub created_at: u64,
    /// Unix timestamp (seconds) of the last mutation.
    pub updated_at: u64,
}

impl AppRecord {
    /// Build the composite key for the apps table.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// The color a new preview would be provisioned on.
    pub fn preview_color(&self) -> Color {
        self.active_color.other()
    }
}

/// Observed replica counts for one color of an application.
///
/// Written by the provisioning backend as infrastructure converges;
/// `current`/`available`/`updated` may lag the requested count during a
/// rollout, which is expected and not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplicaSnapshot {
    pub namespace: String,
    pub name: String,
    pub color: Color,
    /// Replicas that currently exist.
    pub current: u32,
    /// Replicas passing their health checks.
    pub available: u32,
    /// Replicas running the latest version descriptor.
    pub updated: u32,
    /// Free-form infrastructure conditions (e.g. `Progressing: True`).
    pub conditions: HashMap<String, String>,
    /// Unix timestamp (seconds) of the last observation.
    pub observed_at: u64,
}

impl ReplicaSnapshot {
    /// Build the composite key for the replicas table.
    pub fn table_key(&self) -> String {
        format!("{}/{}:{}", self.namespace, self.name, self.color.as_str())
    }
}

/// Build the registry key for an application.
pub fn app_key(namespace: &str, name: &str) -> AppKey {
    format!("{namespace}/{name}")
}

/// Current unix time in seconds.
pub fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
