//! The infrastructure seam.
//!
//! The controller drives registry state and traffic selectors; actually
//! creating workloads is delegated to a [`Provisioner`]. Calls submit the
//! desired state and return once accepted — nothing here blocks waiting
//! for infrastructure convergence, which is observed separately through
//! replica snapshots.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use shipyard_state::{Color, RegistryStore, ReplicaSnapshot, VersionSpec, epoch_secs};

/// Infrastructure failure, surfaced verbatim to the caller.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ProvisionError(pub String);

/// Backend that materializes version descriptors as running workloads.
pub trait Provisioner: Send + Sync {
    /// Create or update the workload for one color of an application.
    ///
    /// Returns the address (`host:port`) the workload listens on, used
    /// for readiness probing. Must be idempotent: re-applying the same
    /// spec to the same color replaces the previous workload.
    fn apply(
        &self,
        namespace: &str,
        name: &str,
        spec: &VersionSpec,
        color: Color,
    ) -> Result<String, ProvisionError>;

    /// Tear down one color's workload. Removing a color that was never
    /// provisioned is not an error.
    fn remove(&self, namespace: &str, name: &str, color: Color) -> Result<(), ProvisionError>;
}

/// Single-node backend: workloads are assumed local and replica
/// snapshots converge immediately. Useful for standalone mode and tests;
/// a cluster deployment substitutes its own backend behind the trait.
pub struct LocalProvisioner {
    store: RegistryStore,
}

impl LocalProvisioner {
    pub fn new(store: RegistryStore) -> Self {
        Self { store }
    }
}

impl Provisioner for LocalProvisioner {
    fn apply(
        &self,
        namespace: &str,
        name: &str,
        spec: &VersionSpec,
        color: Color,
    ) -> Result<String, ProvisionError> {
        let mut conditions = HashMap::new();
        conditions.insert("Available".to_string(), "True".to_string());

        let snapshot = ReplicaSnapshot {
            namespace: namespace.to_string(),
            name: name.to_string(),
            color,
            current: spec.replicas,
            available: spec.replicas,
            updated: spec.replicas,
            conditions,
            observed_at: epoch_secs(),
        };
        self.store
            .put_replicas(&snapshot)
            .map_err(|e| ProvisionError(e.to_string()))?;

        debug!(
            app = %format!("{namespace}/{name}"),
            color = color.as_str(),
            image = %spec.image_ref(),
            replicas = spec.replicas,
            "workload applied"
        );
        Ok(format!("127.0.0.1:{}", spec.port))
    }

    fn remove(&self, namespace: &str, name: &str, color: Color) -> Result<(), ProvisionError> {
        self.store
            .delete_replica_snapshot(namespace, name, color)
            .map_err(|e| ProvisionError(e.to_string()))?;
        debug!(
            app = %format!("{namespace}/{name}"),
            color = color.as_str(),
            "workload removed"
        );
        Ok(())
    }
}
