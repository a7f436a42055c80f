//! Input validation for deploy/prepare requests.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use shipyard_state::{EnvVar, VersionSpec};

use crate::error::{BlueGreenError, BlueGreenResult};

/// DNS-1123 label: lowercase alphanumerics and hyphens, no leading or
/// trailing hyphen. Applies to application names everywhere.
static DNS1123: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid name pattern"));

/// Maximum DNS-1123 label length.
const MAX_NAME_LEN: usize = 63;

fn default_health_path() -> String {
    "/".to_string()
}

fn default_readiness_path() -> String {
    "/ready".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_replicas() -> u32 {
    1
}

/// Request body for deploy and prepare.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareSpec {
    pub name: String,
    pub image: String,
    pub tag: String,
    pub port: u16,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default = "default_readiness_path")]
    pub readiness_path: String,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    #[serde(default)]
    pub env: Vec<EnvVar>,
}

impl PrepareSpec {
    /// Validate the spec. No registry state is created on failure.
    pub fn validate(&self) -> BlueGreenResult<()> {
        if self.name.len() > MAX_NAME_LEN || !DNS1123.is_match(&self.name) {
            return Err(BlueGreenError::Validation(format!(
                "name {:?} is not a valid DNS-1123 label",
                self.name
            )));
        }
        if self.image.trim().is_empty() {
            return Err(BlueGreenError::Validation("image must not be empty".into()));
        }
        if self.tag.trim().is_empty() {
            return Err(BlueGreenError::Validation("tag must not be empty".into()));
        }
        if self.port == 0 {
            return Err(BlueGreenError::Validation(
                "port must be in range 1-65535".into(),
            ));
        }
        if self.replicas == 0 {
            return Err(BlueGreenError::Validation("replicas must be >= 1".into()));
        }
        for path in [&self.health_path, &self.readiness_path, &self.metrics_path] {
            if !path.starts_with('/') {
                return Err(BlueGreenError::Validation(format!(
                    "path {path:?} must start with '/'"
                )));
            }
        }
        Ok(())
    }

    /// The version descriptor this spec describes.
    pub fn version(&self) -> VersionSpec {
        VersionSpec {
            image: self.image.clone(),
            tag: self.tag.clone(),
            port: self.port,
            health_path: self.health_path.clone(),
            readiness_path: self.readiness_path.clone(),
            metrics_path: self.metrics_path.clone(),
            replicas: self.replicas,
            env: self.env.clone(),
        }
    }
}
