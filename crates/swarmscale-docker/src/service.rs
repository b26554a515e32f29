//! Swarm service document.
//!
//! The spec is kept as raw JSON so an update sends back every field the
//! engine returned, not just the ones modelled here.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{DockerError, DockerResult};

/// Result of `GET /services/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Service {
    #[serde(rename = "ID")]
    pub id: String,
    pub version: ObjectVersion,
    pub spec: Value,
}

/// Optimistic-concurrency token required by the update endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectVersion {
    pub index: u64,
}

/// Result of `POST /services/{id}/update`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateResponse {
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
}

const REPLICAS_POINTER: &str = "/Mode/Replicated/Replicas";

impl Service {
    pub fn name(&self) -> &str {
        self.spec
            .get("Name")
            .and_then(Value::as_str)
            .unwrap_or(&self.id)
    }

    /// Desired replica count from `Spec.Mode.Replicated.Replicas`.
    pub fn replicas(&self) -> DockerResult<u32> {
        let raw = self
            .spec
            .pointer(REPLICAS_POINTER)
            .ok_or_else(|| DockerError::NotReplicated(self.name().to_string()))?;

        let count = raw
            .as_u64()
            .ok_or_else(|| DockerError::Malformed(format!("replica count {raw} is not an integer")))?;

        u32::try_from(count)
            .map_err(|_| DockerError::Malformed(format!("replica count {count} out of range")))
    }

    /// Copy of the spec with the replica count replaced.
    pub fn spec_with_replicas(&self, replicas: u32) -> DockerResult<Value> {
        // Fails the same way `replicas()` does for global-mode services.
        self.replicas()?;

        let mut spec = self.spec.clone();
        match spec.pointer_mut(REPLICAS_POINTER) {
            Some(slot) => *slot = Value::from(replicas),
            None => return Err(DockerError::NotReplicated(self.name().to_string())),
        }
        Ok(spec)
    }
}
