//! Core value types shared by the admission filter, work queue and reconciler.

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use k8s_openapi::api::apps::v1::Deployment;

/// Label that opts a deployment into periodic rotation.
pub const MESH_LABEL: &str = "mesh";

/// Strongly-typed work queue entry: a deployment reference by namespace and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("{namespace}/{name}")]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// The subset of a deployment's state the controller reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadMeta {
    pub key: ObjectKey,
    pub uid: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub labels: BTreeMap<String, String>,
}

impl WorkloadMeta {
    pub fn new(key: ObjectKey, created_at: DateTime<Utc>) -> Self {
        Self {
            key,
            uid: None,
            created_at: Some(created_at),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

impl From<&Deployment> for WorkloadMeta {
    fn from(deployment: &Deployment) -> Self {
        let metadata = &deployment.metadata;
        Self {
            key: ObjectKey::new(
                metadata.namespace.clone().unwrap_or_else(|| "default".to_string()),
                metadata.name.clone().unwrap_or_else(|| "unknown".to_string()),
            ),
            uid: metadata.uid.clone(),
            created_at: metadata.creation_timestamp.as_ref().map(|t| t.0),
            labels: metadata.labels.clone().unwrap_or_default(),
        }
    }
}

/// Result of evaluating one dequeued item against the age policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Not old enough yet, re-queue and check again later.
    Defer,
    /// Older than the threshold, delete and recreate.
    Act,
}

/// What the reconciler did with one dequeued item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Age within threshold; the key was re-queued.
    Deferred { age_minutes: i64 },
    /// Deleted and the replacement was submitted.
    Recreated,
    /// The delete call failed; nothing else was attempted.
    DeleteFailed,
    /// Deleted, but submitting the replacement failed.
    RecreateFailed,
    /// The key is no longer in the cache.
    Missing,
}

impl ReconcileOutcome {
    /// Whether the key stays tracked after this outcome.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred { .. })
    }
}
