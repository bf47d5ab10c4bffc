//! Decides which observed deployments are tracked for rotation.

use std::sync::Arc;

use tracing::debug;
use tracing::info;

use crate::config::RotatorConfig;
use crate::queue::WorkQueue;
use crate::traits::AddListener;
use crate::types::ObjectKey;
use crate::types::WorkloadMeta;
use crate::types::MESH_LABEL;

/// Parses a boolean literal the way label values are conventionally written.
///
/// Returns `None` for anything outside the accepted literal set.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Gates entry into the work queue on namespace and opt-in label.
pub struct AdmissionFilter {
    config: Arc<RotatorConfig>,
    queue: WorkQueue<ObjectKey>,
}

impl AdmissionFilter {
    pub fn new(config: Arc<RotatorConfig>, queue: WorkQueue<ObjectKey>) -> Self {
        Self { config, queue }
    }

    /// Whether `workload` is eligible for rotation. A missing or malformed
    /// `mesh` label counts as not opted in.
    pub fn is_eligible(&self, workload: &WorkloadMeta) -> bool {
        let namespace_allowed = self.config.namespace_allowed(&workload.key.namespace);
        let mesh = workload
            .label(MESH_LABEL)
            .and_then(parse_bool)
            .unwrap_or(false);
        namespace_allowed && mesh
    }

    /// Enqueues `workload` if it is eligible. Returns whether it was admitted.
    pub fn admit(&self, workload: &WorkloadMeta) -> bool {
        if !self.is_eligible(workload) {
            debug!(key = %workload.key, "deployment not eligible for rotation");
            return false;
        }
        info!(
            namespace = %workload.key.namespace,
            name = %workload.key.name,
            "Adding deployment to the queue"
        );
        self.queue.add(workload.key.clone());
        true
    }
}

impl AddListener for AdmissionFilter {
    fn on_add(&self, workload: &WorkloadMeta) {
        self.admit(workload);
    }
}
