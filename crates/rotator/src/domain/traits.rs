//! Seams between the reconciliation core and the cluster collaborators.

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use error_stack::Report;
use k8s_openapi::api::apps::v1::Deployment;

use crate::infrastructure::k8s::KubernetesError;
use crate::types::ObjectKey;
use crate::types::WorkloadMeta;

/// Trait for getting current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Read-only lookup into the watch cache.
pub trait DeploymentLister: Send + Sync {
    fn get(&self, key: &ObjectKey) -> Option<WorkloadMeta>;
}

/// Receives "object added" notifications from the watch cache.
pub trait AddListener: Send + Sync {
    fn on_add(&self, workload: &WorkloadMeta);
}

/// Synchronous cluster write operations used by the reconciler.
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    /// Delete the deployment identified by `key`.
    async fn delete(&self, key: &ObjectKey) -> Result<(), Report<KubernetesError>>;

    /// Submit `deployment` for creation in `namespace`.
    async fn create(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<(), Report<KubernetesError>>;
}
