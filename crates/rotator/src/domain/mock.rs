//! In-memory stand-ins for the cluster seams, shared by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use error_stack::Report;
use k8s_openapi::api::apps::v1::Deployment;

use crate::infrastructure::k8s::KubernetesError;
use crate::traits::Clock;
use crate::traits::DeploymentApi;
use crate::traits::DeploymentLister;
use crate::types::ObjectKey;
use crate::types::WorkloadMeta;

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Default)]
pub struct MapLister(pub HashMap<ObjectKey, WorkloadMeta>);

impl MapLister {
    pub fn with(workload: WorkloadMeta) -> Self {
        Self(HashMap::from([(workload.key.clone(), workload)]))
    }
}

impl DeploymentLister for MapLister {
    fn get(&self, key: &ObjectKey) -> Option<WorkloadMeta> {
        self.0.get(key).cloned()
    }
}

/// Records every call and fails on demand.
#[derive(Default)]
pub struct RecordingApi {
    pub fail_delete: bool,
    pub fail_create: bool,
    pub deletes: Mutex<Vec<ObjectKey>>,
    pub creates: Mutex<Vec<(String, Deployment)>>,
}

impl RecordingApi {
    pub fn deletes(&self) -> Vec<ObjectKey> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn creates(&self) -> Vec<(String, Deployment)> {
        self.creates.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeploymentApi for RecordingApi {
    async fn delete(&self, key: &ObjectKey) -> Result<(), Report<KubernetesError>> {
        self.deletes.lock().unwrap().push(key.clone());
        if self.fail_delete {
            return Err(Report::new(KubernetesError::DeleteFailed {
                namespace: key.namespace.clone(),
                name: key.name.clone(),
            }));
        }
        Ok(())
    }

    async fn create(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<(), Report<KubernetesError>> {
        self.creates
            .lock()
            .unwrap()
            .push((namespace.to_string(), deployment.clone()));
        if self.fail_create {
            return Err(Report::new(KubernetesError::CreateFailed {
                namespace: namespace.to_string(),
            }));
        }
        Ok(())
    }
}
