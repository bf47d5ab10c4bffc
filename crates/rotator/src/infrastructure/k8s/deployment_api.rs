use async_trait::async_trait;
use error_stack::Report;
use error_stack::ResultExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::DeleteParams;
use kube::api::PostParams;
use kube::Api;
use kube::Client;

use crate::infrastructure::k8s::KubernetesError;
use crate::traits::DeploymentApi;
use crate::types::ObjectKey;

/// [`DeploymentApi`] backed by the API server.
pub struct KubeDeploymentApi {
    client: Client,
}

impl KubeDeploymentApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl DeploymentApi for KubeDeploymentApi {
    async fn delete(&self, key: &ObjectKey) -> Result<(), Report<KubernetesError>> {
        self.api(&key.namespace)
            .delete(&key.name, &DeleteParams::default())
            .await
            .change_context(KubernetesError::DeleteFailed {
                namespace: key.namespace.clone(),
                name: key.name.clone(),
            })?;
        Ok(())
    }

    async fn create(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<(), Report<KubernetesError>> {
        self.api(namespace)
            .create(&PostParams::default(), deployment)
            .await
            .change_context(KubernetesError::CreateFailed {
                namespace: namespace.to_string(),
            })?;
        Ok(())
    }
}
