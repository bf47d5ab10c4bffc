use std::path::Path;
use std::path::PathBuf;

use error_stack::Report;
use error_stack::ResultExt;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use kube::Client;
use kube::Config;

use crate::infrastructure::k8s::KubernetesError;

/// Connects to the cluster the rotator manages.
///
/// An explicit `kubeconfig` wins. Without one the local kubeconfig is tried
/// first, then the in-cluster service account.
pub async fn init_kube_client(
    kubeconfig: Option<PathBuf>,
) -> Result<Client, Report<KubernetesError>> {
    let config = match kubeconfig.as_deref() {
        Some(path) => config_from_file(path).await?,
        None => Config::infer()
            .await
            .change_context(KubernetesError::ConnectionFailed {
                message: "no kubeconfig found and not running in-cluster".to_string(),
            })?,
    };

    tracing::info!(cluster_url = %config.cluster_url, "Connecting to Kubernetes");
    Client::try_from(config).change_context(KubernetesError::ConnectionFailed {
        message: "invalid client configuration".to_string(),
    })
}

async fn config_from_file(path: &Path) -> Result<Config, Report<KubernetesError>> {
    let connection_failed = |what: &str| KubernetesError::ConnectionFailed {
        message: format!("{what} {}", path.display()),
    };

    let kubeconfig =
        Kubeconfig::read_from(path).change_context_lazy(|| connection_failed("cannot read"))?;
    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .change_context_lazy(|| connection_failed("no usable context in"))
}
