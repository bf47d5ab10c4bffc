use std::sync::Arc;

use anyhow::Result;
use kube::Client;
use tokio_util::sync::CancellationToken;

use crate::admission::AdmissionFilter;
use crate::app::Application;
use crate::app::ApplicationServices;
use crate::config::QueueConfig;
use crate::config::RotatorConfig;
use crate::config::RunArgs;
use crate::k8s::DeploymentWatcher;
use crate::k8s::KubeDeploymentApi;
use crate::kube_client::init_kube_client;
use crate::queue::WorkQueue;
use crate::rate_limiter::controller_rate_limiter;
use crate::reconciler::Reconciler;
use crate::traits::SystemClock;

/// Application builder
pub struct ApplicationBuilder {
    run_args: RunArgs,
}

impl ApplicationBuilder {
    pub fn new(run_args: RunArgs) -> Self {
        Self { run_args }
    }

    /// Connects to the cluster and wires the controller together.
    pub async fn build(self) -> Result<Application> {
        tracing::info!("Building application components...");

        let client = init_kube_client(self.run_args.kubeconfig.clone())
            .await
            .map_err(|e| anyhow::anyhow!("{e:?}"))?;

        Ok(self.build_with_client(client))
    }

    /// Wires the controller around an existing client.
    pub fn build_with_client(self, client: Client) -> Application {
        let shutdown = CancellationToken::new();
        let config = Arc::new(RotatorConfig::from(&self.run_args));
        let queue_config = QueueConfig::from(&self.run_args);

        tracing::info!(
            threshold_minutes = config.age_threshold.num_minutes(),
            namespaces = ?config.namespaces,
            "Rotation policy configured"
        );

        let queue = WorkQueue::new(
            controller_rate_limiter(&queue_config),
            shutdown.child_token(),
        );
        let admission = Arc::new(AdmissionFilter::new(config.clone(), queue.clone()));
        let (watcher, lister, cache_sync) = DeploymentWatcher::new(client.clone(), admission);

        let reconciler = Arc::new(Reconciler::new(
            config,
            queue.clone(),
            Arc::new(lister),
            Arc::new(KubeDeploymentApi::new(client)),
            Arc::new(SystemClock),
        ));

        let services = ApplicationServices {
            queue,
            reconciler,
            cache_sync,
        };
        Application::new(services, watcher, self.run_args, shutdown)
    }
}
