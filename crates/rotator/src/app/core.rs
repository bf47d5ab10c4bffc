use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::app::services::ApplicationServices;
use crate::app::tasks::Tasks;
use crate::config::RunArgs;
use crate::k8s::DeploymentWatcher;

/// Application core structure with explicit dependencies
pub struct Application {
    services: ApplicationServices,
    watcher: Option<DeploymentWatcher>,
    run_args: RunArgs,
    shutdown: CancellationToken,
}

impl Application {
    pub fn new(
        services: ApplicationServices,
        watcher: DeploymentWatcher,
        run_args: RunArgs,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            services,
            watcher: Some(watcher),
            run_args,
            shutdown,
        }
    }

    pub fn services(&self) -> &ApplicationServices {
        &self.services
    }

    pub fn run_args(&self) -> &RunArgs {
        &self.run_args
    }

    /// Hands the watcher to the task that runs it. `None` once taken.
    pub(crate) fn take_watcher(&mut self) -> Option<DeploymentWatcher> {
        self.watcher.take()
    }

    /// Run application, start all tasks and wait for completion
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting all application tasks...");

        let mut tasks = Tasks::new(self.shutdown.clone());

        if let Err(e) = tasks.spawn_all_tasks(self) {
            tracing::error!("Failed to spawn application tasks: {}", e);
            return Err(e);
        }

        if let Err(e) = tasks.wait_for_completion().await {
            tracing::error!("Error during task execution: {}", e);
            return Err(e);
        }

        tracing::info!("Application run completed");
        Ok(())
    }

    /// Gracefully shutdown application
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down application...");

        self.shutdown.cancel();
        self.services.queue.shut_down();

        tracing::info!("Application shutdown completed");
        Ok(())
    }
}
