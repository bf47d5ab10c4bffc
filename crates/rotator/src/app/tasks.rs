use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::app::core::Application;
use crate::k8s::CacheSync;
use crate::reconciler::Reconciler;

/// Task manager, responsible for starting and managing all background tasks
pub struct Tasks {
    pub tasks: Vec<JoinHandle<()>>,
    cancellation_token: CancellationToken,
}

impl Tasks {
    pub fn new(cancellation_token: CancellationToken) -> Self {
        Self {
            tasks: Vec::new(),
            cancellation_token,
        }
    }

    /// Start all background tasks
    pub fn spawn_all_tasks(&mut self, app: &mut Application) -> Result<()> {
        let watcher_task = self.spawn_deployment_watcher_task(app)?;
        self.tasks.push(watcher_task);

        let reconciler_task = self.spawn_reconciler_task(app);
        self.tasks.push(reconciler_task);

        Ok(())
    }

    /// wait for tasks to complete or receive shutdown signal
    pub async fn wait_for_completion(&mut self) -> Result<()> {
        // Set up signal handling for graceful shutdown
        let signal_handler = {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate())?;
                let mut sigint = signal(SignalKind::interrupt())?;

                tokio::spawn(async move {
                    tokio::select! {
                        _ = sigterm.recv() => {
                            tracing::info!("Received SIGTERM, initiating graceful shutdown");
                        }
                        _ = sigint.recv() => {
                            tracing::info!("Received SIGINT, initiating graceful shutdown");
                        }
                    }
                })
            }
            #[cfg(not(unix))]
            {
                tokio::spawn(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("Failed to listen for Ctrl+C: {e}");
                        return;
                    }
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                })
            }
        };

        tokio::select! {
            _ = signal_handler => {
                tracing::info!("Shutdown signal received, cancelling all tasks");
            }
            result = futures::future::select_all(&mut self.tasks) => {
                let (result, _index, _remaining) = result;
                self.cancellation_token.cancel();
                if let Err(e) = result {
                    tracing::error!("Task completed with error: {e}");
                    return Err(e.into());
                }
                tracing::warn!("Task completed unexpectedly");
            }
        }

        self.cancellation_token.cancel();
        self.wait_for_tasks_with_timeout(Duration::from_secs(30)).await;

        Ok(())
    }

    async fn wait_for_tasks_with_timeout(&mut self, timeout: Duration) {
        let tasks = self.tasks.iter_mut().filter(|task| !task.is_finished());
        let wait_all = futures::future::join_all(tasks);
        match tokio::time::timeout(timeout, wait_all).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        tracing::error!("Task failed during shutdown: {e}");
                    }
                }
            }
            Err(_) => tracing::warn!("Task shutdown timed out after {:?}", timeout),
        }
    }

    fn spawn_deployment_watcher_task(&self, app: &mut Application) -> Result<JoinHandle<()>> {
        let watcher = app
            .take_watcher()
            .ok_or_else(|| anyhow::anyhow!("deployment watcher already started"))?;
        let token = self.cancellation_token.clone();

        Ok(tokio::spawn(async move {
            tracing::info!("Starting deployment watcher task");
            if let Err(e) = watcher.run(token).await {
                tracing::error!("Deployment watcher failed: {e:?}");
            } else {
                tracing::info!("Deployment watcher completed");
            }
        }))
    }

    fn spawn_reconciler_task(&self, app: &Application) -> JoinHandle<()> {
        let reconciler = app.services().reconciler.clone();
        let cache_sync = app.services().cache_sync.clone();
        let sync_timeout = Duration::from_secs(app.run_args().cache_sync_timeout_secs);
        let token = self.cancellation_token.clone();

        tokio::spawn(run_worker(reconciler, cache_sync, sync_timeout, token))
    }
}

/// Waits for the deployment cache, then drains the work queue until shutdown.
///
/// A sync timeout only delays the worker. Cancellation during the wait means
/// the worker never starts.
pub(crate) async fn run_worker(
    reconciler: Arc<Reconciler>,
    cache_sync: CacheSync,
    sync_timeout: Duration,
    token: CancellationToken,
) {
    tracing::info!("Starting rotation worker task");
    if !cache_sync.wait_for_sync(sync_timeout, &token).await {
        if token.is_cancelled() {
            tracing::info!("Rotation worker task cancelled before cache sync");
            return;
        }
        tracing::warn!(
            "Deployment cache not synced after {:?}, starting worker anyway",
            sync_timeout
        );
    }

    // The queue shares the cancellation token, so the loop ends on shutdown
    // after finishing the item in hand.
    reconciler.run().await;
    tracing::info!("Rotation worker task completed");
}
