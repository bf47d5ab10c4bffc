use std::collections::HashMap;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use error_stack::Report;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::runtime::reflector;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::reflector::Store;
use kube::runtime::watcher;
use kube::runtime::watcher::Event;
use kube::runtime::WatchStreamExt;
use kube::Api;
use kube::Client;
use tokio::select;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::infrastructure::k8s::KubernetesError;
use crate::traits::AddListener;
use crate::traits::DeploymentLister;
use crate::types::ObjectKey;
use crate::types::WorkloadMeta;

/// Turns watch events into "added" notifications.
///
/// A deployment counts as added the first time its key is seen, or when the
/// UID behind a known key changes (deleted and recreated while the watch was
/// down). Updates to known deployments are not announced.
#[derive(Debug, Default)]
pub struct AddTracker {
    seen: HashMap<ObjectKey, Option<String>>,
}

impl AddTracker {
    /// Records an applied object and returns whether it is new.
    pub fn applied(&mut self, workload: &WorkloadMeta) -> bool {
        match self.seen.insert(workload.key.clone(), workload.uid.clone()) {
            None => true,
            Some(previous) => previous.is_some() && workload.uid.is_some() && previous != workload.uid,
        }
    }

    pub fn deleted(&mut self, key: &ObjectKey) {
        self.seen.remove(key);
    }

    /// Replaces the known set with a full re-list and returns the new entries.
    pub fn restarted(&mut self, workloads: Vec<WorkloadMeta>) -> Vec<WorkloadMeta> {
        let mut previous = std::mem::take(&mut self.seen);
        let mut added = Vec::new();
        for workload in workloads {
            let is_new = match previous.remove(&workload.key) {
                None => true,
                Some(uid) => uid.is_some() && workload.uid.is_some() && uid != workload.uid,
            };
            self.seen.insert(workload.key.clone(), workload.uid.clone());
            if is_new {
                added.push(workload);
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Whether the watch cache has completed its initial list.
#[derive(Clone)]
pub struct CacheSync {
    rx: watch::Receiver<bool>,
}

impl CacheSync {
    pub fn new() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    pub fn is_synced(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits for the initial list. Returns `false` on timeout, on shutdown, or if
    /// the watcher went away before syncing.
    pub async fn wait_for_sync(&self, timeout: Duration, token: &CancellationToken) -> bool {
        let mut rx = self.rx.clone();
        select! {
            _ = token.cancelled() => false,
            result = tokio::time::timeout(timeout, rx.wait_for(|synced| *synced)) => {
                matches!(result, Ok(Ok(_)))
            }
        }
    }
}

/// [`DeploymentLister`] over the reflector store.
#[derive(Clone)]
pub struct StoreLister(Store<Deployment>);

impl StoreLister {
    pub fn new(store: Store<Deployment>) -> Self {
        Self(store)
    }
}

impl DeploymentLister for StoreLister {
    fn get(&self, key: &ObjectKey) -> Option<WorkloadMeta> {
        let object_ref = ObjectRef::new(&key.name).within(&key.namespace);
        self.0
            .get(&object_ref)
            .map(|deployment| WorkloadMeta::from(deployment.as_ref()))
    }
}

/// Dispatches watch events to the registered listener and flips the sync flag.
struct EventDispatcher {
    listener: Arc<dyn AddListener>,
    synced: watch::Sender<bool>,
    tracker: AddTracker,
}

impl EventDispatcher {
    fn handle(&mut self, event: &Event<Deployment>) {
        match event {
            Event::Applied(deployment) => {
                let workload = WorkloadMeta::from(deployment);
                if self.tracker.applied(&workload) {
                    self.listener.on_add(&workload);
                }
            }
            Event::Deleted(deployment) => {
                let workload = WorkloadMeta::from(deployment);
                debug!(key = %workload.key, "deployment deleted");
                self.tracker.deleted(&workload.key);
            }
            Event::Restarted(deployments) => {
                let workloads = deployments.iter().map(WorkloadMeta::from).collect();
                for workload in self.tracker.restarted(workloads) {
                    self.listener.on_add(&workload);
                }
                if !*self.synced.borrow() {
                    info!(count = deployments.len(), "Deployment cache synced");
                    self.synced.send_replace(true);
                }
            }
        }
    }
}

/// Watch cache over all deployments in the cluster.
pub struct DeploymentWatcher {
    api: Api<Deployment>,
    writer: reflector::store::Writer<Deployment>,
    dispatcher: EventDispatcher,
}

impl DeploymentWatcher {
    /// Creates the watcher with `listener` registered for "added" notifications.
    /// Also returns the lookup side of the cache and its sync handle.
    pub fn new(client: Client, listener: Arc<dyn AddListener>) -> (Self, StoreLister, CacheSync) {
        let (store, writer) = reflector::store();
        let (synced, cache_sync) = CacheSync::new();
        let watcher = Self {
            api: Api::all(client),
            writer,
            dispatcher: EventDispatcher {
                listener,
                synced,
                tracker: AddTracker::default(),
            },
        };
        (watcher, StoreLister::new(store), cache_sync)
    }

    /// Runs the watch until cancelled. Stream errors are retried with backoff.
    ///
    /// # Errors
    ///
    /// - [`KubernetesError::WatchFailed`] if the watch stream ends
    #[tracing::instrument(skip_all)]
    pub async fn run(self, cancellation_token: CancellationToken) -> Result<(), Report<KubernetesError>> {
        info!("Starting deployment watcher");
        let Self {
            api,
            writer,
            mut dispatcher,
        } = self;

        let stream = reflector(writer, watcher(api, watcher::Config::default()).default_backoff());
        let mut stream = pin!(stream);

        loop {
            select! {
                _ = cancellation_token.cancelled() => {
                    info!("Deployment watcher shutdown requested");
                    return Ok(());
                }
                event = stream.next() => {
                    match event {
                        Some(Ok(event)) => dispatcher.handle(&event),
                        Some(Err(e)) => warn!("Deployment watch error, retrying: {e}"),
                        None => {
                            error!("Deployment watch stream ended");
                            return Err(Report::new(KubernetesError::WatchFailed {
                                message: "watch stream ended".to_string(),
                            }));
                        }
                    }
                }
            }
        }
    }
}
