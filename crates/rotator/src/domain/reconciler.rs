//! The rotation loop: drains the work queue and deletes then recreates
//! deployments once they are older than the configured threshold.

use std::sync::Arc;

use chrono::TimeDelta;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::config::RotatorConfig;
use crate::queue::WorkQueue;
use crate::replacement::replacement_deployment;
use crate::traits::Clock;
use crate::traits::DeploymentApi;
use crate::traits::DeploymentLister;
use crate::types::Decision;
use crate::types::ObjectKey;
use crate::types::ReconcileOutcome;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Rounds `age` to the nearest whole minute, halves away from zero.
pub fn round_to_minute(age: TimeDelta) -> TimeDelta {
    let millis = age.num_milliseconds();
    let half = MILLIS_PER_MINUTE / 2;
    let minutes = if millis >= 0 {
        (millis + half) / MILLIS_PER_MINUTE
    } else {
        (millis - half) / MILLIS_PER_MINUTE
    };
    TimeDelta::minutes(minutes)
}

/// Age policy: act only once the rounded age is strictly over the threshold.
pub fn decide(age: TimeDelta, threshold: TimeDelta) -> Decision {
    if round_to_minute(age) > threshold {
        Decision::Act
    } else {
        Decision::Defer
    }
}

pub struct Reconciler {
    config: Arc<RotatorConfig>,
    queue: WorkQueue<ObjectKey>,
    lister: Arc<dyn DeploymentLister>,
    api: Arc<dyn DeploymentApi>,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    pub fn new(
        config: Arc<RotatorConfig>,
        queue: WorkQueue<ObjectKey>,
        lister: Arc<dyn DeploymentLister>,
        api: Arc<dyn DeploymentApi>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            queue,
            lister,
            api,
            clock,
        }
    }

    /// Processes items until the queue shuts down.
    #[tracing::instrument(skip(self), fields(threshold_minutes = self.config.age_threshold.num_minutes()))]
    pub async fn run(&self) {
        info!("Starting rotation worker");
        while self.process_next_item().await {}
        info!("Rotation worker stopped");
    }

    /// Takes one item off the queue and reconciles it. Returns `false` once the
    /// queue is shutting down.
    pub async fn process_next_item(&self) -> bool {
        let Some(key) = self.queue.get().await else {
            return false;
        };

        let outcome = self.reconcile(&key).await;
        if outcome.is_deferred() {
            self.queue.done(&key);
            self.queue.add_rate_limited(key);
        } else {
            self.queue.forget(&key);
            self.queue.done(&key);
        }
        true
    }

    /// Evaluates `key` against the age policy and acts on it if needed.
    ///
    /// Queue bookkeeping is left to the caller.
    pub async fn reconcile(&self, key: &ObjectKey) -> ReconcileOutcome {
        let Some(workload) = self.lister.get(key) else {
            debug!(%key, "deployment no longer in cache");
            return ReconcileOutcome::Missing;
        };

        let Some(created_at) = workload.created_at else {
            debug!(%key, "deployment has no creation timestamp yet");
            return ReconcileOutcome::Deferred { age_minutes: 0 };
        };

        let age = round_to_minute(self.clock.now() - created_at);
        match decide(age, self.config.age_threshold) {
            Decision::Defer => ReconcileOutcome::Deferred {
                age_minutes: age.num_minutes(),
            },
            Decision::Act => {
                info!(
                    namespace = %key.namespace,
                    name = %key.name,
                    age_minutes = age.num_minutes(),
                    "Restarting deployment"
                );
                self.rotate(key).await
            }
        }
    }

    async fn rotate(&self, key: &ObjectKey) -> ReconcileOutcome {
        if let Err(e) = self.api.delete(key).await {
            error!(namespace = %key.namespace, name = %key.name, "Error while deleting the deployment: {e:?}");
            return ReconcileOutcome::DeleteFailed;
        }
        self.recreate(&key.namespace).await
    }

    /// Submits the replacement deployment. Failures are logged, not retried.
    async fn recreate(&self, namespace: &str) -> ReconcileOutcome {
        let deployment = replacement_deployment(namespace);
        match self.api.create(namespace, &deployment).await {
            Ok(()) => {
                info!(%namespace, "Created replacement deployment");
                ReconcileOutcome::Recreated
            }
            Err(e) => {
                error!(%namespace, "Error while creating a new deployment: {e:?}");
                ReconcileOutcome::RecreateFailed
            }
        }
    }
}
