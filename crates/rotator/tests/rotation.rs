use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::TimeDelta;
use chrono::Utc;
use error_stack::Report;
use k8s_openapi::api::apps::v1::Deployment;
use rotator::admission::AdmissionFilter;
use rotator::config::QueueConfig;
use rotator::config::RotatorConfig;
use rotator::k8s::KubernetesError;
use rotator::queue::WorkQueue;
use rotator::rate_limiter::controller_rate_limiter;
use rotator::reconciler::Reconciler;
use rotator::replacement::replacement_deployment;
use rotator::traits::AddListener;
use rotator::traits::Clock;
use rotator::traits::DeploymentApi;
use rotator::traits::DeploymentLister;
use rotator::types::ObjectKey;
use rotator::types::ReconcileOutcome;
use rotator::types::WorkloadMeta;
use similar_asserts::assert_eq;
use test_log::test;
use tokio_util::sync::CancellationToken;

struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn advance(&self, by: TimeDelta) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

#[derive(Default)]
struct FakeCache(Mutex<HashMap<ObjectKey, WorkloadMeta>>);

impl FakeCache {
    fn insert(&self, workload: WorkloadMeta) {
        self.0.lock().unwrap().insert(workload.key.clone(), workload);
    }
}

impl DeploymentLister for FakeCache {
    fn get(&self, key: &ObjectKey) -> Option<WorkloadMeta> {
        self.0.lock().unwrap().get(key).cloned()
    }
}

#[derive(Default)]
struct FakeApi {
    fail_delete: bool,
    deletes: Mutex<Vec<ObjectKey>>,
    creates: Mutex<Vec<(String, Deployment)>>,
}

#[async_trait]
impl DeploymentApi for FakeApi {
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
        Ok(())
    }
}

struct Controller {
    admission: AdmissionFilter,
    reconciler: Reconciler,
    queue: WorkQueue<ObjectKey>,
    cache: Arc<FakeCache>,
    api: Arc<FakeApi>,
    clock: Arc<ManualClock>,
}

impl Controller {
    fn new(namespaces: &[&str], api: FakeApi) -> Self {
        let config = Arc::new(RotatorConfig::new(
            10,
            namespaces.iter().map(|ns| ns.to_string()),
        ));
        let queue = WorkQueue::new(
            controller_rate_limiter(&QueueConfig::default()),
            CancellationToken::new(),
        );
        let cache = Arc::new(FakeCache::default());
        let api = Arc::new(api);
        let clock = Arc::new(ManualClock(Mutex::new(Utc::now())));

        Self {
            admission: AdmissionFilter::new(config.clone(), queue.clone()),
            reconciler: Reconciler::new(
                config,
                queue.clone(),
                cache.clone(),
                api.clone(),
                clock.clone(),
            ),
            queue,
            cache,
            api,
            clock,
        }
    }

    /// Puts a deployment of the given age into the cache and announces it.
    fn observe(&self, namespace: &str, name: &str, age: TimeDelta) {
        let workload = WorkloadMeta::new(ObjectKey::new(namespace, name), self.clock.now() - age)
            .with_label("mesh", "true");
        self.cache.insert(workload.clone());
        self.admission.on_add(&workload);
    }

    fn deletes(&self) -> Vec<ObjectKey> {
        self.api.deletes.lock().unwrap().clone()
    }

    fn creates(&self) -> Vec<(String, Deployment)> {
        self.api.creates.lock().unwrap().clone()
    }
}

#[test(tokio::test(start_paused = true))]
async fn young_deployment_keeps_being_requeued() {
    let controller = Controller::new(&[], FakeApi::default());
    controller.observe("default", "foo", TimeDelta::minutes(5));

    for _ in 0..5 {
        assert!(controller.reconciler.process_next_item().await);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(controller.queue.len(), 1);
    }

    assert!(controller.deletes().is_empty());
    assert!(controller.creates().is_empty());
}

#[test(tokio::test(start_paused = true))]
async fn deployment_is_rotated_once_it_ages_past_threshold() {
    let controller = Controller::new(&[], FakeApi::default());
    controller.observe("default", "foo", TimeDelta::minutes(5));

    assert!(controller.reconciler.process_next_item().await);
    assert!(controller.deletes().is_empty());

    controller.clock.advance(TimeDelta::minutes(6));
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(controller.reconciler.process_next_item().await);

    assert_eq!(controller.deletes(), vec![ObjectKey::new("default", "foo")]);
    let creates = controller.creates();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].0, "default");
    assert_eq!(creates[0].1, replacement_deployment("default"));
    assert!(controller.queue.is_empty());
}

#[test(tokio::test)]
async fn old_deployment_is_deleted_and_recreated_once() {
    let controller = Controller::new(&[], FakeApi::default());
    let key = ObjectKey::new("default", "foo");
    controller.observe("default", "foo", TimeDelta::minutes(11));

    let outcome = controller.reconciler.reconcile(&key).await;

    assert_eq!(outcome, ReconcileOutcome::Recreated);
    assert_eq!(controller.deletes(), vec![key]);
    assert_eq!(controller.creates().len(), 1);
}

#[test(tokio::test)]
async fn failed_delete_issues_no_create_and_is_forgotten() {
    let api = FakeApi {
        fail_delete: true,
        ..Default::default()
    };
    let controller = Controller::new(&[], api);
    controller.observe("default", "foo", TimeDelta::minutes(11));

    assert!(controller.reconciler.process_next_item().await);

    assert_eq!(controller.deletes().len(), 1);
    assert!(controller.creates().is_empty());
    assert!(controller.queue.is_empty());
}

#[test(tokio::test)]
async fn namespace_outside_allow_list_is_never_touched() {
    let controller = Controller::new(&["prod"], FakeApi::default());
    controller.observe("staging", "foo", TimeDelta::minutes(30));

    assert!(controller.queue.is_empty());

    controller.queue.shut_down();
    controller.reconciler.run().await;

    assert!(controller.deletes().is_empty());
    assert!(controller.creates().is_empty());
}

#[test(tokio::test)]
async fn unlabelled_deployment_is_never_enqueued() {
    let controller = Controller::new(&[], FakeApi::default());
    let workload = WorkloadMeta::new(
        ObjectKey::new("default", "foo"),
        controller.clock.now() - TimeDelta::minutes(30),
    );
    controller.cache.insert(workload.clone());

    controller.admission.on_add(&workload);
    controller
        .admission
        .on_add(&workload.clone().with_label("mesh", "yes"));

    assert!(controller.queue.is_empty());
}

#[test(tokio::test)]
async fn shutdown_stops_worker_regardless_of_queue_depth() {
    let controller = Controller::new(&[], FakeApi::default());
    for name in ["a", "b", "c"] {
        controller.observe("default", name, TimeDelta::minutes(30));
    }
    assert_eq!(controller.queue.len(), 3);

    controller.queue.shut_down();

    assert!(!controller.reconciler.process_next_item().await);
    assert!(controller.deletes().is_empty());
}

#[test(tokio::test)]
async fn pending_worker_wakes_on_shutdown() {
    let controller = Arc::new(Controller::new(&[], FakeApi::default()));
    let worker = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.reconciler.run().await })
    };

    tokio::task::yield_now().await;
    controller.queue.shut_down();

    worker.await.expect("worker should exit cleanly");
    assert!(controller.deletes().is_empty());
}
