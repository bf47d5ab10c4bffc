pub mod cli;
pub mod run;

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::TimeDelta;

/// Immutable rotation policy shared by the admission filter and the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatorConfig {
    /// Deployments whose rounded age exceeds this are rotated.
    pub age_threshold: TimeDelta,
    /// Namespaces eligible for rotation. Empty means every namespace.
    pub namespaces: BTreeSet<String>,
}

impl RotatorConfig {
    pub fn new(interval_minutes: u32, namespaces: impl IntoIterator<Item = String>) -> Self {
        Self {
            age_threshold: TimeDelta::minutes(i64::from(interval_minutes)),
            namespaces: namespaces.into_iter().collect(),
        }
    }

    pub fn namespace_allowed(&self, namespace: &str) -> bool {
        self.namespaces.is_empty() || self.namespaces.contains(namespace)
    }
}

impl From<&run::RunArgs> for RotatorConfig {
    fn from(args: &run::RunArgs) -> Self {
        Self::new(args.interval, args.namespaces.iter().cloned())
    }
}

/// Pacing of deferred re-checks.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfig {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub qps: f64,
    pub burst: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_secs(30),
            qps: 10.0,
            burst: 100,
        }
    }
}

impl From<&run::RunArgs> for QueueConfig {
    fn from(args: &run::RunArgs) -> Self {
        Self {
            base_delay: Duration::from_millis(args.requeue_base_delay_ms),
            max_delay: Duration::from_secs(args.requeue_max_delay_secs),
            qps: args.queue_qps,
            burst: args.queue_burst,
        }
    }
}

pub use cli::*;
pub use run::*;
