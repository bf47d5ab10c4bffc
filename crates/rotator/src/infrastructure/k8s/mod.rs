//! Kubernetes integration module.
//!
//! - [`DeploymentWatcher`]: the watch cache, announcing newly observed deployments
//! - [`KubeDeploymentApi`]: delete and create calls against the API server
//! - [`KubernetesError`]: errors raised by both

pub mod deployment_api;
pub mod deployment_watcher;
pub mod types;

pub use deployment_api::KubeDeploymentApi;
pub use deployment_watcher::AddTracker;
pub use deployment_watcher::CacheSync;
pub use deployment_watcher::DeploymentWatcher;
pub use deployment_watcher::StoreLister;
pub use types::KubernetesError;
