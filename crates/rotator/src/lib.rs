pub mod app;
pub mod config;
mod domain;
mod infrastructure;

// Re-export main modules
pub use domain::admission;
pub use domain::queue;
pub use domain::rate_limiter;
pub use domain::reconciler;
pub use domain::replacement;
pub use domain::traits;
pub use domain::types;
pub use infrastructure::k8s;
pub use infrastructure::kube_client;
