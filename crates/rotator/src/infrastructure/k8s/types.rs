use core::error::Error;

/// Errors that can occur during Kubernetes operations.
#[derive(Debug, derive_more::Display)]
pub enum KubernetesError {
    #[display("Failed to connect to Kubernetes API: {message}")]
    ConnectionFailed { message: String },
    #[display("Failed to watch deployments: {message}")]
    WatchFailed { message: String },
    #[display("Failed to delete deployment {name} in namespace {namespace}")]
    DeleteFailed { namespace: String, name: String },
    #[display("Failed to create deployment in namespace {namespace}")]
    CreateFailed { namespace: String },
}

impl Error for KubernetesError {}
