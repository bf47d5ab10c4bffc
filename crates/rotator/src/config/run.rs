use clap::Parser;
use std::path::PathBuf;
use utils::logging::LOG_PATH_ENV_VAR;

#[derive(Parser, Clone, Debug)]
pub struct RunArgs {
    #[arg(
        long,
        env = "KUBECONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to a kubeconfig file. Falls back to ~/.kube/config, then in-cluster config"
    )]
    pub kubeconfig: Option<PathBuf>,

    #[arg(
        long,
        default_value_t = 10,
        help = "Age in minutes after which matched deployments are rotated"
    )]
    pub interval: u32,

    #[arg(
        long,
        default_value_t = 60,
        help = "Seconds to wait for the initial deployment list before starting the worker anyway"
    )]
    pub cache_sync_timeout_secs: u64,

    #[arg(
        long,
        default_value_t = 5,
        help = "Initial delay in milliseconds before re-checking a deployment that is not old enough"
    )]
    pub requeue_base_delay_ms: u64,

    #[arg(
        long,
        default_value_t = 30,
        help = "Upper bound in seconds on the re-check delay of a single deployment"
    )]
    pub requeue_max_delay_secs: u64,

    #[arg(
        long,
        default_value_t = 10.0,
        value_parser = parse_qps,
        help = "Overall re-check rate, in items per second"
    )]
    pub queue_qps: f64,

    #[arg(long, default_value_t = 100, help = "Overall re-check burst size")]
    pub queue_burst: u32,

    #[arg(
        long,
        env = LOG_PATH_ENV_VAR,
        value_hint = clap::ValueHint::FilePath,
        help = "Write logs to this file with daily rotation instead of stderr"
    )]
    pub log_path: Option<PathBuf>,

    /// Namespaces to rotate in. Empty means all namespaces.
    pub namespaces: Vec<String>,
}

fn parse_qps(value: &str) -> Result<f64, String> {
    let qps: f64 = value
        .parse()
        .map_err(|e| format!("`{value}` is not a number: {e}"))?;
    if !qps.is_finite() || qps <= 0.0 {
        return Err(format!("`{value}` must be a positive, finite rate"));
    }
    Ok(qps)
}

#[derive(Parser, Clone, Debug)]
pub struct ShowTemplateArgs {
    #[arg(long, default_value = "default", help = "Namespace to render the template for")]
    pub namespace: String,
}
