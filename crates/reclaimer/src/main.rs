use clap::Parser;
use reclaimer_core::config::{parse_forbid_label, parse_ignored_accelerator_types};
use reclaimer_core::PolicyConfig;
use reclaimer_metrics::PrometheusSampler;
use reclaimer_runtime::{ControllerConfig, KubeApiClient, Orchestrator, ReclaimController};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "reclaimer",
    about = "Reclaims idle GPU workloads by deleting pods/jobs or scaling deployments to zero"
)]
struct Cli {
    /// Prometheus base URL for GPU utilization queries
    #[arg(long, env = "PROMETHEUS_URL", default_value = "http://prometheus:9090")]
    prometheus_url: String,

    /// Utilization metric exported per pod (DCGM exporter by default)
    #[arg(long, env = "GPU_UTIL_METRIC", default_value = "dcgm_gpu_utilization")]
    utilization_metric: String,

    /// Averaging window used to decide idleness, as a PromQL range
    #[arg(long, env = "GPU_UTIL_INTERVAL", default_value = "1h")]
    utilization_window: String,

    /// Utilization strictly above this fraction counts as active
    #[arg(long, env = "GPU_UTIL_THRESHOLD", default_value_t = 0.01)]
    utilization_threshold: f64,

    /// Minimum running time in seconds before a pod may be reclaimed
    #[arg(long, env = "MIN_RUNTIME_SECS", default_value_t = 3600)]
    min_runtime_secs: u64,

    /// 'key=value' label exempting a workload from reclamation; empty disables
    #[arg(long, env = "FORBID_DELETE_LABEL", default_value = "")]
    forbid_delete_label: String,

    /// Comma-separated accelerator types exempt from reclamation
    #[arg(long, env = "IGNORED_GPU_TYPES", default_value = "")]
    ignored_gpu_types: String,

    /// Node-selector key naming the accelerator type
    #[arg(long, env = "GPU_TYPE_SELECTOR_KEY", default_value = "nvidia.com/gpu.product")]
    gpu_type_selector_key: String,

    /// Seconds between reclamation cycles
    #[arg(long, env = "TICK_INTERVAL_SECS", default_value_t = 10)]
    tick_interval_secs: u64,

    /// Kubernetes API server URL; omit to use in-cluster discovery
    #[arg(long, env = "KUBE_API_URL")]
    api_url: Option<String>,

    /// Bearer token for the API server (with --api-url)
    #[arg(long, env = "KUBE_API_TOKEN")]
    api_token: Option<String>,

    /// Timeout in seconds for every metrics and orchestrator call
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 15)]
    request_timeout_secs: u64,

    /// Upper bound on candidates processed concurrently per tick
    #[arg(long, default_value_t = 4)]
    max_concurrent_candidates: usize,

    /// Also group the utilization query by accelerator identifier
    #[arg(long)]
    group_by_accelerator: bool,

    /// Log decisions without deleting or scaling anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.request_timeout_secs);

    let policy = PolicyConfig {
        utilization_threshold: cli.utilization_threshold,
        min_runtime: Duration::from_secs(cli.min_runtime_secs),
        forbid_label: parse_forbid_label(&cli.forbid_delete_label)
            .map_err(|e| miette::miette!("Invalid --forbid-delete-label: {}", e))?,
        accelerator_type_key: cli.gpu_type_selector_key.clone(),
        ignored_accelerator_types: parse_ignored_accelerator_types(&cli.ignored_gpu_types),
    };

    let sampler = PrometheusSampler::new(
        &cli.prometheus_url,
        &cli.utilization_metric,
        &cli.utilization_window,
        cli.group_by_accelerator,
        timeout,
    )
    .map_err(|e| miette::miette!("Failed to create metrics sampler: {}", e))?;
    info!("Utilization query: {}", sampler.query());

    let orchestrator: Arc<dyn Orchestrator> = match &cli.api_url {
        Some(url) => {
            info!("Using explicit API server at {}", url);
            Arc::new(
                KubeApiClient::new(url, cli.api_token.clone(), timeout)
                    .map_err(|e| miette::miette!("Failed to create API client: {}", e))?,
            )
        }
        None => {
            info!("Using in-cluster API server discovery");
            Arc::new(
                KubeApiClient::in_cluster(timeout)
                    .map_err(|e| miette::miette!("Failed to create in-cluster client: {}", e))?,
            )
        }
    };

    let controller = ReclaimController::new(
        Arc::new(sampler),
        orchestrator,
        policy,
        ControllerConfig {
            tick_interval: Duration::from_secs(cli.tick_interval_secs),
            window: cli.utilization_window.clone(),
            max_concurrent_candidates: cli.max_concurrent_candidates,
            dry_run: cli.dry_run,
        },
    );

    let token = CancellationToken::new();
    let controller_token = token.clone();
    let controller_handle = tokio::spawn(async move {
        if let Err(e) = controller.run(controller_token).await {
            error!("Reclamation controller error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| miette::miette!("Failed to listen for ctrl-c: {}", e))?;

    info!("Shutting down gracefully...");
    token.cancel();

    // Let an in-flight tick finish its dispatched operations
    let shutdown_timeout = Duration::from_secs(30);
    let _ = tokio::time::timeout(shutdown_timeout, controller_handle).await;

    info!("Shutdown complete");

    Ok(())
}
