//! Commercial cutting service binary.

use std::fs::{self, File, OpenOptions};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

use comcutter_api::{create_router, metrics, AppState, Settings};
use comcutter_queue::{job_queue, Dispatcher, InFlightSet};
use comcutter_worker::{JobExecutor, WorkerPool};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let (settings, config_path) = Settings::load().context("Failed to load configuration")?;

    let log_file = match settings.api.log_file() {
        Some(path) => Some(open_log_file(&path)?),
        None => None,
    };
    init_tracing(settings.api.log_directive(), log_file);

    info!("Starting comcutter");
    info!("Using configuration file {}", config_path.display());

    let api_config = settings.api_config();
    let worker_config = settings.worker_config();
    info!(
        "API config: host={}, port={}, library_dir={}",
        api_config.host,
        api_config.port,
        settings.api.library_dir.display()
    );
    info!(
        "Cutter config: cmd={}, comskip={}, timeout={:?}, size_percentage={}, workers={}",
        worker_config.cmd.display(),
        worker_config.comskip_cmd.display(),
        worker_config.timeout,
        worker_config.size_threshold,
        worker_config.workers
    );

    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    let metrics_handle = if metrics_enabled {
        let handle = metrics::init_metrics().context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics enabled at /metrics");
        Some(handle)
    } else {
        None
    };

    let in_flight = InFlightSet::new();
    let (sender, receiver) = job_queue();
    let dispatcher = Dispatcher::new(&settings.api.library_dir, in_flight.clone(), sender);

    let workers = worker_config.workers;
    let executor = Arc::new(JobExecutor::new(worker_config));
    let pool = WorkerPool::spawn(workers, receiver, in_flight.clone(), executor);

    let state = AppState::new(api_config.clone(), dispatcher, pool.size());
    let app = create_router(state, metrics_handle);

    let listener = tokio::net::TcpListener::bind((api_config.host.as_str(), api_config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", api_config.host, api_config.port))?;

    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let interrupted = in_flight.len();
    if interrupted > 0 {
        info!("Stopping workers with {} job(s) in flight", interrupted);
    }
    pool.abort();

    info!("Server shutdown complete");
    Ok(())
}

fn open_log_file(path: &Path) -> anyhow::Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Console output (JSON when `LOG_FORMAT=json`) or the log file.
/// `RUST_LOG` overrides the configured level.
fn init_tracing(level: &str, log_file: Option<File>) {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,comcutter={level}")));

    let layer: BoxedLayer = match (use_json, log_file) {
        (true, Some(file)) => fmt::layer().json().with_writer(Mutex::new(file)).boxed(),
        (true, None) => fmt::layer().json().boxed(),
        (false, Some(file)) => fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .boxed(),
        (false, None) => fmt::layer()
            .with_ansi(true)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
    };

    tracing_subscriber::registry().with(layer).with(env_filter).init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Received shutdown signal");
}
