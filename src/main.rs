use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use throttle::config::{LogFormat, LoggingConfig, ThrottleConfig};
use throttle::http::HttpServer;
use throttle::ratelimit::{BucketTable, Evictor, RateLimiter};

/// Per-client fixed-window request throttle.
#[derive(Debug, Parser)]
#[command(name = "throttle", version, about)]
struct Cli {
    /// Path to a configuration file (YAML, TOML or JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Max admitted requests per window
    #[arg(long)]
    limit: Option<u64>,

    /// Window length in milliseconds
    #[arg(long)]
    window_ms: Option<u64>,

    /// Cadence of the eviction sweep in milliseconds
    #[arg(long)]
    eviction_interval_ms: Option<u64>,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Cli {
    fn apply(&self, config: &mut ThrottleConfig) {
        if let Some(addr) = self.listen {
            config.server.http_addr = addr;
        }
        if let Some(limit) = self.limit {
            config.rate_limiting.limit = limit;
        }
        if let Some(window_ms) = self.window_ms {
            config.rate_limiting.window_ms = window_ms;
        }
        if let Some(interval) = self.eviction_interval_ms {
            config.rate_limiting.eviction_interval_ms = interval;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ThrottleConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    init_tracing(&config.logging);

    info!("Starting Throttle Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        http_addr = %config.server.http_addr,
        limit = config.rate_limiting.limit,
        window_ms = config.rate_limiting.window_ms,
        "Configuration loaded"
    );

    let table = Arc::new(BucketTable::new());
    let rate_limiter = Arc::new(RateLimiter::with_table(
        config.rate_limiting.limit_config(),
        Arc::clone(&table),
    ));
    info!("Rate limiter initialized");

    // Without the sweep the bucket table grows for the life of the process.
    let evictor = Evictor::start(table, config.rate_limiting.eviction_policy())?;

    let server = HttpServer::new(config.server.http_addr, rate_limiter);
    let served = server.serve_with_shutdown(shutdown_signal()).await;

    if let Err(e) = evictor.shutdown().await {
        warn!(error = %e, "Evictor did not stop cleanly");
    }

    served?;
    info!("Throttle Service stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
