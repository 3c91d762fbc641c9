use anyhow::{Context, Result};
use clap::Parser;
use finality_monitor::{
    metrics as monitor_metrics, run_with_config, ConfigOverrides, LogFormat, MonitorConfig,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod version;

use version::{git_commit_hash, MONITOR_VERSION};

/// Exit status for configuration and startup failures.
const EXIT_STARTUP: i32 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "finality-monitor",
    version,
    about = "Watch a BFT node's best, justified and finalized heights and exit on the first checkpoint inconsistency"
)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Base URL of the node API (e.g. http://localhost:8689/)
    #[arg(long = "node", value_name = "URL")]
    node_url: Option<String>,

    /// Seconds between sampling rounds
    #[arg(long, value_name = "SECS")]
    poll_interval_secs: Option<u64>,

    /// Timeout (in seconds) for each HTTP request
    #[arg(long, value_name = "SECS")]
    request_timeout_secs: Option<u64>,

    /// Blocks between two BFT checkpoints
    #[arg(long, value_name = "BLOCKS")]
    checkpoint_interval: Option<u32>,

    /// Extra attempts for a failed block fetch before the round is marked incomplete
    #[arg(long)]
    fetch_retries: Option<u32>,

    /// Delay between fetch attempts, in milliseconds
    #[arg(long, value_name = "MS")]
    retry_backoff_ms: Option<u64>,

    /// Exit with status 0 after this many consistent rounds instead of running forever
    #[arg(long)]
    max_rounds: Option<u64>,

    /// Log filter used when RUST_LOG is unset (e.g. "info", "finality_monitor=debug")
    #[arg(long)]
    log_level: Option<String>,

    /// Log output style
    #[arg(long, value_parser = ["pretty", "compact"])]
    log_format: Option<String>,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9100)
    #[arg(long, value_name = "ADDR")]
    metrics_addr: Option<String>,
}

impl Cli {
    fn into_parts(self) -> (Option<PathBuf>, ConfigOverrides) {
        let Cli {
            config,
            node_url,
            poll_interval_secs,
            request_timeout_secs,
            checkpoint_interval,
            fetch_retries,
            retry_backoff_ms,
            max_rounds,
            log_level,
            log_format,
            metrics_addr,
        } = self;

        let overrides = ConfigOverrides {
            node_url,
            poll_interval_secs,
            request_timeout_secs,
            checkpoint_interval,
            fetch_retries,
            retry_backoff_ms,
            max_rounds,
            log_level,
            log_format,
            metrics_addr,
        };
        (config, overrides)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let (config_path, overrides) = Cli::parse().into_parts();

    let config = match MonitorConfig::load(config_path.as_deref(), overrides) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("finality-monitor: {err}");
            std::process::exit(EXIT_STARTUP);
        }
    };

    if let Err(err) = init_logging(&config) {
        eprintln!("finality-monitor: {err:#}");
        std::process::exit(EXIT_STARTUP);
    }
    init_metrics(&config);

    info!(
        version = MONITOR_VERSION,
        commit = git_commit_hash(),
        "starting finality monitor"
    );

    match run_with_config(&config).await {
        Ok(rounds) => {
            info!(rounds, "finality monitor finished");
            Ok(())
        }
        Err(err) => {
            let code = err.exit_code();
            error!(error = %err, exit_code = code, "finality monitor halted");
            std::process::exit(code);
        }
    }
}

fn init_logging(config: &MonitorConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("invalid log level {:?}", config.log_level))?;

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init()?,
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?,
    }

    Ok(())
}

fn init_metrics(config: &MonitorConfig) {
    let Some(addr) = config.metrics_addr else {
        info!("Prometheus metrics exporter disabled via configuration");
        return;
    };

    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            monitor_metrics::describe();
            info!(%addr, "Prometheus metrics exporter listening");
        }
        Err(err) => {
            warn!("Failed to install Prometheus metrics exporter: {}", err);
        }
    }
}
