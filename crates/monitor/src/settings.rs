use crate::error::ConfigError;
use crate::source::RetryPolicy;
use config::{Config, Environment, File as ConfigFile, Map};
use finality_types::{CheckpointInterval, DEFAULT_CHECKPOINT_INTERVAL};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_NODE_URL: &str = "http://localhost:8689/";
/// One block interval on the monitored chain.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Environment variables with this prefix override file values,
/// e.g. `FINALITY_MONITOR_NODE_URL`.
pub const ENV_PREFIX: &str = "FINALITY_MONITOR";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
}

/// Values supplied on the command line. They take precedence over the
/// configuration file and the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub node_url: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub checkpoint_interval: Option<u32>,
    pub fetch_retries: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
    pub max_rounds: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub metrics_addr: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    node_url: String,
    poll_interval_secs: u64,
    request_timeout_secs: u64,
    checkpoint_interval: u32,
    fetch_retries: u32,
    retry_backoff_ms: u64,
    #[serde(default)]
    max_rounds: Option<u64>,
    log_level: String,
    log_format: LogFormat,
    #[serde(default)]
    metrics_addr: Option<SocketAddr>,
}

/// Fully validated runtime configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub node_url: Url,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub checkpoint_interval: CheckpointInterval,
    pub retry: RetryPolicy,
    /// Stop cleanly after this many rounds. `None` monitors forever.
    pub max_rounds: Option<u64>,
    pub log_level: String,
    pub log_format: LogFormat,
    pub metrics_addr: Option<SocketAddr>,
}

impl MonitorConfig {
    /// Load defaults, then the optional file, then `FINALITY_MONITOR_*`
    /// variables, then command-line overrides.
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::load_with_env(path, overrides, None)
    }

    /// Same as [`MonitorConfig::load`] but reads the environment layer from
    /// `env` when given instead of the process environment.
    pub fn load_with_env(
        path: Option<&Path>,
        overrides: ConfigOverrides,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("node_url", DEFAULT_NODE_URL)?
            .set_default("poll_interval_secs", DEFAULT_POLL_INTERVAL_SECS as i64)?
            .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS as i64)?
            .set_default("checkpoint_interval", DEFAULT_CHECKPOINT_INTERVAL as i64)?
            .set_default("fetch_retries", 0_i64)?
            .set_default("retry_backoff_ms", DEFAULT_RETRY_BACKOFF_MS as i64)?
            .set_default("log_level", "info")?
            .set_default("log_format", "pretty")?;

        if let Some(path) = path {
            builder = builder.add_source(ConfigFile::from(path).required(true));
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).source(env));

        let ConfigOverrides {
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
        } = overrides;

        builder = builder
            .set_override_option("node_url", node_url)?
            .set_override_option("poll_interval_secs", poll_interval_secs.map(|v| v.to_string()))?
            .set_override_option(
                "request_timeout_secs",
                request_timeout_secs.map(|v| v.to_string()),
            )?
            .set_override_option(
                "checkpoint_interval",
                checkpoint_interval.map(|v| v.to_string()),
            )?
            .set_override_option("fetch_retries", fetch_retries.map(|v| v.to_string()))?
            .set_override_option("retry_backoff_ms", retry_backoff_ms.map(|v| v.to_string()))?
            .set_override_option("max_rounds", max_rounds.map(|v| v.to_string()))?
            .set_override_option("log_level", log_level)?
            .set_override_option("log_format", log_format)?
            .set_override_option("metrics_addr", metrics_addr)?;

        let raw: RawConfig = builder.build()?.try_deserialize()?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let node_url = parse_node_url(&raw.node_url)?;

        if raw.poll_interval_secs == 0 {
            return Err(ConfigError::Zero("poll_interval_secs"));
        }
        if raw.request_timeout_secs == 0 {
            return Err(ConfigError::Zero("request_timeout_secs"));
        }
        let checkpoint_interval = CheckpointInterval::new(raw.checkpoint_interval)
            .ok_or(ConfigError::Zero("checkpoint_interval"))?;
        if raw.max_rounds == Some(0) {
            return Err(ConfigError::Zero("max_rounds"));
        }

        Ok(Self {
            node_url,
            poll_interval: Duration::from_secs(raw.poll_interval_secs),
            request_timeout: Duration::from_secs(raw.request_timeout_secs),
            checkpoint_interval,
            retry: RetryPolicy {
                retries: raw.fetch_retries,
                backoff: Duration::from_millis(raw.retry_backoff_ms),
            },
            max_rounds: raw.max_rounds,
            log_level: raw.log_level,
            log_format: raw.log_format,
            metrics_addr: raw.metrics_addr,
        })
    }
}

/// Parse the node address, making sure relative joins land under its path.
fn parse_node_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;
    if !url.path().ends_with('/') {
        let mut path = url.path().trim_end_matches('/').to_owned();
        path.push('/');
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn empty_env() -> Option<Map<String, String>> {
        Some(Map::new())
    }

    #[test]
    fn defaults_match_mainnet_parameters() {
        let config = MonitorConfig::load_with_env(None, ConfigOverrides::default(), empty_env())
            .expect("defaults load");
        assert_eq!(config.node_url.as_str(), DEFAULT_NODE_URL);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.checkpoint_interval.length(), 180);
        assert_eq!(config.retry.retries, 0);
        assert_eq!(config.max_rounds, None);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.metrics_addr.is_none());
    }

    #[test]
    fn file_env_and_overrides_layer_in_order() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("create temp config");
        writeln!(
            file,
            "node_url = \"http://10.0.0.5:8689\"\npoll_interval_secs = 5\ncheckpoint_interval = 60\nlog_format = \"compact\""
        )
        .expect("write config");

        let mut env = Map::new();
        env.insert(
            "FINALITY_MONITOR_POLL_INTERVAL_SECS".to_string(),
            "7".to_string(),
        );
        env.insert(
            "FINALITY_MONITOR_METRICS_ADDR".to_string(),
            "127.0.0.1:9100".to_string(),
        );

        let overrides = ConfigOverrides {
            checkpoint_interval: Some(90),
            max_rounds: Some(3),
            ..Default::default()
        };

        let config = MonitorConfig::load_with_env(Some(file.path()), overrides, Some(env))
            .expect("layered load");

        assert_eq!(config.node_url.as_str(), "http://10.0.0.5:8689/");
        assert_eq!(config.poll_interval, Duration::from_secs(7));
        assert_eq!(config.checkpoint_interval.length(), 90);
        assert_eq!(config.max_rounds, Some(3));
        assert_eq!(config.log_format, LogFormat::Compact);
        assert_eq!(
            config.metrics_addr,
            Some("127.0.0.1:9100".parse().unwrap())
        );
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = MonitorConfig::load_with_env(
            Some(Path::new("/nonexistent/finality-monitor.toml")),
            ConfigOverrides::default(),
            empty_env(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn zero_values_are_rejected() {
        let overrides = ConfigOverrides {
            checkpoint_interval: Some(0),
            ..Default::default()
        };
        let err = MonitorConfig::load_with_env(None, overrides, empty_env()).unwrap_err();
        assert!(matches!(err, ConfigError::Zero("checkpoint_interval")));

        let overrides = ConfigOverrides {
            poll_interval_secs: Some(0),
            ..Default::default()
        };
        let err = MonitorConfig::load_with_env(None, overrides, empty_env()).unwrap_err();
        assert!(matches!(err, ConfigError::Zero("poll_interval_secs")));
    }

    #[test]
    fn invalid_node_url_is_rejected() {
        let overrides = ConfigOverrides {
            node_url: Some("not a url".into()),
            ..Default::default()
        };
        let err = MonitorConfig::load_with_env(None, overrides, empty_env()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn node_url_gains_trailing_slash() {
        let url = parse_node_url("http://node.local:8689/api").unwrap();
        assert_eq!(url.as_str(), "http://node.local:8689/api/");
    }
}
