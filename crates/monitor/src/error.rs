use crate::checker::Violation;
use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single block fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("status code not 200: {status}")]
    Status { status: StatusCode, body: String },
    #[error("error reading response body: {0}")]
    BodyRead(#[source] reqwest::Error),
    #[error("unable to decode block summary: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Problems with the layered monitor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid node url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Terminal outcome of a monitor run that did not complete cleanly.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("checkpoint invariant violated: {0}")]
    Violation(#[from] Violation),
    #[error("sampler stopped while the monitor was expected to run forever")]
    SamplerStopped,
    #[error("sampler task failed: {0}")]
    SamplerTask(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl MonitorError {
    /// Process exit status for this failure: 1 for anything observed while
    /// monitoring, 2 for startup and configuration problems.
    pub fn exit_code(&self) -> i32 {
        match self {
            MonitorError::Violation(_)
            | MonitorError::SamplerStopped
            | MonitorError::SamplerTask(_) => 1,
            MonitorError::Config(_) | MonitorError::Client(_) => 2,
        }
    }
}
