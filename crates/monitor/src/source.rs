use crate::error::FetchError;
use async_trait::async_trait;
use finality_types::{BlockRef, BlockSummary};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Read-only access to the node's block API.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn fetch(&self, block: BlockRef) -> Result<BlockSummary, FetchError>;
}

/// [`BlockSource`] backed by the node's HTTP API (`GET /blocks/{id}`).
#[derive(Clone)]
pub struct HttpBlockSource {
    base_url: Url,
    http: Client,
}

impl HttpBlockSource {
    /// Build a client whose every request fails after `timeout`.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_http_client(base_url, http))
    }

    pub fn with_http_client(mut base_url: Url, http: Client) -> Self {
        if !base_url.path().ends_with('/') {
            let mut path = base_url.path().trim_end_matches('/').to_owned();
            path.push('/');
            base_url.set_path(&path);
        }
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn block_url(&self, block: BlockRef) -> Result<Url, url::ParseError> {
        self.base_url
            .join(&format!("blocks/{}", block.path_segment()))
    }
}

#[async_trait]
impl BlockSource for HttpBlockSource {
    async fn fetch(&self, block: BlockRef) -> Result<BlockSummary, FetchError> {
        let url = self.block_url(block)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            debug!(%block, %status, body = %truncate(&body), "node rejected block request");
            return Err(FetchError::Status {
                status,
                body: truncate(&body),
            });
        }

        let bytes = response.bytes().await.map_err(FetchError::BodyRead)?;
        Ok(BlockSummary::from_json(&bytes)?)
    }
}

/// How often a failed fetch is re-attempted before it is recorded as an
/// error in the round's snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 0,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Fetch `block`, retrying per `policy`. Returns the last error when every
/// attempt fails.
pub async fn fetch_with_retry<S>(
    source: &S,
    block: BlockRef,
    policy: RetryPolicy,
) -> Result<BlockSummary, FetchError>
where
    S: BlockSource + ?Sized,
{
    let mut attempt = 0;
    loop {
        match source.fetch(block).await {
            Ok(summary) => return Ok(summary),
            Err(err) if attempt < policy.retries => {
                attempt += 1;
                warn!(
                    %block,
                    attempt,
                    retries = policy.retries,
                    error = %err,
                    "block fetch failed, retrying"
                );
                tokio::time::sleep(policy.backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}

fn truncate(text: &str) -> String {
    const LIMIT: usize = 120;
    match text.char_indices().nth(LIMIT) {
        None => text.to_string(),
        Some((end, _)) => format!("{}…", &text[..end]),
    }
}
