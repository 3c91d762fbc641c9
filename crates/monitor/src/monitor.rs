use crate::checker::Checker;
use crate::error::MonitorError;
use crate::sampler::Sampler;
use crate::settings::MonitorConfig;
use crate::source::{BlockSource, HttpBlockSource};
use crate::ticker::{IntervalTicker, Ticker};
use finality_types::Snapshot;
use tokio::sync::mpsc;
use tracing::info;

/// Run the sampler against `source` and check every snapshot it produces.
///
/// The sampler runs on its own task; checking happens on the caller's task.
/// The first violation aborts the sampler and is returned. `Ok` carries the
/// number of rounds checked and is only possible when `config.max_rounds`
/// bounds the run.
pub async fn run<S, T>(source: S, ticker: T, config: &MonitorConfig) -> Result<u64, MonitorError>
where
    S: BlockSource + 'static,
    T: Ticker + 'static,
{
    let (snapshots_tx, snapshots_rx) = mpsc::channel::<Snapshot>(1);

    let sampler = Sampler::new(source, ticker)
        .with_retry(config.retry)
        .with_max_rounds(config.max_rounds);
    let sampler_task = tokio::spawn(sampler.run(snapshots_tx));

    let checker = Checker::new(config.checkpoint_interval);
    match checker.run(snapshots_rx).await {
        Err(violation) => {
            sampler_task.abort();
            Err(MonitorError::Violation(violation))
        }
        Ok(rounds) => {
            sampler_task.await?;
            if config.max_rounds.is_none() {
                return Err(MonitorError::SamplerStopped);
            }
            Ok(rounds)
        }
    }
}

/// Monitor the node at `config.node_url` over HTTP on a fixed period.
pub async fn run_with_config(config: &MonitorConfig) -> Result<u64, MonitorError> {
    let source = HttpBlockSource::new(config.node_url.clone(), config.request_timeout)?;
    let ticker = IntervalTicker::new(config.poll_interval);
    info!(
        node = %source.base_url(),
        period = ?config.poll_interval,
        timeout = ?config.request_timeout,
        checkpoint_interval = %config.checkpoint_interval,
        "monitoring finality"
    );
    run(source, ticker, config).await
}
