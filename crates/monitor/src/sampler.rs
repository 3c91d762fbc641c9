use crate::metrics;
use crate::source::{fetch_with_retry, BlockSource, RetryPolicy};
use crate::ticker::Ticker;
use finality_types::{BlockRef, BlockSummary, Snapshot};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Periodically samples the node and forwards one [`Snapshot`] per tick.
pub struct Sampler<S, T> {
    source: S,
    ticker: T,
    retry: RetryPolicy,
    max_rounds: Option<u64>,
}

impl<S, T> Sampler<S, T>
where
    S: BlockSource,
    T: Ticker,
{
    pub fn new(source: S, ticker: T) -> Self {
        Self {
            source,
            ticker,
            retry: RetryPolicy::default(),
            max_rounds: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Stop after `max_rounds` rounds instead of running forever.
    pub fn with_max_rounds(mut self, max_rounds: Option<u64>) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Run one round: best, justified, finalized, then the block right after
    /// finalized. A failed fetch leaves its field at zero and is recorded in
    /// the snapshot's errors; the remaining fetches still run.
    pub async fn sample_round(&self) -> Snapshot {
        sample(&self.source, self.retry).await
    }

    /// Sample on every tick and hand each snapshot to `snapshots`.
    ///
    /// The channel is expected to have capacity 1, so the sampler can never
    /// get more than one round ahead of the consumer. Returns when the
    /// consumer goes away or after `max_rounds` rounds.
    pub async fn run(self, snapshots: mpsc::Sender<Snapshot>) {
        let Self {
            source,
            mut ticker,
            retry,
            max_rounds,
        } = self;

        let mut rounds = 0u64;
        loop {
            if max_rounds.is_some_and(|max| rounds >= max) {
                info!(rounds, "sampler reached its round limit");
                return;
            }

            ticker.tick().await;
            let snapshot = sample(&source, retry).await;
            rounds += 1;
            metrics::record_round(&snapshot);
            debug!(round = rounds, %snapshot, "sampled node");

            if snapshots.send(snapshot).await.is_err() {
                debug!(rounds, "checker stopped, sampler exiting");
                return;
            }
        }
    }
}

async fn sample<S>(source: &S, retry: RetryPolicy) -> Snapshot
where
    S: BlockSource + ?Sized,
{
    let mut snapshot = Snapshot::default();

    let best = fetch_or_record(source, retry, BlockRef::Best, "best", &mut snapshot).await;
    snapshot.best = best.number;

    let justified =
        fetch_or_record(source, retry, BlockRef::Justified, "justified", &mut snapshot).await;
    snapshot.justified = justified.number;

    let finalized =
        fetch_or_record(source, retry, BlockRef::Finalized, "finalized", &mut snapshot).await;
    snapshot.finalized = finalized.number;

    let successor = BlockRef::Number(snapshot.finalized.saturating_add(1));
    snapshot.after_finalized =
        fetch_or_record(source, retry, successor, "after finalized", &mut snapshot).await;

    snapshot
}

async fn fetch_or_record<S>(
    source: &S,
    retry: RetryPolicy,
    block: BlockRef,
    label: &str,
    snapshot: &mut Snapshot,
) -> BlockSummary
where
    S: BlockSource + ?Sized,
{
    match fetch_with_retry(source, block, retry).await {
        Ok(summary) => summary,
        Err(err) => {
            warn!(%block, error = %err, "failed to fetch {label} block");
            metrics::record_fetch_error();
            snapshot.record_error(format!("error getting {label} block: {err}"));
            BlockSummary::default()
        }
    }
}
