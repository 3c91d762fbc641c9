use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Drives the sampling schedule.
#[async_trait]
pub trait Ticker: Send {
    /// Wait until the next sampling round is due.
    async fn tick(&mut self);
}

/// Fixed-period ticker on tokio's clock. The first tick fires one full
/// period after construction; ticks missed while a round overran are
/// dropped rather than replayed.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}
