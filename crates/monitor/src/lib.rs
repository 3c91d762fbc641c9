//! Finality monitor for a BFT node.
//!
//! A [`Sampler`] polls the node's best, justified and finalized heights (plus
//! the block right after the finalized one) on a fixed period and hands each
//! [`Snapshot`] to a [`Checker`] over a depth-1 channel. The checker verifies
//! the checkpoint-consistency rules and the first violation ends the run.

pub mod checker;
pub mod settings;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod sampler;
pub mod source;
pub mod ticker;

pub use checker::{Checker, Violation};
pub use settings::{ConfigOverrides, LogFormat, MonitorConfig};
pub use error::{ConfigError, FetchError, MonitorError};
pub use monitor::{run, run_with_config};
pub use sampler::Sampler;
pub use source::{fetch_with_retry, BlockSource, HttpBlockSource, RetryPolicy};
pub use ticker::{IntervalTicker, Ticker};

pub use finality_types::{BlockRef, BlockSummary, CheckpointInterval, Snapshot};
