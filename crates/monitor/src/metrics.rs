//! Metric names and recording helpers. Nothing is exported unless the
//! binary installs a recorder.

use finality_types::Snapshot;
use metrics::{counter, describe_counter, describe_gauge, gauge};

pub const ROUNDS_TOTAL: &str = "finality_monitor_rounds_total";
pub const FETCH_ERRORS_TOTAL: &str = "finality_monitor_fetch_errors_total";
pub const VIOLATIONS_TOTAL: &str = "finality_monitor_violations_total";
pub const BEST_HEIGHT: &str = "finality_monitor_best_height";
pub const JUSTIFIED_HEIGHT: &str = "finality_monitor_justified_height";
pub const FINALIZED_HEIGHT: &str = "finality_monitor_finalized_height";

pub fn describe() {
    describe_counter!(ROUNDS_TOTAL, "Sampling rounds completed");
    describe_counter!(
        FETCH_ERRORS_TOTAL,
        "Block fetches that failed after all retries"
    );
    describe_counter!(VIOLATIONS_TOTAL, "Snapshots rejected by the checker");
    describe_gauge!(BEST_HEIGHT, "Chain head height in the latest round");
    describe_gauge!(JUSTIFIED_HEIGHT, "Justified height in the latest round");
    describe_gauge!(FINALIZED_HEIGHT, "Finalized height in the latest round");
}

pub(crate) fn record_round(snapshot: &Snapshot) {
    counter!(ROUNDS_TOTAL).increment(1);
    gauge!(BEST_HEIGHT).set(f64::from(snapshot.best));
    gauge!(JUSTIFIED_HEIGHT).set(f64::from(snapshot.justified));
    gauge!(FINALIZED_HEIGHT).set(f64::from(snapshot.finalized));
}

pub(crate) fn record_fetch_error() {
    counter!(FETCH_ERRORS_TOTAL).increment(1);
}

pub(crate) fn record_violation() {
    counter!(VIOLATIONS_TOTAL).increment(1);
}
