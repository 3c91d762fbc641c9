use crate::block::{BlockNumber, BlockSummary};
use serde::Serialize;
use std::fmt;

/// Outcome of one sampling round, handed from the sampler to the checker.
///
/// Fields whose fetch failed keep their zero value and the failure is
/// recorded in `errors` instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub best: BlockNumber,
    pub justified: BlockNumber,
    pub finalized: BlockNumber,
    pub after_finalized: BlockSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl Snapshot {
    /// True when every fetch of the round succeeded.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Best: {}, Justified: {}, Finalized: {}, AfterFinalized: {{number: {}, finalized: {}}}, Errors: {:?}",
            self.best,
            self.justified,
            self.finalized,
            self.after_finalized.number,
            self.after_finalized.is_finalized,
            self.errors
        )
    }
}
