use serde::{Deserialize, Serialize};
use std::fmt;

/// Block height as reported by the node API.
pub type BlockNumber = u32;

/// Summary of a single block as returned by `/blocks/{id}`.
///
/// Only the fields the monitor inspects are decoded; anything else in the
/// payload is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub number: BlockNumber,
    #[serde(default)]
    pub is_finalized: bool,
}

impl BlockSummary {
    /// Decode a `/blocks/{id}` response body.
    ///
    /// The node answers `null` for a block it does not know yet (for example
    /// block 1 while the chain is still at genesis); that decodes to the zero
    /// summary rather than an error.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice::<Option<Self>>(bytes).map(Option::unwrap_or_default)
    }
}

/// Which block a request refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRef {
    Best,
    Justified,
    Finalized,
    Number(BlockNumber),
}

impl BlockRef {
    /// Path segment appended to `blocks/`.
    pub fn path_segment(&self) -> String {
        match self {
            BlockRef::Best => "best".to_string(),
            BlockRef::Justified => "justified".to_string(),
            BlockRef::Finalized => "finalized".to_string(),
            BlockRef::Number(number) => number.to_string(),
        }
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockRef::Best => f.write_str("best"),
            BlockRef::Justified => f.write_str("justified"),
            BlockRef::Finalized => f.write_str("finalized"),
            BlockRef::Number(number) => write!(f, "#{number}"),
        }
    }
}
