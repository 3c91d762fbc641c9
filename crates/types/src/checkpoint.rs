use crate::block::BlockNumber;
use std::fmt;
use std::ops::Range;

/// Number of blocks between two BFT checkpoints on mainnet.
pub const DEFAULT_CHECKPOINT_INTERVAL: u32 = 180;

/// Length of a finality checkpoint epoch, in blocks.
///
/// Derived bounds are returned as `u64` so that `3C - 1` cannot overflow for
/// any non-zero `u32` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CheckpointInterval(u32);

impl CheckpointInterval {
    /// Returns `None` for a zero-length interval.
    pub fn new(length: u32) -> Option<Self> {
        (length > 0).then_some(Self(length))
    }

    pub fn length(&self) -> u32 {
        self.0
    }

    /// First head height at which justified/finalized must be non-zero (`2C - 1`).
    pub fn steady_phase_start(&self) -> u64 {
        2 * u64::from(self.0) - 1
    }

    /// Allowed `best - justified` distance in steady phase: `[C - 1, 2C - 1)`.
    pub fn justified_lead(&self) -> Range<u64> {
        let c = u64::from(self.0);
        (c - 1)..(2 * c - 1)
    }

    /// Allowed `best - finalized` distance in steady phase: `[2C - 1, 3C - 1)`.
    pub fn finalized_lead(&self) -> Range<u64> {
        let c = u64::from(self.0);
        (2 * c - 1)..(3 * c - 1)
    }

    /// Checkpoint block that opens the epoch containing `number`.
    pub fn checkpoint_of(&self, number: BlockNumber) -> BlockNumber {
        number / self.0 * self.0
    }

    pub fn is_checkpoint(&self, number: BlockNumber) -> bool {
        self.checkpoint_of(number) == number
    }

    /// Last block of the epoch containing `number`, where the round quality
    /// is stored.
    pub fn store_point(&self, number: BlockNumber) -> BlockNumber {
        self.checkpoint_of(number).saturating_add(self.0 - 1)
    }
}

impl Default for CheckpointInterval {
    fn default() -> Self {
        Self(DEFAULT_CHECKPOINT_INTERVAL)
    }
}

impl fmt::Display for CheckpointInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} blocks", self.0)
    }
}
