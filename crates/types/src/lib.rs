pub mod block;
pub mod checkpoint;
pub mod snapshot;

pub use block::*;
pub use checkpoint::*;
pub use snapshot::*;
