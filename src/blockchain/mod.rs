pub mod block;
pub mod fork;
pub mod merkle;
pub mod model;
pub mod query;

use chrono::Utc;

pub use block::Block;
pub use merkle::{EMPTY_MERKLE_ROOT, merkle_root};
pub use model::{Blockchain, DifficultyWindow};

/// Predecessor hash carried by the genesis block.
pub const GENESIS_PREDECESSOR: &str = "";

/// Creator id of the genesis block.
pub const GENESIS_CREATOR: &str = "genesis";

/// Fixed genesis timestamp (Unix seconds) so every node derives the same genesis.
pub const GENESIS_TIMESTAMP: f64 = 1_700_000_000.0;

/// Current Unix time in seconds with microsecond precision.
pub fn unix_time() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
