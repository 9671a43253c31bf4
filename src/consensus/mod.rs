pub mod engine;
pub mod stats;

pub use engine::{Consensus, MineOutcome, meets_difficulty};
pub use stats::MiningStats;
