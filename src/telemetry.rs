//! Telemetry sink for difficulty, mining statistics, mined and accepted blocks.
//!
//! Nothing in consensus or the ledger reads back from a sink, so a no-op sink
//! leaves behaviour unchanged.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::RwLock;

use crate::blockchain::Block;
use crate::consensus::MiningStats;

pub trait Telemetry: Send + Sync {
    fn difficulty_changed(&self, _difficulty: u32) {}

    fn mining_stats(&self, _stats: &MiningStats) {}

    fn block_mined(&self, _block: &Block) {}

    fn block_accepted(&self, _hash: &str, _block: &Block) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {}

/// Short description of a block for the dashboard feed.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BlockSummary {
    pub hash: String,
    pub id: u64,
    pub creator: String,
    pub transactions: usize,
    pub timestamp: Option<f64>,
}

impl BlockSummary {
    fn new(hash: &str, block: &Block) -> Self {
        Self {
            hash: hash.to_string(),
            id: block.id,
            creator: block.creator.clone(),
            transactions: block.transactions.len(),
            timestamp: block.timestamp,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardSnapshot {
    pub current_difficulty: Option<u32>,
    pub mining: MiningStats,
    pub accepted_blocks: u64,
    pub recent_blocks: Vec<BlockSummary>,
    /// Blocks sealed by the local miner, oldest first.
    pub mined_blocks: Vec<BlockSummary>,
}

#[derive(Debug, Default)]
struct DashboardState {
    current_difficulty: Option<u32>,
    mining: MiningStats,
    accepted_blocks: u64,
    recent: VecDeque<BlockSummary>,
    mined: VecDeque<BlockSummary>,
}

/// In-memory sink backing the `/stats/` endpoint.
#[derive(Debug)]
pub struct Dashboard {
    state: RwLock<DashboardState>,
    capacity: usize,
}

impl Dashboard {
    pub const DEFAULT_RECENT_BLOCKS: usize = 20;

    pub fn new(capacity: usize) -> Self {
        Self {
            state: RwLock::new(DashboardState::default()),
            capacity,
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let state = self.state.read().expect("rwlock poisoned");
        DashboardSnapshot {
            current_difficulty: state.current_difficulty,
            mining: state.mining.clone(),
            accepted_blocks: state.accepted_blocks,
            recent_blocks: state.recent.iter().cloned().collect(),
            mined_blocks: state.mined.iter().cloned().collect(),
        }
    }

    fn push_capped(&self, feed: &mut VecDeque<BlockSummary>, summary: BlockSummary) {
        if feed.len() == self.capacity {
            feed.pop_front();
        }
        feed.push_back(summary);
    }
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RECENT_BLOCKS)
    }
}

impl Telemetry for Dashboard {
    fn difficulty_changed(&self, difficulty: u32) {
        self.state.write().expect("rwlock poisoned").current_difficulty = Some(difficulty);
    }

    fn mining_stats(&self, stats: &MiningStats) {
        self.state.write().expect("rwlock poisoned").mining = stats.clone();
    }

    fn block_mined(&self, block: &Block) {
        let summary = BlockSummary::new(&block.compute_hash(), block);
        let mut state = self.state.write().expect("rwlock poisoned");
        self.push_capped(&mut state.mined, summary);
    }

    fn block_accepted(&self, hash: &str, block: &Block) {
        let mut state = self.state.write().expect("rwlock poisoned");
        state.accepted_blocks += 1;
        self.push_capped(&mut state.recent, BlockSummary::new(hash, block));
    }
}
