use log::{debug, info};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::stats::MiningStats;
use crate::blockchain::{Block, unix_time};
use crate::telemetry::Telemetry;

/// Result of a single mining call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MineOutcome {
    /// A nonce satisfying the difficulty was found and the block stamped.
    Found,
    /// The search was cancelled; the block is untouched.
    Killed,
}

/// True iff the first `difficulty` hex characters of `hash` are all `'0'`.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let d = difficulty as usize;
    hash.len() >= d && hash.as_bytes()[..d].iter().all(|&c| c == b'0')
}

/// Proof-of-Work engine: difficulty retargeting, validation and mining.
///
/// Shared between the miner thread and the ledger. Validation never touches
/// the mining state, so it is safe to call while a mine is in progress.
pub struct Consensus {
    max_difficulty: u32,
    kill_mine: AtomicBool,
    stats: Mutex<MiningStats>,
    telemetry: Arc<dyn Telemetry>,
}

impl Consensus {
    const PROGRESS_LOG_INTERVAL: u64 = 10_000;

    pub fn new(max_difficulty: u32, telemetry: Arc<dyn Telemetry>) -> Self {
        assert!(max_difficulty >= 1, "max difficulty must be at least 1");
        Self {
            max_difficulty,
            kill_mine: AtomicBool::new(false),
            stats: Mutex::new(MiningStats::default()),
            telemetry,
        }
    }

    pub fn max_difficulty(&self) -> u32 {
        self.max_difficulty
    }

    pub fn telemetry(&self) -> &Arc<dyn Telemetry> {
        &self.telemetry
    }

    /// Difficulty for a window of `num_blocks` blocks spanning
    /// `earliest_timestamp..=latest_timestamp` (Unix seconds).
    ///
    /// The average block interval in whole seconds is subtracted from
    /// `max_difficulty`, clamped so the result stays in `1..=max_difficulty`.
    pub fn compute_difficulty(
        &self,
        latest_timestamp: f64,
        earliest_timestamp: f64,
        num_blocks: usize,
    ) -> u32 {
        assert!(num_blocks > 0, "difficulty window must contain at least one block");
        let avg = ((latest_timestamp - earliest_timestamp) / num_blocks as f64).floor();
        let raw = if avg.is_nan() || avg <= 0.0 {
            0
        } else if avg >= f64::from(self.max_difficulty) {
            self.max_difficulty - 1
        } else {
            avg as u32
        };
        let difficulty = self.max_difficulty - raw;
        self.telemetry.difficulty_changed(difficulty);
        difficulty
    }

    /// Check the block's header hash against the difficulty of its window.
    pub fn validate(
        &self,
        block: &Block,
        latest_timestamp: f64,
        earliest_timestamp: f64,
        num_blocks: usize,
    ) -> bool {
        let difficulty = self.compute_difficulty(latest_timestamp, earliest_timestamp, num_blocks);
        let hash = block.compute_hash();
        let ok = meets_difficulty(&hash, difficulty);
        debug!(
            "consensus: block {} validated with result {} (difficulty {}, hash {})",
            block.id, ok, difficulty, hash
        );
        ok
    }

    /// Search for a nonce meeting the window's difficulty, or `difficulty_override`
    /// when the caller already derived it for this position.
    ///
    /// The nonce and timestamp are written only on success. A pending kill signal
    /// is consumed by the search that observes it.
    pub fn mine(
        &self,
        block: &mut Block,
        latest_timestamp: f64,
        earliest_timestamp: f64,
        num_blocks: usize,
        difficulty_override: Option<u32>,
    ) -> MineOutcome {
        let difficulty = difficulty_override.unwrap_or_else(|| {
            self.compute_difficulty(latest_timestamp, earliest_timestamp, num_blocks)
        });
        debug!("consensus: mining block {} at difficulty {}", block.id, difficulty);

        let start = Instant::now();
        let mut nonce: u64 = rand::thread_rng().gen_range(1..=i64::MAX as u64);
        let mut attempts: u64 = 0;
        loop {
            if self.kill_mine.load(Ordering::Acquire) && self.kill_mine.swap(false, Ordering::AcqRel)
            {
                info!("consensus: mining of block {} was killed", block.id);
                return MineOutcome::Killed;
            }
            if meets_difficulty(&block.hash_with_nonce(nonce), difficulty) {
                break;
            }
            nonce = nonce.wrapping_add(1);
            attempts += 1;
            if attempts % Self::PROGRESS_LOG_INTERVAL == 0 {
                debug!("consensus: block {} still mining after {} attempts", block.id, attempts);
            }
        }

        block.nonce = Some(nonce);
        block.timestamp = Some(unix_time());
        let elapsed = start.elapsed().as_secs_f64();

        let snapshot = {
            let mut stats = self.stats.lock().expect("mutex poisoned");
            stats.record(elapsed, block.transactions.len());
            stats.clone()
        };
        self.telemetry.mining_stats(&snapshot);
        self.telemetry.block_mined(block);
        info!(
            "consensus: mined block {} in {:.3}s after {} attempts",
            block.id, elapsed, attempts
        );
        MineOutcome::Found
    }

    /// Ask an in-progress (or the next) mine to stop.
    pub fn kill_mining(&self) {
        self.kill_mine.store(true, Ordering::Release);
    }

    pub(crate) fn clear_kill(&self) {
        self.kill_mine.store(false, Ordering::Release);
    }

    pub fn stats(&self) -> MiningStats {
        self.stats.lock().expect("mutex poisoned").clone()
    }
}
