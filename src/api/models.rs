use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::blockchain::Block;
use crate::node::Node;
use crate::telemetry::DashboardSnapshot;
use crate::transaction::Transaction;

/// Shared application state: the node owning ledger, pool and miner.
pub struct AppState {
    pub node: Arc<Node>,
}

impl AppState {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }
}

/* ---------- Block API Models ---------- */

#[derive(Serialize, Deserialize)]
pub struct BlockResponse {
    pub hash: String,
    pub block: Block,
}

impl From<&Block> for BlockResponse {
    fn from(block: &Block) -> Self {
        Self {
            hash: block.compute_hash(),
            block: block.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct SubmitBlockResponse {
    pub accepted: bool,
    pub hash: String,
}

/* ---------- TX API Models ---------- */

#[derive(Serialize, Deserialize)]
pub struct NewTxResponse {
    pub transaction_hash: String,
}

#[derive(Serialize, Deserialize)]
pub struct TransactionLookupResponse {
    pub transaction: Transaction,
    pub block_hash: String,
}

#[derive(Serialize, Deserialize)]
pub struct PendingResponse {
    pub size: usize,
    pub transactions: Vec<String>, // hashes only
}

/* ---------- Stats / Wallet Models ---------- */

#[derive(Serialize)]
pub struct StatsResponse {
    pub height: u64,
    pub tip_hash: String,
    pub stored_blocks: usize,
    pub next_difficulty: Option<u32>,
    pub max_difficulty: u32,
    pub pending_transactions: usize,
    pub dashboard: DashboardSnapshot,
}

#[derive(Serialize, Deserialize)]
pub struct NewWalletResponse {
    pub private_key: String,
    pub public_key: String,
}
