//! Node wiring: shared ledger, consensus engine, transaction pool and miner thread.

use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

use crate::blockchain::{Block, Blockchain};
use crate::config::NodeConfig;
use crate::consensus::{Consensus, MineOutcome};
use crate::error::LedgerError;
use crate::telemetry::Dashboard;
use crate::transaction::{PoolRejection, Transaction, TransactionSource, TxPool};

/// What one pass of the local miner ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningRound {
    /// Mined and admitted; carries the block hash.
    Accepted(String),
    /// Mined but refused by the ledger.
    Rejected,
    /// Cancelled because the canonical tip moved.
    Killed,
    /// Nothing to mine.
    Idle,
}

pub struct Node {
    pub blockchain: Arc<RwLock<Blockchain>>,
    pub consensus: Arc<Consensus>,
    pub txpool: Arc<TxPool>,
    pub dashboard: Arc<Dashboard>,
    config: NodeConfig,
    running: AtomicBool,
}

impl Node {
    pub fn new(config: NodeConfig) -> Self {
        let dashboard = Arc::new(Dashboard::default());
        let consensus = Arc::new(Consensus::new(
            config.chain.max_difficulty,
            dashboard.clone(),
        ));
        let txpool = Arc::new(TxPool::new());
        let blockchain = Blockchain::new(&config.chain, consensus.clone(), txpool.clone());
        Self {
            blockchain: Arc::new(RwLock::new(blockchain)),
            consensus,
            txpool,
            dashboard,
            config,
            running: AtomicBool::new(true),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn submit_transaction(&self, tx: Transaction) -> Result<(), PoolRejection> {
        self.txpool.add_transaction(tx)
    }

    /// Ingest a block mined elsewhere.
    pub fn receive_block(&self, block: Block) -> bool {
        let mut bc = self.blockchain.write().expect("rwlock poisoned");
        bc.add_block(block, true)
    }

    /// Assemble a candidate from the pool, mine it outside the ledger lock and
    /// submit it.
    pub fn mine_once(&self) -> Result<MiningRound, LedgerError> {
        let txs = self
            .txpool
            .transactions_for_block(self.config.chain.max_transactions_per_block);
        if txs.is_empty() && !self.config.mine_empty_blocks {
            return Ok(MiningRound::Idle);
        }

        let (mut block, window) = {
            let mut bc = self.blockchain.write().expect("rwlock poisoned");
            let block = bc.create_block(txs)?;
            let window = bc.compute_difficulty_window(&block.previous_hash)?;
            bc.begin_mining(&block.previous_hash);
            (block, window)
        };

        let outcome = self.consensus.mine(
            &mut block,
            window.latest_timestamp,
            window.earliest_timestamp,
            window.num_blocks,
            Some(window.difficulty),
        );

        let mut bc = self.blockchain.write().expect("rwlock poisoned");
        bc.end_mining();
        match outcome {
            MineOutcome::Killed => Ok(MiningRound::Killed),
            MineOutcome::Found => {
                let hash = block.compute_hash();
                if bc.add_block(block, true) {
                    Ok(MiningRound::Accepted(hash))
                } else {
                    Ok(MiningRound::Rejected)
                }
            }
        }
    }

    /// Run [`Node::mine_once`] in a loop on a dedicated thread until [`Node::stop`].
    pub fn spawn_miner(self: &Arc<Self>) -> std::io::Result<JoinHandle<()>> {
        let node = Arc::clone(self);
        thread::Builder::new()
            .name("miner".to_string())
            .spawn(move || {
                info!("miner: started");
                while node.running.load(Ordering::Acquire) {
                    match node.mine_once() {
                        Ok(MiningRound::Accepted(hash)) => debug!("miner: block {hash} accepted"),
                        Ok(MiningRound::Rejected) => warn!("miner: own block was rejected"),
                        Ok(MiningRound::Killed) => debug!("miner: restarting on new tip"),
                        Ok(MiningRound::Idle) => thread::sleep(node.config.mining_idle),
                        Err(e) => {
                            warn!("miner: {e}");
                            thread::sleep(node.config.mining_idle);
                        }
                    }
                }
                info!("miner: stopped");
            })
    }

    /// Stop the miner loop, interrupting an in-progress search.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        self.consensus.kill_mining();
    }

    /// Stop the miner and wait for its thread. Returns `false` if it panicked.
    pub fn shutdown(&self, miner: Option<JoinHandle<()>>) -> bool {
        self.stop();
        match miner.map(JoinHandle::join) {
            Some(Err(_)) => {
                error!("miner: thread panicked");
                false
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfig;
    use crate::transaction::model::tests::signed_tx;
    use std::time::{Duration, Instant};

    fn node_config(node_id: &str, mine_empty_blocks: bool) -> NodeConfig {
        NodeConfig {
            mine_empty_blocks,
            mining_idle: Duration::from_millis(5),
            chain: ChainConfig {
                node_id: node_id.to_string(),
                max_difficulty: 2,
                tolerance_value: 3,
                pruning_interval: Duration::from_secs(3600),
                min_blocks_for_difficulty: 4,
                max_transactions_per_block: 2,
            },
            ..NodeConfig::default()
        }
    }

    #[test]
    fn mines_pending_transactions() {
        let node = Node::new(node_config("n1", false));
        let tx = signed_tx("pay");
        node.submit_transaction(tx.clone()).unwrap();

        let MiningRound::Accepted(hash) = node.mine_once().unwrap() else {
            panic!("expected an accepted block");
        };
        let bc = node.blockchain.read().unwrap();
        assert_eq!(bc.tip_hash(), hash);
        assert_eq!(bc.tip().creator, "n1");
        let (found, block_hash) = bc.get_transaction(tx.transaction_hash().unwrap()).unwrap();
        assert_eq!(found, &tx);
        assert_eq!(block_hash, hash);
        assert!(node.txpool.is_empty());
        assert_eq!(node.consensus.stats().mined_blocks, 1);
        assert_eq!(node.dashboard.snapshot().accepted_blocks, 1);
    }

    #[test]
    fn respects_block_size() {
        let node = Node::new(node_config("n1", false));
        for i in 0..3 {
            node.submit_transaction(signed_tx(&format!("t{i}"))).unwrap();
        }
        node.mine_once().unwrap();
        assert_eq!(node.blockchain.read().unwrap().tip().transactions.len(), 2);
        assert_eq!(node.txpool.len(), 1);
    }

    #[test]
    fn idle_without_transactions() {
        let node = Node::new(node_config("n1", false));
        assert_eq!(node.mine_once().unwrap(), MiningRound::Idle);
        assert_eq!(node.blockchain.read().unwrap().len(), 1);
    }

    #[test]
    fn mines_empty_blocks_when_enabled() {
        let node = Node::new(node_config("n1", true));
        assert!(matches!(node.mine_once().unwrap(), MiningRound::Accepted(_)));
        assert_eq!(node.blockchain.read().unwrap().tip().id, 1);
    }

    #[test]
    fn peers_accept_each_others_blocks() {
        let a = Node::new(node_config("a", true));
        let b = Node::new(node_config("b", true));
        a.mine_once().unwrap();
        a.mine_once().unwrap();

        let blocks: Vec<Block> = a
            .blockchain
            .read()
            .unwrap()
            .get_block_range(0)
            .into_iter()
            .cloned()
            .collect();
        for block in blocks {
            assert!(b.receive_block(block));
        }
        assert_eq!(
            a.blockchain.read().unwrap().tip_hash(),
            b.blockchain.read().unwrap().tip_hash()
        );
    }

    #[test]
    fn concurrent_ingestion_keeps_ledger_consistent() {
        let node = Arc::new(Node::new(node_config("local", true)));
        let peers: Vec<Node> = (0..4)
            .map(|i| Node::new(node_config(&format!("peer{i}"), true)))
            .collect();
        let blocks: Vec<Block> = peers
            .iter()
            .map(|p| {
                p.mine_once().unwrap();
                p.blockchain.read().unwrap().tip().clone()
            })
            .collect();

        let handles: Vec<_> = blocks
            .into_iter()
            .map(|block| {
                let node = Arc::clone(&node);
                thread::spawn(move || node.receive_block(block))
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }

        let bc = node.blockchain.read().unwrap();
        assert_eq!(bc.len(), 5);
        assert_eq!(bc.leaves().len(), 4);
        assert_eq!(bc.tip().id, 1);
    }

    #[test]
    fn background_miner_extends_chain_until_stopped() {
        let node = Arc::new(Node::new(node_config("bg", true)));
        let handle = node.spawn_miner().unwrap();

        let deadline = Instant::now() + Duration::from_secs(30);
        while node.blockchain.read().unwrap().tip().id < 3 {
            assert!(Instant::now() < deadline, "miner made no progress");
            thread::sleep(Duration::from_millis(10));
        }
        assert!(node.shutdown(Some(handle)));

        let bc = node.blockchain.read().unwrap();
        assert!(bc.tip().id >= 3);
        assert_eq!(bc.canonical_chain().len() as u64, bc.tip().id + 1);
    }

    #[test]
    fn shutdown_reports_panicked_miner() {
        let node = Node::new(node_config("n1", true));
        let handle: JoinHandle<()> = thread::spawn(|| panic!("miner blew up"));
        assert!(!node.shutdown(Some(handle)));
        assert!(node.shutdown(None));
    }
}
