use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::Block;
use crate::config::ChainConfig;
use crate::consensus::Consensus;
use crate::error::LedgerError;
use crate::transaction::{Transaction, TransactionSource};

/// Inputs and result of a difficulty computation for one chain position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyWindow {
    pub latest_timestamp: f64,
    pub earliest_timestamp: f64,
    pub num_blocks: usize,
    pub difficulty: u32,
}

/// In-memory block tree with fork-choice and pruning.
///
/// Every known block, on every branch, is keyed by its header hash. Each block
/// points to its parent by hash; depths and leaves are derived on demand. The
/// canonical branch is the path from genesis to `tip_hash`.
///
/// The struct is not internally synchronised. The node wraps it in a `RwLock`
/// so mutations are serialised and a branch switch is atomic to readers.
pub struct Blockchain {
    pub(super) blocks: HashMap<String, Block>,
    pub(super) genesis_hash: String,
    pub(super) tip_hash: String,
    node_id: String,
    pub(super) tolerance_value: u64,
    pruning_interval: Duration,
    min_blocks_for_difficulty: usize,
    last_prune: Instant,
    /// Predecessor of the block the local miner is working on, if any.
    active_mining: Option<String>,
    consensus: Arc<Consensus>,
    txpool: Arc<dyn TransactionSource>,
}

impl Blockchain {
    /// Initialize a new ledger holding only the genesis block.
    pub fn new(
        config: &ChainConfig,
        consensus: Arc<Consensus>,
        txpool: Arc<dyn TransactionSource>,
    ) -> Self {
        assert!(
            config.min_blocks_for_difficulty > 0,
            "difficulty window must contain at least one block"
        );
        let genesis = Block::genesis();
        let genesis_hash = genesis.compute_hash();
        let mut blocks = HashMap::new();
        blocks.insert(genesis_hash.clone(), genesis);
        Self {
            blocks,
            tip_hash: genesis_hash.clone(),
            genesis_hash,
            node_id: config.node_id.clone(),
            tolerance_value: config.tolerance_value,
            pruning_interval: config.pruning_interval,
            min_blocks_for_difficulty: config.min_blocks_for_difficulty,
            last_prune: Instant::now(),
            active_mining: None,
            consensus,
            txpool,
        }
    }

    pub fn consensus(&self) -> &Arc<Consensus> {
        &self.consensus
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Assemble a candidate on top of the canonical tip. Does not touch the ledger.
    pub fn create_block(&self, transactions: Vec<Transaction>) -> Result<Block, LedgerError> {
        let tip = self.tip();
        Ok(Block::new(
            tip.id + 1,
            self.tip_hash.clone(),
            self.node_id.clone(),
            transactions,
        )?)
    }

    /// Difficulty window for a block whose parent is `predecessor_hash`.
    ///
    /// Collects the predecessor and up to `min_blocks_for_difficulty - 1` of its
    /// ancestors; near genesis the window is simply shorter.
    pub fn compute_difficulty_window(
        &self,
        predecessor_hash: &str,
    ) -> Result<DifficultyWindow, LedgerError> {
        let mut current = self
            .blocks
            .get(predecessor_hash)
            .ok_or_else(|| LedgerError::UnknownPredecessor(predecessor_hash.to_string()))?;

        let first = current.timestamp.unwrap_or_default();
        let (mut latest, mut earliest) = (first, first);
        let mut num_blocks = 1;
        while num_blocks < self.min_blocks_for_difficulty && !current.is_genesis() {
            let Some(parent) = self.blocks.get(&current.previous_hash) else {
                break;
            };
            let ts = parent.timestamp.unwrap_or_default();
            latest = latest.max(ts);
            earliest = earliest.min(ts);
            num_blocks += 1;
            current = parent;
        }

        let difficulty = self
            .consensus
            .compute_difficulty(latest, earliest, num_blocks);
        Ok(DifficultyWindow {
            latest_timestamp: latest,
            earliest_timestamp: earliest,
            num_blocks,
            difficulty,
        })
    }

    /// Validate and store a block. Returns whether it was accepted.
    ///
    /// With `run_fork_choice` the canonical branch is re-evaluated and a prune
    /// pass runs if the pruning interval has elapsed. Otherwise the block is only
    /// stored.
    pub fn add_block(&mut self, block: Block, run_fork_choice: bool) -> bool {
        let hash = block.compute_hash();
        if self.blocks.contains_key(&hash) {
            debug!("ledger: block {hash} already known");
            return false;
        }
        let Some(parent) = self.blocks.get(&block.previous_hash) else {
            warn!(
                "ledger: orphan block {} (unknown predecessor {})",
                block.id, block.previous_hash
            );
            return false;
        };
        if block.id != parent.id + 1 {
            warn!(
                "ledger: block {hash} has id {} but its parent has id {}",
                block.id, parent.id
            );
            return false;
        }
        if block.timestamp.is_none() || block.nonce.is_none() {
            warn!("ledger: block {hash} was never mined");
            return false;
        }
        if !block.has_valid_merkle_root() {
            warn!("ledger: block {hash} has a mismatched merkle root");
            return false;
        }
        if !block.transactions.iter().all(Transaction::is_valid) {
            warn!("ledger: block {hash} carries an invalid transaction");
            return false;
        }
        let mut tx_hashes = HashSet::new();
        if !block
            .transactions
            .iter()
            .filter_map(Transaction::transaction_hash)
            .all(|h| tx_hashes.insert(h))
        {
            warn!("ledger: block {hash} repeats a transaction");
            return false;
        }
        if let Some(replayed) = self.find_on_branch(&block.previous_hash, &tx_hashes) {
            warn!("ledger: block {hash} replays transaction {replayed} already on its branch");
            return false;
        }

        let window = match self.compute_difficulty_window(&block.previous_hash) {
            Ok(w) => w,
            Err(e) => {
                warn!("ledger: {e}");
                return false;
            }
        };
        if !self.consensus.validate(
            &block,
            window.latest_timestamp,
            window.earliest_timestamp,
            window.num_blocks,
        ) {
            warn!(
                "ledger: block {hash} does not meet difficulty {}",
                window.difficulty
            );
            return false;
        }

        self.consensus.telemetry().block_accepted(&hash, &block);
        info!(
            "ledger: accepted block {} ({hash}) with {} transactions",
            block.id,
            block.transactions.len()
        );
        self.blocks.insert(hash, block);

        if run_fork_choice {
            self.switch_to_longest_branch();
            self.prune_if_due();
        }
        true
    }

    /// Move the canonical tip, report newly canonical transactions as confirmed,
    /// and stop a local mine that no longer builds on the tip.
    pub(super) fn set_tip(&mut self, new_tip: String) {
        let old_canonical: HashSet<&str> = self.ancestors(&self.tip_hash);
        let mut joined = Vec::new();
        let mut cursor = new_tip.as_str();
        while !old_canonical.contains(cursor) {
            let Some(block) = self.blocks.get(cursor) else {
                break;
            };
            joined.push(block);
            cursor = block.previous_hash.as_str();
        }
        let confirmed: Vec<Transaction> = joined
            .iter()
            .rev()
            .flat_map(|b| b.transactions.iter().cloned())
            .collect();

        self.tip_hash = new_tip;
        if !confirmed.is_empty() {
            self.txpool.mark_confirmed(&confirmed);
        }
        if let Some(active) = &self.active_mining {
            if *active != self.tip_hash {
                debug!("ledger: canonical tip moved, stopping local mine on {active}");
                self.consensus.kill_mining();
            }
        }
    }

    /// Hashes on the path from `hash` back to genesis, inclusive.
    pub(super) fn ancestors(&self, hash: &str) -> HashSet<&str> {
        let mut out = HashSet::new();
        let mut cursor = self.blocks.get_key_value(hash);
        while let Some((h, block)) = cursor {
            out.insert(h.as_str());
            cursor = self.blocks.get_key_value(&block.previous_hash);
        }
        out
    }

    /// First of `tx_hashes` found in a block on the path from `hash` back to genesis.
    fn find_on_branch(&self, hash: &str, tx_hashes: &HashSet<&str>) -> Option<String> {
        let mut cursor = self.blocks.get(hash);
        while let Some(block) = cursor {
            if let Some(found) = block
                .transactions
                .iter()
                .filter_map(Transaction::transaction_hash)
                .find(|h| tx_hashes.contains(h))
            {
                return Some(found.to_string());
            }
            cursor = self.blocks.get(&block.previous_hash);
        }
        None
    }

    /// Record that the local miner is building on `predecessor_hash`.
    pub fn begin_mining(&mut self, predecessor_hash: &str) {
        self.active_mining = Some(predecessor_hash.to_string());
    }

    /// Clear the active mine and any kill signal raised for it.
    pub fn end_mining(&mut self) {
        self.active_mining = None;
        self.consensus.clear_kill();
    }

    /// Run a prune pass if the pruning interval has elapsed since the last one.
    pub fn prune_if_due(&mut self) -> usize {
        if self.last_prune.elapsed() < self.pruning_interval {
            return 0;
        }
        self.last_prune = Instant::now();
        self.prune()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::blockchain::{GENESIS_TIMESTAMP, merkle_root};
    use crate::consensus::{MineOutcome, meets_difficulty};
    use crate::telemetry::NoopTelemetry;
    use crate::transaction::{PoolRejection, TxPool};
    use crate::transaction::model::tests::signed_tx;

    pub(crate) fn config(tolerance: u64) -> ChainConfig {
        ChainConfig {
            node_id: "test-node".into(),
            max_difficulty: 2,
            tolerance_value: tolerance,
            pruning_interval: Duration::from_secs(3600),
            min_blocks_for_difficulty: 3,
            max_transactions_per_block: 8,
        }
    }

    pub(crate) fn ledger_with_pool(tolerance: u64, pool: Arc<TxPool>) -> Blockchain {
        let consensus = Arc::new(Consensus::new(2, Arc::new(NoopTelemetry)));
        Blockchain::new(&config(tolerance), consensus, pool)
    }

    pub(crate) fn ledger(tolerance: u64) -> Blockchain {
        ledger_with_pool(tolerance, Arc::new(TxPool::new()))
    }

    /// Mine a block on `predecessor` with the difficulty its window requires.
    pub(crate) fn mine_on(
        bc: &Blockchain,
        predecessor: &str,
        creator: &str,
        txs: Vec<Transaction>,
    ) -> Block {
        let parent_id = bc.get_block_by_hash(predecessor).expect("parent").id;
        let w = bc.compute_difficulty_window(predecessor).unwrap();
        let mut block =
            Block::new(parent_id + 1, predecessor.to_string(), creator.to_string(), txs).unwrap();
        let outcome = bc.consensus().mine(
            &mut block,
            w.latest_timestamp,
            w.earliest_timestamp,
            w.num_blocks,
            Some(w.difficulty),
        );
        assert_eq!(outcome, MineOutcome::Found);
        block
    }

    /// Mine and add a block on `predecessor`, returning its hash.
    pub(crate) fn extend(
        bc: &mut Blockchain,
        predecessor: &str,
        creator: &str,
        txs: Vec<Transaction>,
        fork_choice: bool,
    ) -> String {
        let block = mine_on(bc, predecessor, creator, txs);
        let hash = block.compute_hash();
        assert!(bc.add_block(block, fork_choice));
        hash
    }

    #[test]
    fn new_ledger_holds_only_genesis() {
        let bc = ledger(2);
        assert_eq!(bc.len(), 1);
        assert_eq!(bc.tip_hash(), bc.genesis_hash());
        assert_eq!(bc.tip().id, 0);
    }

    #[test]
    fn create_block_builds_on_tip_without_mutation() {
        let bc = ledger(2);
        let txs = vec![signed_tx("a"), signed_tx("b")];
        let b = bc.create_block(txs.clone()).unwrap();
        assert_eq!(b.id, 1);
        assert_eq!(b.previous_hash, bc.genesis_hash());
        assert_eq!(b.creator, "test-node");
        assert_eq!(b.merkle_root, merkle_root(&txs).unwrap());
        assert_eq!(b.nonce, None);
        assert_eq!(b.timestamp, None);
        assert_eq!(bc.len(), 1);
    }

    #[test]
    fn create_block_rejects_unsigned_transactions() {
        let bc = ledger(2);
        let unsigned = Transaction::new("a".into(), "b".into(), "c".into());
        assert!(matches!(
            bc.create_block(vec![unsigned]),
            Err(LedgerError::Transaction(_))
        ));
    }

    #[test]
    fn window_shrinks_near_genesis() {
        let bc = ledger(2);
        let w = bc.compute_difficulty_window(bc.genesis_hash()).unwrap();
        assert_eq!(w.num_blocks, 1);
        assert_eq!(w.latest_timestamp, GENESIS_TIMESTAMP);
        assert_eq!(w.earliest_timestamp, GENESIS_TIMESTAMP);
        assert_eq!(w.difficulty, 2);
    }

    #[test]
    fn window_is_capped_at_configured_size() {
        let mut bc = ledger(2);
        let mut tip = bc.genesis_hash().to_string();
        for i in 0..4 {
            tip = extend(&mut bc, &tip, &format!("c{i}"), vec![], true);
        }
        let w = bc.compute_difficulty_window(&tip).unwrap();
        assert_eq!(w.num_blocks, 3);
        assert!(w.earliest_timestamp > GENESIS_TIMESTAMP);
        assert!(w.latest_timestamp >= w.earliest_timestamp);
    }

    #[test]
    fn window_for_unknown_predecessor_is_an_error() {
        let bc = ledger(2);
        assert_eq!(
            bc.compute_difficulty_window("missing"),
            Err(LedgerError::UnknownPredecessor("missing".into()))
        );
    }

    #[test]
    fn orphan_is_rejected() {
        let mut bc = ledger(2);
        let mut b = mine_on(&bc, &bc.genesis_hash().to_string(), "x", vec![]);
        b.previous_hash = "nowhere".into();
        assert!(!bc.add_block(b, true));
        assert_eq!(bc.len(), 1);
    }

    #[test]
    fn duplicate_is_rejected() {
        let mut bc = ledger(2);
        let genesis = bc.genesis_hash().to_string();
        let b = mine_on(&bc, &genesis, "x", vec![]);
        assert!(bc.add_block(b.clone(), true));
        assert!(!bc.add_block(b, true));
        assert_eq!(bc.len(), 2);
    }

    #[test]
    fn unmined_block_is_rejected() {
        let mut bc = ledger(2);
        let b = bc.create_block(vec![]).unwrap();
        assert!(!bc.add_block(b, true));
    }

    #[test]
    fn wrong_id_is_rejected() {
        let mut bc = ledger(2);
        let genesis = bc.genesis_hash().to_string();
        let w = bc.compute_difficulty_window(&genesis).unwrap();
        let mut b = Block::new(7, genesis, "x".into(), vec![]).unwrap();
        bc.consensus().mine(&mut b, 0.0, 0.0, 1, Some(w.difficulty));
        assert!(!bc.add_block(b, true));
    }

    #[test]
    fn mismatched_merkle_root_is_rejected() {
        let mut bc = ledger(2);
        let genesis = bc.genesis_hash().to_string();
        let mut b = mine_on(&bc, &genesis, "x", vec![signed_tx("a")]);
        b.transactions.push(signed_tx("smuggled"));
        assert!(!bc.add_block(b, true));
    }

    #[test]
    fn invalid_transaction_is_rejected() {
        let mut bc = ledger(2);
        let genesis = bc.genesis_hash().to_string();
        let good = signed_tx("a");
        let forged = Transaction::from_parts(
            good.sender.clone(),
            good.receiver.clone(),
            "forged".into(),
            good.signature().unwrap().to_string(),
            good.transaction_hash().unwrap().to_string(),
        );
        let b = mine_on(&bc, &genesis, "x", vec![forged]);
        assert!(!bc.add_block(b, true));
    }

    #[test]
    fn transaction_repeated_within_block_is_rejected() {
        let mut bc = ledger(2);
        let genesis = bc.genesis_hash().to_string();
        let tx = signed_tx("twice");
        let b = mine_on(&bc, &genesis, "x", vec![tx.clone(), tx]);
        assert!(!bc.add_block(b, true));
        assert_eq!(bc.len(), 1);
    }

    #[test]
    fn confirmed_transaction_cannot_be_replayed() {
        let pool = Arc::new(TxPool::new());
        let mut bc = ledger_with_pool(2, pool.clone());
        let genesis = bc.genesis_hash().to_string();
        let tx = signed_tx("pay");
        let hash = tx.transaction_hash().unwrap().to_string();
        let h1 = extend(&mut bc, &genesis, "x", vec![tx.clone()], true);
        let h2 = extend(&mut bc, &h1, "x", vec![], true);

        assert_eq!(
            pool.add_transaction(tx.clone()),
            Err(PoolRejection::AlreadyConfirmed)
        );
        // deeper on the same branch
        let replay = mine_on(&bc, &h2, "x", vec![tx.clone()]);
        assert!(!bc.add_block(replay, true));
        assert_eq!(bc.tip_hash(), h2);
        assert_eq!(bc.get_transaction(&hash).unwrap().1, h1);
        let on_chain = bc
            .canonical_chain()
            .iter()
            .flat_map(|b| &b.transactions)
            .filter(|t| t.transaction_hash() == Some(hash.as_str()))
            .count();
        assert_eq!(on_chain, 1);

        // a competing branch that does not contain it may still carry it
        let fork = mine_on(&bc, &genesis, "y", vec![tx]);
        assert!(bc.add_block(fork, true));
    }

    #[test]
    fn insufficient_work_is_rejected() {
        let mut bc = ledger(2);
        let genesis = bc.genesis_hash().to_string();
        let mut b = mine_on(&bc, &genesis, "x", vec![]);
        let mut nonce = b.nonce.unwrap().wrapping_add(1);
        while meets_difficulty(&b.hash_with_nonce(nonce), 2) {
            nonce = nonce.wrapping_add(1);
        }
        b.nonce = Some(nonce);
        assert!(!bc.add_block(b, true));
    }

    #[test]
    fn accepted_block_becomes_tip_and_confirms_transactions() {
        let pool = Arc::new(TxPool::new());
        let mut bc = ledger_with_pool(2, pool.clone());
        let tx = signed_tx("pay");
        let other = signed_tx("later");
        pool.add_transaction(tx.clone()).unwrap();
        pool.add_transaction(other.clone()).unwrap();

        let genesis = bc.genesis_hash().to_string();
        let hash = extend(&mut bc, &genesis, "x", vec![tx], true);
        assert_eq!(bc.tip_hash(), hash);
        assert_eq!(pool.pending(), vec![other]);
    }

    #[test]
    fn without_fork_choice_block_is_only_stored() {
        let mut bc = ledger(2);
        let genesis = bc.genesis_hash().to_string();
        let hash = extend(&mut bc, &genesis, "x", vec![], false);
        assert_eq!(bc.len(), 2);
        assert_eq!(bc.tip_hash(), genesis);
        bc.switch_to_longest_branch();
        assert_eq!(bc.tip_hash(), hash);
    }

    #[test]
    fn tip_change_kills_stale_local_mine() {
        let mut bc = ledger(2);
        let genesis = bc.genesis_hash().to_string();
        bc.begin_mining(&genesis);
        extend(&mut bc, &genesis, "peer", vec![], true);

        let mut candidate = Block::new(1, genesis, "test-node".into(), vec![]).unwrap();
        assert_eq!(
            bc.consensus().mine(&mut candidate, 0.0, 0.0, 1, Some(64)),
            MineOutcome::Killed
        );
    }

    #[test]
    fn end_mining_clears_pending_kill() {
        let mut bc = ledger(2);
        let genesis = bc.genesis_hash().to_string();
        bc.begin_mining(&genesis);
        extend(&mut bc, &genesis, "peer", vec![], true);
        bc.end_mining();

        let mut candidate = Block::new(1, genesis, "test-node".into(), vec![]).unwrap();
        assert_eq!(
            bc.consensus().mine(&mut candidate, 0.0, 0.0, 1, Some(1)),
            MineOutcome::Found
        );
    }
}
