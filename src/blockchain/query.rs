use super::{Block, Blockchain};
use crate::transaction::Transaction;

/// Read-only views. Unless noted, these walk the canonical branch only.
impl Blockchain {
    pub fn genesis_hash(&self) -> &str {
        &self.genesis_hash
    }

    pub fn tip_hash(&self) -> &str {
        &self.tip_hash
    }

    /// The canonical tip block.
    pub fn tip(&self) -> &Block {
        self.blocks
            .get(&self.tip_hash)
            .expect("canonical tip is always stored")
    }

    /// Number of stored blocks across all branches, genesis included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// `(hash, block)` pairs from the tip back to genesis.
    pub fn canonical_chain_with_hashes(&self) -> Vec<(&str, &Block)> {
        let mut out = Vec::new();
        let mut cursor = self.blocks.get_key_value(&self.tip_hash);
        while let Some((hash, block)) = cursor {
            out.push((hash.as_str(), block));
            cursor = self.blocks.get_key_value(&block.previous_hash);
        }
        out
    }

    /// Blocks from the tip back to genesis.
    pub fn canonical_chain(&self) -> Vec<&Block> {
        self.canonical_chain_with_hashes()
            .into_iter()
            .map(|(_, b)| b)
            .collect()
    }

    /// All stored blocks with this id, on any branch, ordered by hash.
    pub fn get_block_by_id(&self, id: u64) -> Vec<&Block> {
        let mut found: Vec<(&String, &Block)> =
            self.blocks.iter().filter(|(_, b)| b.id == id).collect();
        found.sort_by(|a, b| a.0.cmp(b.0));
        found.into_iter().map(|(_, b)| b).collect()
    }

    /// Any stored block, canonical or not.
    pub fn get_block_by_hash(&self, hash: &str) -> Option<&Block> {
        self.blocks.get(hash)
    }

    /// Canonical blocks with id greater than `start_id`, ascending.
    pub fn get_block_range(&self, start_id: u64) -> Vec<&Block> {
        let mut out: Vec<&Block> = self
            .canonical_chain()
            .into_iter()
            .take_while(|b| b.id > start_id)
            .collect();
        out.reverse();
        out
    }

    /// The `n` most recent canonical transactions, newest block first,
    /// keeping each block's own transaction order.
    pub fn get_n_last_transactions(&self, n: usize) -> Vec<&Transaction> {
        self.canonical_chain()
            .into_iter()
            .flat_map(|b| b.transactions.iter())
            .take(n)
            .collect()
    }

    /// A canonical transaction and the hash of the block containing it.
    pub fn get_transaction(&self, transaction_hash: &str) -> Option<(&Transaction, String)> {
        self.canonical_chain_with_hashes()
            .into_iter()
            .find_map(|(block_hash, block)| {
                block
                    .transactions
                    .iter()
                    .find(|t| t.transaction_hash() == Some(transaction_hash))
                    .map(|t| (t, block_hash.to_string()))
            })
    }
}
