use log::{debug, warn};
use std::collections::HashSet;
use std::sync::Mutex;

use super::model::Transaction;

/// Source of pending transactions for block assembly.
///
/// The ledger pulls candidates through [`TransactionSource::transactions_for_block`]
/// and reports transactions that reached the canonical branch through
/// [`TransactionSource::mark_confirmed`].
pub trait TransactionSource: Send + Sync {
    fn transactions_for_block(&self, max: usize) -> Vec<Transaction>;

    fn mark_confirmed(&self, confirmed: &[Transaction]);
}

/// Why the pool refused a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolRejection {
    InvalidSignature,
    Duplicate,
    AlreadyConfirmed,
}

#[derive(Debug, Default)]
struct PoolState {
    pending: Vec<Transaction>,
    /// Hashes reported through `mark_confirmed`.
    confirmed: HashSet<String>,
}

/// In-memory FIFO pool of signed, not yet confirmed transactions.
#[derive(Debug, Default)]
pub struct TxPool {
    state: Mutex<PoolState>,
}

impl TxPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a transaction after checking its signature, hash and uniqueness.
    pub fn add_transaction(&self, tx: Transaction) -> Result<(), PoolRejection> {
        if !tx.is_valid() {
            warn!("txpool: rejected transaction with invalid signature or hash");
            return Err(PoolRejection::InvalidSignature);
        }
        let mut state = self.state.lock().expect("mutex poisoned");
        if tx
            .transaction_hash()
            .is_some_and(|h| state.confirmed.contains(h))
        {
            debug!("txpool: {:?} is already confirmed", tx.transaction_hash());
            return Err(PoolRejection::AlreadyConfirmed);
        }
        if state
            .pending
            .iter()
            .any(|p| p.transaction_hash() == tx.transaction_hash())
        {
            debug!("txpool: duplicate {:?}", tx.transaction_hash());
            return Err(PoolRejection::Duplicate);
        }
        state.pending.push(tx);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("mutex poisoned").pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the pending set in arrival order.
    pub fn pending(&self) -> Vec<Transaction> {
        self.state.lock().expect("mutex poisoned").pending.clone()
    }
}

impl TransactionSource for TxPool {
    fn transactions_for_block(&self, max: usize) -> Vec<Transaction> {
        let state = self.state.lock().expect("mutex poisoned");
        state.pending.iter().take(max).cloned().collect()
    }

    fn mark_confirmed(&self, confirmed: &[Transaction]) {
        let mut state = self.state.lock().expect("mutex poisoned");
        state.confirmed.extend(
            confirmed
                .iter()
                .filter_map(Transaction::transaction_hash)
                .map(str::to_string),
        );
        let PoolState { pending, confirmed: known } = &mut *state;
        let before = pending.len();
        pending.retain(|t| t.transaction_hash().is_none_or(|h| !known.contains(h)));
        debug!(
            "txpool: evicted {} confirmed transactions, {} pending",
            before - pending.len(),
            pending.len()
        );
    }
}
