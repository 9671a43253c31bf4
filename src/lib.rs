//! Proof-of-Work blockchain node core: a branching block ledger with
//! fork-choice and pruning, and a difficulty-retargeting consensus engine.

pub mod api;
pub mod blockchain;
pub mod config;
pub mod consensus;
pub mod crypto;
pub mod error;
pub mod node;
pub mod telemetry;
pub mod transaction;

pub use blockchain::{Block, Blockchain, DifficultyWindow};
pub use config::{ChainConfig, NodeConfig};
pub use consensus::{Consensus, MineOutcome, MiningStats};
pub use node::{MiningRound, Node};
pub use transaction::{Transaction, TransactionSource, TxPool};
