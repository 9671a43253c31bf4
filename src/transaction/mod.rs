pub mod model;
pub mod pool;

pub use model::Transaction;
pub use pool::{PoolRejection, TransactionSource, TxPool};
