use std::env;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::error::ConfigError;

/// Hex characters in a SHA-256 digest; no hash can have more leading zeros.
pub const MAX_HASH_DIFFICULTY: u32 = 64;

/// Ledger and consensus parameters.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Creator id stamped on locally assembled blocks.
    pub node_id: String,
    pub max_difficulty: u32,
    /// How far (in blocks) a losing branch may trail the tip before it is pruned.
    pub tolerance_value: u64,
    pub pruning_interval: Duration,
    pub min_blocks_for_difficulty: usize,
    pub max_transactions_per_block: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            node_id: format!("node-{}", Uuid::new_v4()),
            max_difficulty: 5,
            tolerance_value: 5,
            pruning_interval: Duration::from_secs(60),
            min_blocks_for_difficulty: 10,
            max_transactions_per_block: 8,
        }
    }
}

impl ChainConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_difficulty == 0 {
            return Err(ConfigError::ZeroMaxDifficulty);
        }
        if self.max_difficulty > MAX_HASH_DIFFICULTY {
            return Err(ConfigError::MaxDifficultyTooHigh(self.max_difficulty));
        }
        if self.min_blocks_for_difficulty == 0 {
            return Err(ConfigError::ZeroDifficultyWindow);
        }
        if self.max_transactions_per_block == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        Ok(())
    }
}

/// Full node settings: HTTP bind address, miner behaviour and chain parameters.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    pub mining_enabled: bool,
    pub mine_empty_blocks: bool,
    pub mining_idle: Duration,
    pub chain: ChainConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            mining_enabled: true,
            mine_empty_blocks: false,
            mining_idle: Duration::from_millis(1000),
            chain: ChainConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Read settings from the environment. Unset or unparsable values fall back
    /// to the defaults; the result is then validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let chain = ChainConfig {
            node_id: env::var("NODE_ID").unwrap_or(defaults.chain.node_id),
            max_difficulty: env_or("MAX_DIFFICULTY", defaults.chain.max_difficulty),
            tolerance_value: env_or("TOLERANCE_LEVEL", defaults.chain.tolerance_value),
            pruning_interval: Duration::from_secs(env_or(
                "TIME_TO_PRUNE",
                defaults.chain.pruning_interval.as_secs(),
            )),
            min_blocks_for_difficulty: env_or(
                "NUM_OF_BLOCKS_FOR_DIFFICULTY",
                defaults.chain.min_blocks_for_difficulty,
            ),
            max_transactions_per_block: env_or(
                "BLOCK_TRANSACTION_SIZE",
                defaults.chain.max_transactions_per_block,
            ),
        };
        chain.validate()?;

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port),
            mining_enabled: env_or("MINING_ENABLED", defaults.mining_enabled),
            mine_empty_blocks: env_or("MINE_EMPTY_BLOCKS", defaults.mine_empty_blocks),
            mining_idle: Duration::from_millis(env_or(
                "MINING_IDLE_MS",
                defaults.mining_idle.as_millis() as u64,
            )),
            chain,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
