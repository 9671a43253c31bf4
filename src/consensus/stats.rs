use serde::Serialize;

/// Running statistics over successful mines. Times are in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MiningStats {
    pub min_mining_time: Option<f64>,
    pub max_mining_time: f64,
    pub avg_mining_time: f64,
    pub total_mining_time: f64,
    pub mined_blocks: u64,
    pub mined_transactions: u64,
}

impl MiningStats {
    pub fn record(&mut self, elapsed_secs: f64, transactions: usize) {
        self.min_mining_time = Some(
            self.min_mining_time
                .map_or(elapsed_secs, |m| m.min(elapsed_secs)),
        );
        self.max_mining_time = self.max_mining_time.max(elapsed_secs);
        self.total_mining_time += elapsed_secs;
        self.mined_blocks += 1;
        self.mined_transactions += transactions as u64;
        self.avg_mining_time = self.total_mining_time / self.mined_blocks as f64;
    }
}
