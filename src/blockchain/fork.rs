use log::{debug, info};
use std::collections::{HashMap, HashSet};

use super::Blockchain;

impl Blockchain {
    /// Hashes of blocks that no stored block names as predecessor.
    pub fn leaves(&self) -> Vec<&str> {
        let parents: HashSet<&str> = self
            .blocks
            .values()
            .map(|b| b.previous_hash.as_str())
            .collect();
        self.blocks
            .keys()
            .map(String::as_str)
            .filter(|h| !parents.contains(h))
            .collect()
    }

    /// Distance from genesis for every stored block.
    pub(super) fn depths(&self) -> HashMap<&str, u64> {
        let mut memo: HashMap<&str, u64> = HashMap::with_capacity(self.blocks.len());
        memo.insert(self.genesis_hash.as_str(), 0);
        for start in self.blocks.keys() {
            let mut path = Vec::new();
            let mut cursor = start.as_str();
            let base = loop {
                if let Some(&depth) = memo.get(cursor) {
                    break depth;
                }
                path.push(cursor);
                cursor = self
                    .blocks
                    .get(cursor)
                    .map(|b| b.previous_hash.as_str())
                    .expect("every stored block links back to genesis");
            };
            for (offset, hash) in path.into_iter().rev().enumerate() {
                memo.insert(hash, base + offset as u64 + 1);
            }
        }
        memo
    }

    /// Depth of a single stored block, `None` if unknown.
    pub fn depth(&self, hash: &str) -> Option<u64> {
        self.blocks.contains_key(hash).then(|| self.ancestors(hash).len() as u64 - 1)
    }

    /// Make the deepest leaf the canonical tip. Returns whether the tip moved.
    ///
    /// Ties keep the current tip when it is among them, otherwise the
    /// lexicographically smallest hash wins. Never removes blocks.
    pub fn switch_to_longest_branch(&mut self) -> bool {
        let best = {
            let depths = self.depths();
            let tip = self.tip_hash.as_str();
            self.leaves()
                .into_iter()
                .max_by(|a, b| {
                    depths[a]
                        .cmp(&depths[b])
                        .then_with(|| (*a == tip).cmp(&(*b == tip)))
                        .then_with(|| b.cmp(a))
                })
                .expect("ledger always holds genesis")
                .to_string()
        };
        if best == self.tip_hash {
            return false;
        }
        info!("ledger: switching canonical tip {} -> {}", self.tip_hash, best);
        self.set_tip(best);
        true
    }

    /// Drop branches whose leaf trails the canonical tip by more than the
    /// tolerance, down to (not including) the fork point. Returns how many
    /// blocks were removed.
    pub fn prune(&mut self) -> usize {
        let keep: HashSet<String> = {
            let depths = self.depths();
            let tip_depth = depths[self.tip_hash.as_str()];
            let mut keep: HashSet<&str> = HashSet::with_capacity(self.blocks.len());
            for leaf in self.leaves() {
                let lag = tip_depth.saturating_sub(depths[leaf]);
                if leaf != self.tip_hash && lag > self.tolerance_value {
                    debug!("ledger: branch ending in {leaf} trails by {lag}, pruning");
                    continue;
                }
                let mut cursor = Some(leaf);
                while let Some(hash) = cursor {
                    if !keep.insert(hash) {
                        break;
                    }
                    cursor = self
                        .blocks
                        .get(hash)
                        .map(|b| b.previous_hash.as_str())
                        .filter(|parent| self.blocks.contains_key(*parent));
                }
            }
            keep.into_iter().map(str::to_string).collect()
        };

        let before = self.blocks.len();
        self.blocks.retain(|hash, _| keep.contains(hash));
        let removed = before - self.blocks.len();

        let canonical = self.ancestors(&self.tip_hash);
        assert!(
            canonical.contains(self.genesis_hash.as_str()),
            "prune removed an ancestor of the canonical tip"
        );
        if removed > 0 {
            info!("ledger: pruned {removed} stale blocks, {} remain", self.blocks.len());
        }
        removed
    }
}
