use mc3_core::errors::ErrorInfo;
use mc3_core::Mc3Error;
use serde::{Deserialize, Serialize};

use crate::config::{validate_heat_values, LadderConfig};

/// Hard floor below which tuning never pushes a heat.
pub const HEAT_FLOOR: f64 = 0.01;

/// Chain indices ordered hottest-ranked first: descending heat, ties broken
/// by chain index. Position in the result is the chain's rank; rank 0 is the
/// cold chain.
pub fn rank_order(heats: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..heats.len()).collect();
    order.sort_by(|&a, &b| {
        heats[b]
            .partial_cmp(&heats[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    order
}

/// Directional swap bookkeeping accumulated over one tuning epoch.
///
/// Counts are indexed by the ranks the two chains held when the attempt was
/// made, so an entry keeps meaning even after heats move between chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapStatistics {
    attempted: Vec<Vec<u64>>,
    accepted: Vec<Vec<u64>>,
    total_attempted: u64,
    total_accepted: u64,
}

impl SwapStatistics {
    /// Zeroed statistics for `chains` ranks.
    pub fn new(chains: usize) -> Self {
        Self {
            attempted: vec![vec![0; chains]; chains],
            accepted: vec![vec![0; chains]; chains],
            total_attempted: 0,
            total_accepted: 0,
        }
    }

    /// Number of ranks covered by the matrices.
    pub fn chains(&self) -> usize {
        self.attempted.len()
    }

    /// Records one attempt from `rank_a` toward `rank_b`.
    pub fn record(&mut self, rank_a: usize, rank_b: usize, accepted: bool) {
        self.attempted[rank_a][rank_b] += 1;
        self.total_attempted += 1;
        if accepted {
            self.accepted[rank_a][rank_b] += 1;
            self.total_accepted += 1;
        }
    }

    /// Attempts between two ranks, both directions combined.
    pub fn attempted_between(&self, rank_a: usize, rank_b: usize) -> u64 {
        self.attempted[rank_a][rank_b] + self.attempted[rank_b][rank_a]
    }

    /// Accepted exchanges between two ranks, both directions combined.
    pub fn accepted_between(&self, rank_a: usize, rank_b: usize) -> u64 {
        self.accepted[rank_a][rank_b] + self.accepted[rank_b][rank_a]
    }

    /// Attempts recorded this epoch across all pairs.
    pub fn total_attempted(&self) -> u64 {
        self.total_attempted
    }

    /// Acceptances recorded this epoch across all pairs.
    pub fn total_accepted(&self) -> u64 {
        self.total_accepted
    }

    /// Clears every counter for a fresh epoch.
    pub fn reset(&mut self) {
        for row in &mut self.attempted {
            row.iter_mut().for_each(|cell| *cell = 0);
        }
        for row in &mut self.accepted {
            row.iter_mut().for_each(|cell| *cell = 0);
        }
        self.total_attempted = 0;
        self.total_accepted = 0;
    }
}

/// Per-chain heat assignment together with epoch swap statistics and the
/// adaptive tuning rule.
///
/// Heats are stored by chain index. The rank view (who is cold, who are
/// neighbors) is always derived from the stored heats, never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatLadder {
    heats: Vec<f64>,
    target: f64,
    stats: SwapStatistics,
}

impl HeatLadder {
    /// Builds the incremental ladder: chain `i` starts at `1 / (1 + delta * i)`.
    pub fn from_delta(chains: usize, delta: f64, target: f64) -> Self {
        let heats = (0..chains)
            .map(|rank| 1.0 / (1.0 + delta * rank as f64))
            .collect();
        Self {
            heats,
            target,
            stats: SwapStatistics::new(chains),
        }
    }

    /// Builds a ladder from explicit heats, sorted hottest-ranked first.
    pub fn from_heats(heats: Vec<f64>, target: f64) -> Result<Self, Mc3Error> {
        if heats.is_empty() {
            return Err(Mc3Error::Config(ErrorInfo::new(
                "heats-empty",
                "a ladder needs at least one heat",
            )));
        }
        validate_heat_values(&heats)?;
        let mut sorted = heats;
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let chains = sorted.len();
        Ok(Self {
            heats: sorted,
            target,
            stats: SwapStatistics::new(chains),
        })
    }

    /// Builds the ladder described by a configuration section.
    pub fn from_config(config: &LadderConfig, target: f64) -> Result<Self, Mc3Error> {
        match &config.heats {
            Some(explicit) => {
                if explicit.len() != config.chains {
                    return Err(Mc3Error::Config(
                        ErrorInfo::new("heats-length", "explicit heats must cover every chain")
                            .with_context("chains", config.chains.to_string())
                            .with_context("heats", explicit.len().to_string()),
                    ));
                }
                Self::from_heats(explicit.clone(), target)
            }
            None => Ok(Self::from_delta(config.chains, config.delta, target)),
        }
    }

    /// Number of chains on the ladder.
    pub fn chains(&self) -> usize {
        self.heats.len()
    }

    /// Current heats, indexed by chain.
    pub fn heats(&self) -> &[f64] {
        &self.heats
    }

    /// Heat currently assigned to one chain.
    pub fn heat_of(&self, chain: usize) -> f64 {
        self.heats[chain]
    }

    /// Target acceptance rate for adjacent-rank exchanges.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Chain indices ordered by rank; see [`rank_order`].
    pub fn ranked_chains(&self) -> Vec<usize> {
        rank_order(&self.heats)
    }

    /// Rank currently held by one chain.
    pub fn rank_of(&self, chain: usize) -> usize {
        self.ranked_chains()
            .iter()
            .position(|&c| c == chain)
            .unwrap_or(0)
    }

    /// The chain currently holding heat 1.0.
    pub fn cold_chain(&self) -> usize {
        self.ranked_chains()[0]
    }

    /// Overwrites every heat with a synchronized assignment.
    pub fn apply_heats(&mut self, heats: Vec<f64>) -> Result<(), Mc3Error> {
        if heats.len() != self.heats.len() {
            return Err(Mc3Error::Sync(
                ErrorInfo::new("heats-apply-length", "published heats do not cover the ladder")
                    .with_context("expected", self.heats.len().to_string())
                    .with_context("received", heats.len().to_string()),
            ));
        }
        self.heats = heats;
        Ok(())
    }

    /// Epoch statistics, read-only.
    pub fn statistics(&self) -> &SwapStatistics {
        &self.stats
    }

    /// Replaces the statistics wholesale, as restores do.
    pub fn set_statistics(&mut self, stats: SwapStatistics) -> Result<(), Mc3Error> {
        if stats.chains() != self.heats.len() {
            return Err(Mc3Error::Serde(
                ErrorInfo::new("stats-shape", "statistics do not match the ladder size")
                    .with_context("expected", self.heats.len().to_string())
                    .with_context("received", stats.chains().to_string()),
            ));
        }
        self.stats = stats;
        Ok(())
    }

    /// Records one attempted exchange between two ranks.
    pub fn record_attempt(&mut self, rank_a: usize, rank_b: usize, accepted: bool) {
        self.stats.record(rank_a, rank_b, accepted);
    }

    /// Starts a fresh statistics epoch.
    pub fn reset_statistics(&mut self) {
        self.stats.reset();
    }

    /// Computes the tuned heat assignment without touching the ladder.
    ///
    /// Each adjacent-rank gap is rescaled toward the target rate: widened in
    /// proportion to the excess when the observed rate is high, shrunk by up
    /// to half when it is low. Gaps with two or fewer attempts keep their
    /// width, so calling this before any swaps ran is a no-op. The ladder is
    /// then rebuilt downward from 1.0; once a heat would cross the floor the
    /// remaining ranks are re-derived geometrically so the hottest rank lands
    /// exactly on the floor. Returned heats are indexed by chain.
    pub fn tuned_heats(&self) -> Vec<f64> {
        let n = self.heats.len();
        if n < 2 {
            return self.heats.clone();
        }
        let order = self.ranked_chains();
        let by_rank: Vec<f64> = order.iter().map(|&chain| self.heats[chain]).collect();

        let mut gaps = Vec::with_capacity(n - 1);
        for rank in 1..n {
            let mut gap = by_rank[rank - 1] - by_rank[rank];
            let attempted = self.stats.attempted_between(rank - 1, rank);
            if attempted > 2 {
                let rate = self.stats.accepted_between(rank - 1, rank) as f64 / attempted as f64;
                if rate > self.target {
                    gap *= 1.0 + (rate - self.target) / (1.0 - self.target);
                } else {
                    gap /= 2.0 - rate / self.target;
                }
            }
            gaps.push(gap);
        }

        let mut by_rank = vec![1.0; n];
        let mut floored_at = None;
        for rank in 1..n {
            let next = by_rank[rank - 1] - gaps[rank - 1];
            if next <= HEAT_FLOOR {
                floored_at = Some(rank);
                break;
            }
            by_rank[rank] = next;
        }
        if let Some(first) = floored_at {
            let anchor = by_rank[first - 1];
            let rho = (anchor / HEAT_FLOOR).powf(1.0 / (n - first) as f64);
            for rank in first..n {
                by_rank[rank] = anchor / rho.powi((rank + 1 - first) as i32);
            }
        }

        let mut tuned = vec![0.0; n];
        for (rank, &chain) in order.iter().enumerate() {
            tuned[chain] = by_rank[rank];
        }
        tuned
    }

    /// Tunes in place and opens a fresh epoch. Distributed runs instead
    /// broadcast [`HeatLadder::tuned_heats`] and apply the published copy.
    pub fn tune(&mut self) {
        self.heats = self.tuned_heats();
        self.stats.reset();
    }
}
