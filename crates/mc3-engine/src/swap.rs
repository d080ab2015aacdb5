use mc3_core::RngHandle;
use serde::{Deserialize, Serialize};

use crate::config::SwapMode;
use crate::determinism;
use crate::ladder::rank_order;

/// Log ratios below this bound reject outright, skipping the `exp` call.
pub const LN_RATIO_FLOOR: f64 = -100.0;

/// Which chains are eligible to pair up in one swap round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapTopology {
    /// Chains adjacent in the heat ordering.
    Neighbor,
    /// Arbitrary distinct chains.
    Random,
}

/// One resolved exchange attempt, applied identically on every worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapOutcome {
    /// First chain of the attempted pair.
    pub chain_j: usize,
    /// Second chain of the attempted pair.
    pub chain_k: usize,
    /// Rank held by `chain_j` when the attempt was made.
    pub rank_j: usize,
    /// Rank held by `chain_k` when the attempt was made.
    pub rank_k: usize,
    /// Log acceptance ratio of the exchange test.
    pub ln_ratio: f64,
    /// Whether the heats were exchanged.
    pub accepted: bool,
}

/// Everything a worker needs to apply one trigger round bit for bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapRound {
    /// Attempts in decision order.
    pub outcomes: Vec<SwapOutcome>,
    /// Post-round heats, indexed by chain.
    pub heats: Vec<f64>,
    /// Post-round cold chain.
    pub active_index: usize,
}

/// Log acceptance ratio for exchanging the heats of two chains.
///
/// Cancels to zero when the heats or the posteriors are equal, so such an
/// exchange always passes.
pub fn ln_acceptance_ratio(heat_j: f64, ln_pj: f64, heat_k: f64, ln_pk: f64) -> f64 {
    heat_j * (ln_pk - ln_pj) + heat_k * (ln_pj - ln_pk)
}

/// Resolves the exchange test.
///
/// The uniform is drawn before branching so every attempt consumes the same
/// number of draws regardless of how it resolves.
pub fn resolve_exchange(ln_ratio: f64, rng: &mut RngHandle) -> bool {
    let draw = rng.uniform01();
    if ln_ratio >= 0.0 {
        true
    } else if ln_ratio < LN_RATIO_FLOOR {
        false
    } else {
        draw < ln_ratio.exp()
    }
}

/// Plays out one trigger round on the coordinator's gathered view.
///
/// `heats` and `active_index` are mutated as attempts land, so later attempts
/// in a multiple-mode round see the rank view their predecessors produced.
/// Log posteriors stay with their chains; an exchange moves heat, not state.
#[allow(clippy::too_many_arguments)]
pub fn decide_round(
    topology: SwapTopology,
    mode: SwapMode,
    heats: &mut [f64],
    ln_posteriors: &[f64],
    active_index: &mut usize,
    master_seed: u64,
    generation: u64,
    round: usize,
) -> Vec<SwapOutcome> {
    let chains = heats.len();
    let mut outcomes = Vec::new();
    if chains < 2 {
        return outcomes;
    }
    let attempts = match (topology, mode) {
        (_, SwapMode::Single) => 1,
        (SwapTopology::Neighbor, SwapMode::Multiple) => chains - 1,
        (SwapTopology::Random, SwapMode::Multiple) => chains * (chains - 1) / 2,
    };
    for attempt in 0..attempts {
        let mut rng =
            RngHandle::from_seed(determinism::swap_seed(master_seed, generation, round, attempt));
        let order = rank_order(heats);
        let mut rank_of = vec![0usize; chains];
        for (rank, &chain) in order.iter().enumerate() {
            rank_of[chain] = rank;
        }
        let (chain_j, chain_k) = match (topology, mode) {
            (SwapTopology::Neighbor, SwapMode::Single) => {
                let rank = rng.uniform_index(chains - 1);
                if rng.uniform01() < 0.5 {
                    (order[rank], order[rank + 1])
                } else {
                    (order[rank + 1], order[rank])
                }
            }
            (SwapTopology::Neighbor, SwapMode::Multiple) => (order[attempt], order[attempt + 1]),
            (SwapTopology::Random, SwapMode::Single) => {
                let j = rng.uniform_index(chains);
                let mut k = rng.uniform_index(chains);
                while k == j {
                    k = rng.uniform_index(chains);
                }
                (j, k)
            }
            (SwapTopology::Random, SwapMode::Multiple) => unordered_pair(chains, attempt),
        };
        let ln_ratio = ln_acceptance_ratio(
            heats[chain_j],
            ln_posteriors[chain_j],
            heats[chain_k],
            ln_posteriors[chain_k],
        );
        let accepted = resolve_exchange(ln_ratio, &mut rng);
        outcomes.push(SwapOutcome {
            chain_j,
            chain_k,
            rank_j: rank_of[chain_j],
            rank_k: rank_of[chain_k],
            ln_ratio,
            accepted,
        });
        if accepted {
            heats.swap(chain_j, chain_k);
            if *active_index == chain_j {
                *active_index = chain_k;
            } else if *active_index == chain_k {
                *active_index = chain_j;
            }
        }
    }
    outcomes
}

/// The `attempt`-th unordered chain pair in lexicographic order.
fn unordered_pair(chains: usize, attempt: usize) -> (usize, usize) {
    let mut remaining = attempt;
    for j in 0..chains - 1 {
        let pairs_with_j = chains - 1 - j;
        if remaining < pairs_with_j {
            return (j, j + remaining + 1);
        }
        remaining -= pairs_with_j;
    }
    (chains - 2, chains - 1)
}
