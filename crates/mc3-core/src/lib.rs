#![deny(missing_docs)]
#![doc = "Core contracts and data types for the mc3 coupled-chain engine."]

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod provenance;
pub mod rng;

pub use errors::{ErrorInfo, Mc3Error};
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{derive_substream_seed, RngHandle};

/// Per-move tuning bookkeeping reported by a chain.
///
/// Records are parallel across chains that run the same move list: entry `i`
/// of one chain pairs with entry `i` of another by move name, never by object
/// identity. `tuning_parameter` is NaN for moves without a tunable parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveTuningRecord {
    /// Stable move name used to pair records across chains.
    pub name: String,
    /// Relative weight of the move within its chain's proposal cycle.
    pub weight: f64,
    /// Proposals attempted since the last tuning pass.
    pub tried_period: u64,
    /// Proposals attempted over the whole run.
    pub tried_total: u64,
    /// Proposals accepted since the last tuning pass.
    pub accepted_period: u64,
    /// Proposals accepted over the whole run.
    pub accepted_total: u64,
    /// Current tuning parameter, NaN when the move is not tunable.
    pub tuning_parameter: f64,
}

impl MoveTuningRecord {
    /// Creates an empty record for a named move without a tunable parameter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: 1.0,
            tried_period: 0,
            tried_total: 0,
            accepted_period: 0,
            accepted_total: 0,
            tuning_parameter: f64::NAN,
        }
    }

    /// Sets the tunable parameter carried by the record.
    pub fn with_parameter(mut self, parameter: f64) -> Self {
        self.tuning_parameter = parameter;
        self
    }

    /// Returns true when the move carries a tunable parameter.
    pub fn is_tunable(&self) -> bool {
        !self.tuning_parameter.is_nan()
    }

    /// Acceptance fraction over the current period (0 when nothing was tried).
    pub fn period_acceptance(&self) -> f64 {
        if self.tried_period == 0 {
            0.0
        } else {
            self.accepted_period as f64 / self.tried_period as f64
        }
    }

    /// Acceptance fraction over the whole run (0 when nothing was tried).
    pub fn total_acceptance(&self) -> f64 {
        if self.tried_total == 0 {
            0.0
        } else {
            self.accepted_total as f64 / self.tried_total as f64
        }
    }

    /// Structural equality that treats NaN tuning parameters as equal.
    pub fn matches(&self, other: &Self) -> bool {
        let params_match = match (self.is_tunable(), other.is_tunable()) {
            (true, true) => self.tuning_parameter == other.tuning_parameter,
            (false, false) => true,
            _ => false,
        };
        params_match
            && self.name == other.name
            && self.tried_period == other.tried_period
            && self.tried_total == other.tried_total
            && self.accepted_period == other.accepted_period
            && self.accepted_total == other.accepted_total
    }
}

/// Contract every replica must satisfy to participate in coupled sampling.
///
/// The coordination engine treats chains as opaque samplers: it advances
/// them, reads their log posterior, and rewrites heat, active flag and
/// tuning bookkeeping after swap and tuning decisions. Heat and the active
/// flag are owned by the coordinator; a chain must never change them itself.
pub trait TemperedChain: Send {
    /// Advances the chain by one full proposal cycle.
    ///
    /// `sampling` is false during burn-in. Evaluation failures abort the
    /// run; the engine never continues past an inconsistent replica.
    fn advance_cycle(&mut self, sampling: bool) -> Result<(), Mc3Error>;

    /// Log probability of the current state, restricted to the likelihood
    /// portion when `likelihood_only` is set.
    fn log_posterior(&self, likelihood_only: bool) -> f64;

    /// Heat currently applied to the chain's acceptance ratio.
    fn heat(&self) -> f64;

    /// Replaces the chain's heat.
    fn set_heat(&mut self, heat: f64);

    /// True when this chain is the cold chain whose samples are reported.
    fn is_active(&self) -> bool;

    /// Marks or unmarks the chain as the reporting chain.
    fn set_active(&mut self, active: bool);

    /// Position of the chain within the coupled ensemble.
    fn chain_index(&self) -> usize;

    /// Assigns the chain's position within the coupled ensemble.
    ///
    /// Implementations derive their private random substream from this
    /// index, so identical clones assigned the same index stay in lockstep
    /// across workers.
    fn set_chain_index(&mut self, index: usize);

    /// Exports per-move tuning bookkeeping in the chain's move order.
    fn tuning_records(&self) -> Vec<MoveTuningRecord>;

    /// Replaces per-move tuning bookkeeping, pairing records by position.
    ///
    /// Fails with a tuning error when the incoming records disagree with
    /// the chain's move list on name or tunable-parameter presence.
    fn set_tuning_records(&mut self, records: Vec<MoveTuningRecord>) -> Result<(), Mc3Error>;

    /// Re-tunes proposal parameters from the bookkeeping gathered since the
    /// previous tuning pass, then starts a new period.
    fn tune(&mut self);

    /// Serializes the chain state into a self-contained payload.
    fn checkpoint(&self) -> Result<String, Mc3Error>;

    /// Restores the chain state from a payload produced by [`Self::checkpoint`].
    fn restore(&mut self, payload: &str) -> Result<(), Mc3Error>;
}
