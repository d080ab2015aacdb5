use std::sync::Arc;

use mc3_core::errors::ErrorInfo;
use mc3_core::provenance::SchemaVersion;
use mc3_core::{derive_substream_seed, Mc3Error, MoveTuningRecord, RngHandle, TemperedChain};
use serde::{Deserialize, Serialize};

use crate::moves::ProposalMove;
use crate::target::TargetDensity;

/// Log ratios below this bound reject outright, skipping the `exp` call.
const LN_PROPOSAL_FLOOR: f64 = -300.0;

/// Single-site Metropolis sampler over a [`TargetDensity`].
///
/// Each cycle draws a fresh substream from `(master seed, chain index,
/// generation)`, so a chain's trajectory depends only on those three values.
/// Clones that agree on them replay identical cycles, which is what keeps
/// replicated workers in lockstep, and restoring a checkpoint resumes the
/// exact stream without any RNG state in the payload.
pub struct MetropolisChain<T> {
    target: Arc<T>,
    point: Vec<f64>,
    ln_likelihood: f64,
    ln_prior: f64,
    heat: f64,
    active: bool,
    chain_index: usize,
    generation: u64,
    master_seed: u64,
    moves: Vec<ProposalMove>,
}

impl<T> Clone for MetropolisChain<T> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            point: self.point.clone(),
            ln_likelihood: self.ln_likelihood,
            ln_prior: self.ln_prior,
            heat: self.heat,
            active: self.active,
            chain_index: self.chain_index,
            generation: self.generation,
            master_seed: self.master_seed,
            moves: self.moves.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ChainSnapshot {
    schema: SchemaVersion,
    point: Vec<f64>,
    generation: u64,
    heat: f64,
    active: bool,
    chain_index: usize,
    moves: Vec<ProposalMove>,
}

impl<T: TargetDensity> MetropolisChain<T> {
    /// Builds a chain at the target's initial point.
    pub fn new(
        target: Arc<T>,
        master_seed: u64,
        moves: Vec<ProposalMove>,
    ) -> Result<Self, Mc3Error> {
        let dimension = target.dimension();
        for proposal in &moves {
            if proposal.coordinate >= dimension {
                return Err(Mc3Error::Chain(
                    ErrorInfo::new("move-coordinate", "move points outside the sample space")
                        .with_context("move", proposal.name.clone())
                        .with_context("coordinate", proposal.coordinate.to_string())
                        .with_context("dimension", dimension.to_string()),
                ));
            }
        }
        let point = target.initial_point();
        let ln_likelihood = target.ln_likelihood(&point);
        let ln_prior = target.ln_prior(&point);
        Ok(Self {
            target,
            point,
            ln_likelihood,
            ln_prior,
            heat: 1.0,
            active: false,
            chain_index: 0,
            generation: 0,
            master_seed,
            moves,
        })
    }

    /// Builds a chain with one slide move per coordinate plus a scale move
    /// on the first coordinate.
    pub fn with_default_moves(target: Arc<T>, master_seed: u64) -> Result<Self, Mc3Error> {
        let dimension = target.dimension();
        let mut moves = Vec::with_capacity(dimension + 1);
        for coordinate in 0..dimension {
            moves.push(ProposalMove::slide(
                format!("slide:x{coordinate}"),
                coordinate,
                1.0,
                1.0,
            ));
        }
        if dimension > 0 {
            moves.push(ProposalMove::scale("scale:x0", 0, 1.0, 1.0));
        }
        Self::new(target, master_seed, moves)
    }

    /// Current position in the sample space.
    pub fn point(&self) -> &[f64] {
        &self.point
    }

    /// Cycles completed so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The chain's proposal distributions.
    pub fn moves(&self) -> &[ProposalMove] {
        &self.moves
    }

    fn cycle_seed(&self) -> u64 {
        let stream = derive_substream_seed(self.master_seed, self.chain_index as u64);
        derive_substream_seed(stream, self.generation)
    }

    fn try_move(&mut self, index: usize, rng: &mut RngHandle) {
        let coordinate = self.moves[index].coordinate;
        let current = self.point[coordinate];
        let (candidate, ln_hastings) = self.moves[index].propose(current, rng);
        self.point[coordinate] = candidate;
        let ln_likelihood = self.target.ln_likelihood(&self.point);
        let ln_prior = self.target.ln_prior(&self.point);
        let ln_posterior_ratio =
            (ln_likelihood + ln_prior) - (self.ln_likelihood + self.ln_prior);
        let ln_ratio = self.heat * ln_posterior_ratio + ln_hastings;
        // A NaN ratio means the proposal walked somewhere the target cannot
        // evaluate; treat it as a plain rejection.
        let accepted = if ln_ratio.is_nan() {
            false
        } else if ln_ratio >= 0.0 {
            true
        } else if ln_ratio < LN_PROPOSAL_FLOOR {
            false
        } else {
            rng.uniform01() < ln_ratio.exp()
        };
        if accepted {
            self.ln_likelihood = ln_likelihood;
            self.ln_prior = ln_prior;
        } else {
            self.point[coordinate] = current;
        }
        self.moves[index].record(accepted);
    }
}

fn pick_move(moves: &[ProposalMove], total_weight: f64, rng: &mut RngHandle) -> usize {
    let mut draw = rng.uniform01() * total_weight;
    for (index, proposal) in moves.iter().enumerate() {
        draw -= proposal.weight;
        if draw < 0.0 {
            return index;
        }
    }
    moves.len() - 1
}

impl<T: TargetDensity + Send + Sync> TemperedChain for MetropolisChain<T> {
    fn advance_cycle(&mut self, _sampling: bool) -> Result<(), Mc3Error> {
        self.generation += 1;
        let mut rng = RngHandle::from_seed(self.cycle_seed());
        let total_weight: f64 = self.moves.iter().map(|proposal| proposal.weight).sum();
        if total_weight <= 0.0 {
            return Ok(());
        }
        let picks = total_weight as usize;
        for _ in 0..picks {
            let index = pick_move(&self.moves, total_weight, &mut rng);
            self.try_move(index, &mut rng);
        }
        Ok(())
    }

    fn log_posterior(&self, likelihood_only: bool) -> f64 {
        if likelihood_only {
            self.ln_likelihood
        } else {
            self.ln_likelihood + self.ln_prior
        }
    }

    fn heat(&self) -> f64 {
        self.heat
    }

    fn set_heat(&mut self, heat: f64) {
        self.heat = heat;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn chain_index(&self) -> usize {
        self.chain_index
    }

    fn set_chain_index(&mut self, index: usize) {
        self.chain_index = index;
    }

    fn tuning_records(&self) -> Vec<MoveTuningRecord> {
        self.moves.iter().map(ProposalMove::record_view).collect()
    }

    fn set_tuning_records(&mut self, records: Vec<MoveTuningRecord>) -> Result<(), Mc3Error> {
        if records.len() != self.moves.len() {
            return Err(Mc3Error::Tuning(
                ErrorInfo::new("record-count", "incoming records do not cover the move list")
                    .with_context("moves", self.moves.len().to_string())
                    .with_context("records", records.len().to_string()),
            ));
        }
        for (proposal, record) in self.moves.iter_mut().zip(records.iter()) {
            proposal.apply_record(record)?;
        }
        Ok(())
    }

    fn tune(&mut self) {
        for proposal in &mut self.moves {
            proposal.auto_tune();
        }
    }

    fn checkpoint(&self) -> Result<String, Mc3Error> {
        let snapshot = ChainSnapshot {
            schema: SchemaVersion::default(),
            point: self.point.clone(),
            generation: self.generation,
            heat: self.heat,
            active: self.active,
            chain_index: self.chain_index,
            moves: self.moves.clone(),
        };
        serde_json::to_string(&snapshot)
            .map_err(|err| Mc3Error::Serde(ErrorInfo::new("chain-serialize", err.to_string())))
    }

    fn restore(&mut self, payload: &str) -> Result<(), Mc3Error> {
        let snapshot: ChainSnapshot = serde_json::from_str(payload)
            .map_err(|err| Mc3Error::Serde(ErrorInfo::new("chain-parse", err.to_string())))?;
        let dimension = self.target.dimension();
        if snapshot.point.len() != dimension {
            return Err(Mc3Error::Chain(
                ErrorInfo::new("restore-dimension", "payload does not fit the sample space")
                    .with_context("expected", dimension.to_string())
                    .with_context("restored", snapshot.point.len().to_string()),
            ));
        }
        for proposal in &snapshot.moves {
            if proposal.coordinate >= dimension {
                return Err(Mc3Error::Chain(
                    ErrorInfo::new("restore-move", "restored move points outside the sample space")
                        .with_context("move", proposal.name.clone())
                        .with_context("coordinate", proposal.coordinate.to_string()),
                ));
            }
        }
        self.point = snapshot.point;
        self.generation = snapshot.generation;
        self.heat = snapshot.heat;
        self.active = snapshot.active;
        self.chain_index = snapshot.chain_index;
        self.moves = snapshot.moves;
        self.ln_likelihood = self.target.ln_likelihood(&self.point);
        self.ln_prior = self.target.ln_prior(&self.point);
        Ok(())
    }
}
