use mc3_core::errors::ErrorInfo;
use mc3_core::provenance::SchemaVersion;
use mc3_core::{Mc3Error, MoveTuningRecord, TemperedChain};

use crate::checkpoint::{self, EngineCheckpoint};
use crate::config::{CoupledConfig, SwapMethod, SwapMode};
use crate::ladder::HeatLadder;
use crate::pool::{ChainPool, SlotSync};
use crate::swap::{self, SwapOutcome, SwapRound, SwapTopology};
use crate::sync::{self, SyncChannel};
use crate::trace::{RunReport, TraceRecorder, TraceRow};

/// Heated replicas of one sampler, coupled through heat exchanges.
///
/// Every worker constructs the same value from the same configuration and
/// then runs the same code path. Chains advance locally; swap rounds, ladder
/// tuning and checkpoints are gather/decide/broadcast rounds with worker 0
/// deciding, so all stochastic coordination decisions are made once and
/// replayed everywhere.
pub struct CoupledChains<C, S> {
    config: CoupledConfig,
    base: C,
    pool: ChainPool<C>,
    ladder: HeatLadder,
    channel: S,
    active_index: usize,
    trace: TraceRecorder,
}

impl<C: TemperedChain + Clone, S: SyncChannel> CoupledChains<C, S> {
    /// Builds the worker-local view of the ensemble.
    ///
    /// `base` is cloned into every chain slot this worker owns; the clone for
    /// chain `i` gets index `i`, the ladder's initial heat, and the active
    /// flag on the cold chain.
    pub fn new(config: CoupledConfig, base: C, channel: S) -> Result<Self, Mc3Error> {
        config.validate()?;
        let ladder = HeatLadder::from_config(&config.ladder, config.tuning.target)?;
        let pool = ChainPool::new(
            &base,
            config.ladder.chains,
            channel.rank(),
            channel.num_workers(),
            ladder.heats(),
            0,
        )?;
        Ok(Self {
            config,
            base,
            pool,
            ladder,
            channel,
            active_index: 0,
            trace: TraceRecorder::new(),
        })
    }

    /// The run configuration.
    pub fn config(&self) -> &CoupledConfig {
        &self.config
    }

    /// The worker-local chain pool.
    pub fn pool(&self) -> &ChainPool<C> {
        &self.pool
    }

    /// The shared heat ladder.
    pub fn ladder(&self) -> &HeatLadder {
        &self.ladder
    }

    /// The chain currently sampling at heat 1.0.
    pub fn active_chain(&self) -> usize {
        self.active_index
    }

    /// Trace rows collected so far (coordinator only).
    pub fn trace(&self) -> &TraceRecorder {
        &self.trace
    }

    /// Master seed for every derived decision stream.
    pub fn master_seed(&self) -> u64 {
        self.config.seed_policy.master_seed
    }

    /// Runs discarded generations, retuning proposals and optionally the
    /// ladder at the configured interval.
    pub fn burnin(&mut self, generations: usize) -> Result<(), Mc3Error> {
        self.channel.barrier();
        let interval = self.config.tuning.interval as u64;
        let tune_moves = self.config.tuning.tune_moves;
        let tune_heats = self.config.tuning.tune_heats;
        for _ in 0..generations {
            self.pool.advance(false)?;
            self.check_swap_triggers()?;
            if interval > 0 && self.pool.burnin_generation() % interval == 0 {
                if tune_moves {
                    self.pool.tune_local_moves();
                }
                if tune_heats {
                    self.tune_ladder()?;
                }
            }
        }
        Ok(())
    }

    /// Runs sampling generations, tracing the cold chain at the report
    /// interval.
    pub fn run(&mut self, generations: usize) -> Result<(), Mc3Error> {
        self.channel.barrier();
        let report_interval = self.config.report_interval as u64;
        for _ in 0..generations {
            self.pool.advance(true)?;
            self.check_swap_triggers()?;
            if self.pool.sampling_generation() % report_interval == 0 {
                self.record_trace()?;
            }
        }
        Ok(())
    }

    /// Full log posterior of the chain holding heat 1.0, on the coordinator.
    pub fn model_ln_probability(&self) -> Result<Option<f64>, Mc3Error> {
        let chains = self.pool.chains();
        let posteriors = sync::gather(
            &self.channel,
            self.pool
                .lead_contributions(|chain| chain.log_posterior(false)),
            chains,
        )?;
        let heats = sync::gather(
            &self.channel,
            self.pool.lead_contributions(|chain| chain.heat()),
            chains,
        )?;
        match (posteriors, heats) {
            (Some(posteriors), Some(heats)) => {
                let cold = heats.iter().position(|&heat| heat == 1.0).ok_or_else(|| {
                    Mc3Error::Sync(ErrorInfo::new("cold-missing", "no chain holds the cold heat"))
                })?;
                Ok(Some(posteriors[cold]))
            }
            _ => Ok(None),
        }
    }

    /// Tuning records of the current cold chain, on the coordinator.
    pub fn cold_tuning_records(&self) -> Result<Option<Vec<MoveTuningRecord>>, Mc3Error> {
        let chains = self.pool.chains();
        let gathered = sync::gather(
            &self.channel,
            self.pool.lead_contributions(|chain| chain.tuning_records()),
            chains,
        )?;
        Ok(gathered.map(|mut records| records.swap_remove(self.active_index)))
    }

    /// Clears swap statistics, phase counters and the trace for a rerun.
    pub fn reset(&mut self) {
        self.ladder.reset_statistics();
        self.pool.reset_counters();
        self.trace.clear();
    }

    /// One-paragraph description of the coupling strategy.
    pub fn strategy_description(&self) -> String {
        let chains = self.pool.chains();
        let mut description = format!(
            "The coupled sampler runs 1 cold chain and {} heated chains.\n",
            chains.saturating_sub(1)
        );
        let (first, second) = self.config.swap_intervals();
        let per_trigger = match self.config.swap.mode {
            SwapMode::Single => "one pair per trigger",
            SwapMode::Multiple => "sweeping every eligible pair per trigger",
        };
        match self.config.swap.method {
            SwapMethod::Neighbor => description.push_str(&format!(
                "Neighboring ranks attempt a heat swap every {first} generations, {per_trigger}.\n"
            )),
            SwapMethod::Random => description.push_str(&format!(
                "Random chain pairs attempt a heat swap every {first} generations, {per_trigger}.\n"
            )),
            SwapMethod::Both => {
                description.push_str(&format!(
                    "Neighboring ranks attempt a heat swap every {first} generations, {per_trigger}.\n"
                ));
                description.push_str(&format!(
                    "Random chain pairs additionally attempt a heat swap every {second} generations.\n"
                ));
            }
        }
        description
    }

    /// Rebuilds every slot from the base sampler under a new worker set.
    ///
    /// Chain states restart from the base; the ladder keeps its heats but
    /// opens a fresh statistics epoch.
    pub fn repartition(&mut self, channel: S) -> Result<(), Mc3Error> {
        self.channel = channel;
        self.pool = ChainPool::new(
            &self.base,
            self.config.ladder.chains,
            self.channel.rank(),
            self.channel.num_workers(),
            self.ladder.heats(),
            self.active_index,
        )?;
        self.ladder.reset_statistics();
        Ok(())
    }

    /// Gathers a full-state checkpoint on the coordinator.
    pub fn checkpoint(&self) -> Result<Option<EngineCheckpoint>, Mc3Error> {
        let chains = self.pool.chains();
        let mut contributions = Vec::new();
        for slot in self.pool.slots() {
            if slot.lead_owner() == self.pool.worker() {
                if let Some(chain) = slot.handle() {
                    contributions.push((slot.index(), chain.checkpoint()?));
                }
            }
        }
        let payloads = sync::gather(&self.channel, contributions, chains)?;
        match payloads {
            Some(chain_payloads) => Ok(Some(checkpoint::build(
                &self.config,
                self.pool.burnin_generation(),
                self.pool.sampling_generation(),
                self.active_index,
                self.ladder.heats().to_vec(),
                self.ladder.statistics().clone(),
                chain_payloads,
            )?)),
            None => Ok(None),
        }
    }

    /// Restores every worker from a coordinator-held checkpoint.
    pub fn restore(&mut self, source: Option<EngineCheckpoint>) -> Result<(), Mc3Error> {
        let payload: EngineCheckpoint = sync::broadcast(&self.channel, 0, source)?;
        let chains = self.pool.chains();
        if payload.chains.len() != chains || payload.heats.len() != chains {
            return Err(Mc3Error::Serde(
                ErrorInfo::new("restore-shape", "checkpoint does not match the configured pool")
                    .with_context("chains", chains.to_string())
                    .with_context("restored", payload.chains.len().to_string()),
            ));
        }
        self.ladder.apply_heats(payload.heats.clone())?;
        self.ladder.set_statistics(payload.statistics.clone())?;
        self.active_index = payload.active_index;
        self.pool
            .set_counters(payload.burnin_generation, payload.sampling_generation);
        for (chain, chain_payload) in payload.chains.iter().enumerate() {
            self.pool.restore_chain(chain, chain_payload)?;
            self.pool
                .publish(chain, payload.heats[chain], chain == payload.active_index);
        }
        Ok(())
    }

    /// Builds the end-of-run report on the coordinator.
    pub fn report(&self) -> Result<Option<RunReport>, Mc3Error> {
        let records = match self.cold_tuning_records()? {
            Some(records) => records,
            None => return Ok(None),
        };
        let move_acceptance = records
            .iter()
            .map(|record| (record.name.clone(), record.total_acceptance()))
            .collect();
        let stats = self.ladder.statistics();
        let pair_rates = (1..self.pool.chains())
            .map(|rank| {
                let attempted = stats.attempted_between(rank - 1, rank);
                if attempted == 0 {
                    0.0
                } else {
                    stats.accepted_between(rank - 1, rank) as f64 / attempted as f64
                }
            })
            .collect();
        let swap_rate = if stats.total_attempted() == 0 {
            0.0
        } else {
            stats.total_accepted() as f64 / stats.total_attempted() as f64
        };
        Ok(Some(RunReport {
            schema: SchemaVersion::default(),
            provenance: checkpoint::provenance(&self.config)?,
            label: self.config.seed_policy.label.clone(),
            chains: self.pool.chains(),
            burnin_generations: self.pool.burnin_generation(),
            sampling_generations: self.pool.sampling_generation(),
            final_heats: self.ladder.heats().to_vec(),
            cold_chain: self.active_index,
            swap_rate,
            pair_rates,
            move_acceptance,
            strategy: self.strategy_description(),
        }))
    }

    fn check_swap_triggers(&mut self) -> Result<(), Mc3Error> {
        if self.pool.chains() < 2 {
            return Ok(());
        }
        let generation = self.pool.active_generation();
        let (first, second) = self.config.swap_intervals();
        match self.config.swap.method {
            SwapMethod::Neighbor => {
                if generation % first == 0 {
                    self.swap_round(SwapTopology::Neighbor, 0)?;
                }
            }
            SwapMethod::Random => {
                if generation % first == 0 {
                    self.swap_round(SwapTopology::Random, 0)?;
                }
            }
            SwapMethod::Both => {
                if generation % first == 0 {
                    self.swap_round(SwapTopology::Neighbor, 0)?;
                }
                if generation % second == 0 {
                    self.swap_round(SwapTopology::Random, 1)?;
                }
            }
        }
        Ok(())
    }

    fn swap_round(&mut self, topology: SwapTopology, round: usize) -> Result<(), Mc3Error> {
        let chains = self.pool.chains();
        let generation = self.pool.active_generation();
        let posteriors = sync::gather(
            &self.channel,
            self.pool
                .lead_contributions(|chain| chain.log_posterior(false)),
            chains,
        )?;
        let heats = sync::gather(
            &self.channel,
            self.pool.lead_contributions(|chain| chain.heat()),
            chains,
        )?;
        let decided = match (posteriors, heats) {
            (Some(ln_posteriors), Some(mut heats)) => {
                let mut active = self.active_index;
                let outcomes = swap::decide_round(
                    topology,
                    self.config.swap.mode,
                    &mut heats,
                    &ln_posteriors,
                    &mut active,
                    self.master_seed(),
                    generation,
                    round,
                );
                Some(SwapRound {
                    outcomes,
                    heats,
                    active_index: active,
                })
            }
            _ => None,
        };
        let published = sync::broadcast(&self.channel, 0, decided)?;
        self.apply_swap_round(&published)?;
        if published.outcomes.iter().any(|outcome| outcome.accepted) {
            self.exchange_tuning_records(&published)?;
        }
        Ok(())
    }

    fn apply_swap_round(&mut self, round: &SwapRound) -> Result<(), Mc3Error> {
        if round.heats.len() != self.pool.chains() {
            return Err(Mc3Error::Sync(
                ErrorInfo::new("heats-apply-length", "published heats do not cover the pool")
                    .with_context("expected", self.pool.chains().to_string())
                    .with_context("received", round.heats.len().to_string()),
            ));
        }
        for outcome in &round.outcomes {
            self.ladder
                .record_attempt(outcome.rank_j, outcome.rank_k, outcome.accepted);
            if outcome.accepted {
                self.pool.mark(outcome.chain_j, SlotSync::PendingSwap)?;
                self.pool.mark(outcome.chain_k, SlotSync::PendingSwap)?;
            }
        }
        self.ladder.apply_heats(round.heats.clone())?;
        self.active_index = round.active_index;
        for chain in 0..self.pool.chains() {
            self.pool
                .publish(chain, round.heats[chain], chain == round.active_index);
        }
        Ok(())
    }

    /// Accepted exchanges carry move-tuning bookkeeping along with the heats,
    /// so a chain keeps adapting against the statistics its new heat
    /// accumulated.
    fn exchange_tuning_records(&mut self, round: &SwapRound) -> Result<(), Mc3Error> {
        let chains = self.pool.chains();
        let contributions = self.pool.lead_contributions(|chain| chain.tuning_records());
        let gathered = sync::gather(&self.channel, contributions, chains)?;
        let swapped = match gathered {
            Some(mut records) => {
                for outcome in round.outcomes.iter().filter(|outcome| outcome.accepted) {
                    check_move_parity(
                        &records[outcome.chain_j],
                        &records[outcome.chain_k],
                        outcome,
                    )?;
                    records.swap(outcome.chain_j, outcome.chain_k);
                }
                Some(records)
            }
            None => None,
        };
        let published: Vec<Vec<MoveTuningRecord>> = sync::broadcast(&self.channel, 0, swapped)?;
        if published.len() != chains {
            return Err(Mc3Error::Sync(
                ErrorInfo::new(
                    "records-apply-length",
                    "published records do not cover the pool",
                )
                .with_context("expected", chains.to_string())
                .with_context("received", published.len().to_string()),
            ));
        }
        for (chain, records) in published.into_iter().enumerate() {
            self.pool.set_records(chain, records)?;
        }
        Ok(())
    }

    fn tune_ladder(&mut self) -> Result<(), Mc3Error> {
        if self.pool.chains() < 2 {
            return Ok(());
        }
        let chains = self.pool.chains();
        let gathered = sync::gather(
            &self.channel,
            self.pool.lead_contributions(|chain| chain.heat()),
            chains,
        )?;
        let proposal = match gathered {
            Some(heats) => {
                self.ladder.apply_heats(heats)?;
                Some(self.ladder.tuned_heats())
            }
            None => None,
        };
        let published: Vec<f64> = sync::broadcast(&self.channel, 0, proposal)?;
        if published.len() != chains {
            return Err(Mc3Error::Sync(
                ErrorInfo::new("heats-apply-length", "published heats do not cover the pool")
                    .with_context("expected", chains.to_string())
                    .with_context("received", published.len().to_string()),
            ));
        }
        for chain in 0..chains {
            self.pool.mark(chain, SlotSync::Tuned)?;
        }
        self.ladder.apply_heats(published.clone())?;
        self.ladder.reset_statistics();
        for chain in 0..chains {
            self.pool
                .publish(chain, published[chain], chain == self.active_index);
        }
        Ok(())
    }

    fn record_trace(&mut self) -> Result<(), Mc3Error> {
        let chains = self.pool.chains();
        let gathered = sync::gather(
            &self.channel,
            self.pool.lead_contributions(|chain| {
                (chain.log_posterior(false), chain.log_posterior(true))
            }),
            chains,
        )?;
        if let Some(values) = gathered {
            let (cold_posterior, cold_likelihood) = values[self.active_index];
            self.trace.push(TraceRow {
                generation: self.pool.sampling_generation(),
                cold_chain: self.active_index,
                cold_posterior,
                cold_likelihood,
                heats: self.ladder.heats().to_vec(),
            });
        }
        Ok(())
    }
}

/// Two chains may exchange bookkeeping only when they run the same move set.
fn check_move_parity(
    lhs: &[MoveTuningRecord],
    rhs: &[MoveTuningRecord],
    outcome: &SwapOutcome,
) -> Result<(), Mc3Error> {
    if lhs.len() != rhs.len() {
        return Err(Mc3Error::Tuning(
            ErrorInfo::new("move-count", "swapped chains disagree on their move count")
                .with_context("chain_j", outcome.chain_j.to_string())
                .with_context("chain_k", outcome.chain_k.to_string()),
        ));
    }
    for (lhs_record, rhs_record) in lhs.iter().zip(rhs.iter()) {
        if lhs_record.name != rhs_record.name {
            return Err(Mc3Error::Tuning(
                ErrorInfo::new("move-name", "swapped chains disagree on a move name")
                    .with_context("lhs", lhs_record.name.clone())
                    .with_context("rhs", rhs_record.name.clone()),
            ));
        }
        if lhs_record.is_tunable() != rhs_record.is_tunable() {
            return Err(Mc3Error::Tuning(
                ErrorInfo::new(
                    "move-parameter",
                    "swapped chains disagree on a move's tunability",
                )
                .with_context("name", lhs_record.name.clone()),
            ));
        }
    }
    Ok(())
}
