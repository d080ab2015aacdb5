use std::ops::Range;

use mc3_core::errors::ErrorInfo;
use mc3_core::{Mc3Error, MoveTuningRecord, TemperedChain};

/// Synchronization state of a chain slot between barriers.
///
/// A slot leaves `Clean` only while a broadcast decision is being applied and
/// returns to it once the published heats land in the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSync {
    /// The slot agrees with the last published ladder state.
    Clean,
    /// An accepted exchange has been broadcast but not yet applied here.
    PendingSwap,
    /// A tuned ladder has been broadcast but not yet applied here.
    Tuned,
}

impl SlotSync {
    fn label(self) -> &'static str {
        match self {
            SlotSync::Clean => "clean",
            SlotSync::PendingSwap => "pending-swap",
            SlotSync::Tuned => "tuned",
        }
    }

    /// Marking is only legal from `Clean`, except re-marking a swap
    /// participant that features in several outcomes of one round.
    fn begin(self, next: SlotSync) -> Option<SlotSync> {
        match (self, next) {
            (SlotSync::Clean, SlotSync::PendingSwap) => Some(SlotSync::PendingSwap),
            (SlotSync::Clean, SlotSync::Tuned) => Some(SlotSync::Tuned),
            (SlotSync::PendingSwap, SlotSync::PendingSwap) => Some(SlotSync::PendingSwap),
            _ => None,
        }
    }
}

/// One chain position within the coupled ensemble.
///
/// Every worker holds a slot for every chain; only owners populate `handle`.
#[derive(Debug)]
pub struct ChainSlot<C> {
    index: usize,
    owners: Range<usize>,
    handle: Option<C>,
    sync: SlotSync,
}

impl<C> ChainSlot<C> {
    /// Chain index of this slot.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Workers responsible for advancing this chain.
    pub fn owners(&self) -> Range<usize> {
        self.owners.clone()
    }

    /// The owner that reports on this chain's behalf.
    pub fn lead_owner(&self) -> usize {
        self.owners.start
    }

    /// The local handle, present only on owning workers.
    pub fn handle(&self) -> Option<&C> {
        self.handle.as_ref()
    }

    /// Mutable access to the local handle.
    pub fn handle_mut(&mut self) -> Option<&mut C> {
        self.handle.as_mut()
    }

    /// Current synchronization state.
    pub fn sync_state(&self) -> SlotSync {
        self.sync
    }
}

/// Worker ranges for every chain. Chain `i` of `chains` spans
/// `[i * workers / chains, (i + 1) * workers / chains)` in integer division,
/// widened to at least one worker. Leftover workers replicate the chains
/// whose range covers them.
pub fn partition(chains: usize, workers: usize) -> Vec<Range<usize>> {
    let mut ranges = Vec::with_capacity(chains);
    for chain in 0..chains {
        let start = chain * workers / chains;
        let end = ((chain + 1) * workers / chains).max(start + 1);
        ranges.push(start..end);
    }
    ranges
}

/// The local view of every chain in the ensemble, plus generation counters.
#[derive(Debug)]
pub struct ChainPool<C> {
    slots: Vec<ChainSlot<C>>,
    worker: usize,
    workers: usize,
    burnin_generation: u64,
    sampling_generation: u64,
}

impl<C: TemperedChain + Clone> ChainPool<C> {
    /// Builds the pool for one worker: clones `base` into every owned slot,
    /// assigning chain indices, initial heats and the active flag.
    pub fn new(
        base: &C,
        chains: usize,
        worker: usize,
        workers: usize,
        heats: &[f64],
        active: usize,
    ) -> Result<Self, Mc3Error> {
        if chains == 0 {
            return Err(Mc3Error::Config(ErrorInfo::new(
                "chains-zero",
                "at least one chain is required",
            )));
        }
        if workers == 0 || worker >= workers {
            return Err(Mc3Error::Config(
                ErrorInfo::new("worker-rank", "worker rank outside the worker count")
                    .with_context("worker", worker.to_string())
                    .with_context("workers", workers.to_string()),
            ));
        }
        if heats.len() != chains {
            return Err(Mc3Error::Config(
                ErrorInfo::new("heats-length", "initial heats must cover every chain")
                    .with_context("chains", chains.to_string())
                    .with_context("heats", heats.len().to_string()),
            ));
        }
        let mut slots = Vec::with_capacity(chains);
        for (index, owners) in partition(chains, workers).into_iter().enumerate() {
            let handle = if owners.contains(&worker) {
                let mut chain = base.clone();
                chain.set_chain_index(index);
                chain.set_heat(heats[index]);
                chain.set_active(index == active);
                Some(chain)
            } else {
                None
            };
            slots.push(ChainSlot {
                index,
                owners,
                handle,
                sync: SlotSync::Clean,
            });
        }
        Ok(Self {
            slots,
            worker,
            workers,
            burnin_generation: 0,
            sampling_generation: 0,
        })
    }

    /// Number of chains in the ensemble.
    pub fn chains(&self) -> usize {
        self.slots.len()
    }

    /// This worker's rank.
    pub fn worker(&self) -> usize {
        self.worker
    }

    /// Total number of workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Slot for one chain.
    pub fn slot(&self, chain: usize) -> &ChainSlot<C> {
        &self.slots[chain]
    }

    /// All slots in chain order.
    pub fn slots(&self) -> impl Iterator<Item = &ChainSlot<C>> {
        self.slots.iter()
    }

    /// Whether this worker advances the chain.
    pub fn owns(&self, chain: usize) -> bool {
        self.slots[chain].owners.contains(&self.worker)
    }

    /// Whether this worker reports on the chain's behalf.
    pub fn leads(&self, chain: usize) -> bool {
        self.slots[chain].lead_owner() == self.worker
    }

    /// Advances every owned chain by one cycle, then bumps the phase counter.
    pub fn advance(&mut self, sampling: bool) -> Result<(), Mc3Error> {
        for slot in &mut self.slots {
            if let Some(chain) = slot.handle.as_mut() {
                chain.advance_cycle(sampling)?;
            }
        }
        if sampling {
            self.sampling_generation += 1;
        } else {
            self.burnin_generation += 1;
        }
        Ok(())
    }

    /// Burn-in cycles completed so far.
    pub fn burnin_generation(&self) -> u64 {
        self.burnin_generation
    }

    /// Sampling cycles completed so far.
    pub fn sampling_generation(&self) -> u64 {
        self.sampling_generation
    }

    /// The counter interval checks run against: burn-in until the first
    /// sampling cycle completes, the sampling counter afterwards.
    pub fn active_generation(&self) -> u64 {
        if self.sampling_generation == 0 {
            self.burnin_generation
        } else {
            self.sampling_generation
        }
    }

    /// Zeroes both phase counters.
    pub fn reset_counters(&mut self) {
        self.burnin_generation = 0;
        self.sampling_generation = 0;
    }

    /// Overwrites both phase counters, as restores do.
    pub fn set_counters(&mut self, burnin: u64, sampling: u64) {
        self.burnin_generation = burnin;
        self.sampling_generation = sampling;
    }

    /// `(chain, value)` pairs for every chain this worker leads.
    pub fn lead_contributions<T, F: Fn(&C) -> T>(&self, read: F) -> Vec<(usize, T)> {
        self.slots
            .iter()
            .filter(|slot| slot.lead_owner() == self.worker)
            .filter_map(|slot| slot.handle.as_ref().map(|chain| (slot.index, read(chain))))
            .collect()
    }

    /// Marks a slot as holding an unapplied broadcast decision.
    pub fn mark(&mut self, chain: usize, next: SlotSync) -> Result<(), Mc3Error> {
        let slot = &mut self.slots[chain];
        match slot.sync.begin(next) {
            Some(state) => {
                slot.sync = state;
                Ok(())
            }
            None => Err(Mc3Error::Sync(
                ErrorInfo::new("slot-transition", "chain slot cannot enter the requested state")
                    .with_context("chain", chain.to_string())
                    .with_context("from", slot.sync.label().to_string())
                    .with_context("to", next.label().to_string()),
            )),
        }
    }

    /// Applies a published heat and active flag, returning the slot to clean.
    pub fn publish(&mut self, chain: usize, heat: f64, active: bool) {
        let slot = &mut self.slots[chain];
        if let Some(handle) = slot.handle.as_mut() {
            handle.set_heat(heat);
            handle.set_active(active);
        }
        slot.sync = SlotSync::Clean;
    }

    /// Overwrites the tuning records of an owned chain.
    pub fn set_records(
        &mut self,
        chain: usize,
        records: Vec<MoveTuningRecord>,
    ) -> Result<(), Mc3Error> {
        if let Some(handle) = self.slots[chain].handle.as_mut() {
            handle.set_tuning_records(records)?;
        }
        Ok(())
    }

    /// Lets every owned chain retune its own proposal distributions.
    pub fn tune_local_moves(&mut self) {
        for slot in &mut self.slots {
            if let Some(chain) = slot.handle.as_mut() {
                chain.tune();
            }
        }
    }

    /// Restores an owned chain from a checkpoint payload.
    pub fn restore_chain(&mut self, chain: usize, payload: &str) -> Result<(), Mc3Error> {
        if let Some(handle) = self.slots[chain].handle.as_mut() {
            handle.restore(payload)?;
        }
        Ok(())
    }
}
