#![deny(missing_docs)]
#![doc = "Coordination engine for Metropolis-coupled chains: heat ladders, swap moves, ladder tuning and worker synchronization."]

/// Engine checkpoint payloads and save/load helpers.
pub mod checkpoint;
/// Run configuration schema, defaults and validation.
pub mod config;
/// Deterministic seed derivation for swap decisions.
pub mod determinism;
/// The outer burn-in and sampling driver.
pub mod engine;
/// Heat assignment, the derived rank view and adaptive ladder tuning.
pub mod ladder;
/// Chain slots, worker ownership and local advancement.
pub mod pool;
/// Plain-text summaries of operators and the swap ladder.
pub mod report;
/// The cross-chain exchange test and pair selection.
pub mod swap;
/// Worker synchronization channels plus gather and broadcast rounds.
pub mod sync;
/// Trace recording and the end-of-run report.
pub mod trace;

pub use checkpoint::EngineCheckpoint;
pub use config::{
    CoupledConfig, LadderConfig, SeedPolicy, SwapConfig, SwapMethod, SwapMode, TuningConfig,
};
pub use engine::CoupledChains;
pub use ladder::{HeatLadder, SwapStatistics, HEAT_FLOOR};
pub use pool::{ChainPool, ChainSlot, SlotSync};
pub use swap::{SwapOutcome, SwapRound, SwapTopology};
pub use sync::{LocalChannel, SyncChannel, ThreadedChannel};
pub use trace::{RunReport, TraceRecorder, TraceRow};
