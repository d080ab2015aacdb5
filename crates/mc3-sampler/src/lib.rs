#![deny(missing_docs)]
#![doc = "Reference Metropolis sampler implementing the tempered-chain contract."]

/// The Metropolis chain over a target density.
pub mod chain;
/// Tunable proposal distributions.
pub mod moves;
/// Target densities to sample from.
pub mod target;

pub use chain::MetropolisChain;
pub use moves::{MoveKind, ProposalMove};
pub use target::{GaussianMixture, StandardGaussian, TargetDensity};
