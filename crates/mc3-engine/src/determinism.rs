use mc3_core::derive_substream_seed;

/// Derives the deterministic seed for one swap attempt.
///
/// `round` distinguishes the two independent triggers that can fire on the
/// same generation when both topologies are configured; `attempt` numbers the
/// pairs tried within one round. Every worker derives the same stream, so
/// decisions replayed from a broadcast match the coordinator's bit for bit.
pub fn swap_seed(master_seed: u64, generation: u64, round: usize, attempt: usize) -> u64 {
    derive_substream_seed(
        master_seed ^ 0x5A5A_5A5A_5A5A_5A5A,
        generation << 16 | (round as u64) << 12 | attempt as u64,
    )
}
