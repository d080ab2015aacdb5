use std::fs;
use std::sync::Arc;

use mc3_engine::checkpoint::{checkpoint_path, config_digest};
use mc3_engine::report::{ladder_summary, operator_summary};
use mc3_engine::{CoupledChains, CoupledConfig, EngineCheckpoint, LocalChannel};
use mc3_sampler::{MetropolisChain, StandardGaussian};
use tempfile::tempdir;

fn gaussian_base(seed: u64) -> MetropolisChain<StandardGaussian> {
    MetropolisChain::with_default_moves(Arc::new(StandardGaussian::new(2)), seed).unwrap()
}

fn coupled_config() -> CoupledConfig {
    let mut config = CoupledConfig::default();
    config.generations = 30;
    config.burnin = 10;
    config.ladder.chains = 3;
    config.swap.interval = 2;
    config.seed_policy.master_seed = 888;
    config.seed_policy.label = Some("roundtrip".to_string());
    config
}

#[test]
fn resuming_a_checkpoint_matches_the_uninterrupted_run() {
    let config = coupled_config();
    let seed = config.seed_policy.master_seed;

    let mut full =
        CoupledChains::new(config.clone(), gaussian_base(seed), LocalChannel::new()).unwrap();
    full.burnin(10).unwrap();
    full.run(15).unwrap();
    let snapshot = full.checkpoint().unwrap().unwrap();
    assert_eq!(snapshot.sampling_generation, 15);
    assert_eq!(snapshot.burnin_generation, 10);
    full.run(15).unwrap();

    let mut resumed =
        CoupledChains::new(config, gaussian_base(seed), LocalChannel::new()).unwrap();
    resumed.restore(Some(snapshot)).unwrap();
    assert_eq!(resumed.pool().sampling_generation(), 15);
    resumed.run(15).unwrap();

    assert_eq!(full.ladder().heats(), resumed.ladder().heats());
    assert_eq!(full.active_chain(), resumed.active_chain());
    assert_eq!(
        full.model_ln_probability().unwrap(),
        resumed.model_ln_probability().unwrap()
    );
    let full_records = full.cold_tuning_records().unwrap().unwrap();
    let resumed_records = resumed.cold_tuning_records().unwrap().unwrap();
    assert_eq!(full_records.len(), resumed_records.len());
    for (lhs, rhs) in full_records.iter().zip(resumed_records.iter()) {
        assert!(lhs.matches(rhs), "records diverged for {}", lhs.name);
    }
}

#[test]
fn checkpoint_files_roundtrip_through_disk() {
    let config = coupled_config();
    let seed = config.seed_policy.master_seed;
    let dir = tempdir().unwrap();

    let mut engine =
        CoupledChains::new(config, gaussian_base(seed), LocalChannel::new()).unwrap();
    engine.burnin(5).unwrap();
    engine.run(7).unwrap();

    let snapshot = engine.checkpoint().unwrap().unwrap();
    let path = checkpoint_path(dir.path(), snapshot.sampling_generation);
    assert!(path.to_string_lossy().ends_with("ckpt_00000007.json"));
    snapshot.store(&path).unwrap();

    let loaded = EngineCheckpoint::load(&path).unwrap();
    assert_eq!(loaded.heats, snapshot.heats);
    assert_eq!(loaded.active_index, snapshot.active_index);
    assert_eq!(loaded.sampling_generation, snapshot.sampling_generation);
    assert_eq!(loaded.chains, snapshot.chains);
    assert_eq!(loaded.statistics, snapshot.statistics);
    assert_eq!(loaded.provenance.seed, 888);
}

#[test]
fn restores_reject_mismatched_pool_shapes() {
    let config = coupled_config();
    let seed = config.seed_policy.master_seed;
    let mut engine =
        CoupledChains::new(config.clone(), gaussian_base(seed), LocalChannel::new()).unwrap();
    engine.run(4).unwrap();
    let mut snapshot = engine.checkpoint().unwrap().unwrap();
    snapshot.chains.pop();

    let mut other =
        CoupledChains::new(config, gaussian_base(seed), LocalChannel::new()).unwrap();
    let err = other.restore(Some(snapshot)).unwrap_err();
    assert_eq!(err.info().code, "restore-shape");
}

#[test]
fn trace_csv_lists_one_heat_column_per_chain() {
    let config = coupled_config();
    let seed = config.seed_policy.master_seed;
    let dir = tempdir().unwrap();

    let mut engine =
        CoupledChains::new(config, gaussian_base(seed), LocalChannel::new()).unwrap();
    engine.run(5).unwrap();

    let path = dir.path().join("trace.csv");
    engine.trace().write_csv(&path).unwrap();
    let contents = fs::read_to_string(&path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(
        lines.next().unwrap(),
        "generation,cold_chain,cold_posterior,cold_likelihood,heat_0,heat_1,heat_2"
    );
    assert_eq!(lines.count(), 5);
}

#[test]
fn reports_roundtrip_through_disk() {
    let config = coupled_config();
    let seed = config.seed_policy.master_seed;
    let dir = tempdir().unwrap();

    let mut engine =
        CoupledChains::new(config, gaussian_base(seed), LocalChannel::new()).unwrap();
    engine.burnin(4).unwrap();
    engine.run(8).unwrap();

    let report = engine.report().unwrap().unwrap();
    let path = dir.path().join("report.json");
    report.write(&path).unwrap();

    let loaded = mc3_engine::RunReport::load(&path).unwrap();
    assert_eq!(loaded.chains, report.chains);
    assert_eq!(loaded.label.as_deref(), Some("roundtrip"));
    assert_eq!(loaded.final_heats, report.final_heats);
    assert_eq!(loaded.sampling_generations, 8);
    assert_eq!(loaded.move_acceptance.len(), 3);
}

#[test]
fn summaries_render_one_row_per_move_and_rank() {
    let config = coupled_config();
    let seed = config.seed_policy.master_seed;
    let mut engine =
        CoupledChains::new(config, gaussian_base(seed), LocalChannel::new()).unwrap();
    engine.run(4).unwrap();

    let records = engine.cold_tuning_records().unwrap().unwrap();
    let operators = operator_summary(&records);
    assert_eq!(operators.lines().count(), 2 + records.len());
    assert!(operators.lines().next().unwrap().contains("Weight"));
    assert!(operators.contains("slide:x0"));

    let ladder = ladder_summary(engine.ladder());
    assert_eq!(ladder.lines().count(), 2 + 3);
    assert!(ladder.contains("1.00000"));
}

#[test]
fn config_digests_track_configuration_changes() {
    let config = coupled_config();
    let digest = config_digest(&config).unwrap();
    assert_eq!(digest, config_digest(&config.clone()).unwrap());

    let mut changed = config;
    changed.seed_policy.master_seed = 999;
    assert_ne!(digest, config_digest(&changed).unwrap());
}
