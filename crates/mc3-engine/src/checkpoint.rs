use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use mc3_core::errors::ErrorInfo;
use mc3_core::provenance::{RunProvenance, SchemaVersion};
use mc3_core::Mc3Error;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::CoupledConfig;
use crate::ladder::SwapStatistics;

/// Serializable full state of a coupled run at one generation.
///
/// Chain states are carried as the opaque payload strings the chains
/// themselves produced, so the engine never needs to understand them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineCheckpoint {
    /// Version of this checkpoint schema.
    pub schema: SchemaVersion,
    /// Reproducibility descriptor for the run.
    pub provenance: RunProvenance,
    /// Configuration snapshot associated with the run.
    pub config: CoupledConfig,
    /// Burn-in generations completed when the checkpoint was taken.
    pub burnin_generation: u64,
    /// Sampling generations completed when the checkpoint was taken.
    pub sampling_generation: u64,
    /// Chain holding heat 1.0.
    pub active_index: usize,
    /// Heats of every chain, indexed by chain.
    pub heats: Vec<f64>,
    /// Swap statistics of the current epoch.
    pub statistics: SwapStatistics,
    /// Per-chain payloads, indexed by chain.
    pub chains: Vec<String>,
}

impl EngineCheckpoint {
    /// Restores the payload from disk.
    pub fn load(path: &Path) -> Result<Self, Mc3Error> {
        let contents = fs::read_to_string(path).map_err(|err| {
            Mc3Error::Serde(
                ErrorInfo::new("checkpoint-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            Mc3Error::Serde(
                ErrorInfo::new("checkpoint-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Writes the payload to disk.
    pub fn store(&self, path: &Path) -> Result<(), Mc3Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                Mc3Error::Serde(
                    ErrorInfo::new("checkpoint-mkdir", err.to_string())
                        .with_context("path", parent.display().to_string()),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            Mc3Error::Serde(
                ErrorInfo::new("checkpoint-serialize", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        fs::write(path, json).map_err(|err| {
            Mc3Error::Serde(
                ErrorInfo::new("checkpoint-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }
}

/// Assembles a checkpoint from the coordinator's gathered state.
pub fn build(
    config: &CoupledConfig,
    burnin_generation: u64,
    sampling_generation: u64,
    active_index: usize,
    heats: Vec<f64>,
    statistics: SwapStatistics,
    chains: Vec<String>,
) -> Result<EngineCheckpoint, Mc3Error> {
    Ok(EngineCheckpoint {
        schema: SchemaVersion::default(),
        provenance: provenance(config)?,
        config: config.clone(),
        burnin_generation,
        sampling_generation,
        active_index,
        heats,
        statistics,
        chains,
    })
}

/// Provenance block recorded in checkpoints and reports.
pub fn provenance(config: &CoupledConfig) -> Result<RunProvenance, Mc3Error> {
    let mut tool_versions = std::collections::BTreeMap::new();
    tool_versions.insert(
        "mc3-engine".to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    Ok(RunProvenance {
        input_hash: config_digest(config)?,
        seed: config.seed_policy.master_seed,
        created_at: Utc::now().to_rfc3339(),
        tool_versions,
    })
}

/// SHA-256 digest of the canonical JSON form of a configuration.
pub fn config_digest(config: &CoupledConfig) -> Result<String, Mc3Error> {
    let json = serde_json::to_vec(config)
        .map_err(|err| Mc3Error::Serde(ErrorInfo::new("config-digest", err.to_string())))?;
    let mut hasher = Sha256::new();
    hasher.update(&json);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Deterministic checkpoint file path for one generation.
pub fn checkpoint_path(root: &Path, generation: u64) -> PathBuf {
    root.join(format!("ckpt_{generation:08}.json"))
}
