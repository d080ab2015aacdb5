use std::collections::BTreeMap;
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use mc3_core::errors::ErrorInfo;
use mc3_core::provenance::{RunProvenance, SchemaVersion};
use mc3_core::Mc3Error;
use serde::{Deserialize, Serialize};

/// One sampled view of the cold chain and the ladder around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRow {
    /// Sampling generation when the row was recorded.
    pub generation: u64,
    /// Chain holding heat 1.0 at that generation.
    pub cold_chain: usize,
    /// Full log posterior of the cold chain.
    pub cold_posterior: f64,
    /// Log likelihood of the cold chain.
    pub cold_likelihood: f64,
    /// Heats of every chain, indexed by chain.
    pub heats: Vec<f64>,
}

/// Collects trace rows on the coordinating worker.
#[derive(Debug, Default)]
pub struct TraceRecorder {
    rows: Vec<TraceRow>,
}

impl TraceRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one row.
    pub fn push(&mut self, row: TraceRow) {
        self.rows.push(row);
    }

    /// Immutable view over the recorded rows.
    pub fn rows(&self) -> &[TraceRow] {
        &self.rows
    }

    /// Discards every recorded row.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Writes the trace to a CSV file, one heat column per chain.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        let chains = self.rows.first().map(|row| row.heats.len()).unwrap_or(0);
        let mut header = String::from("generation,cold_chain,cold_posterior,cold_likelihood");
        for chain in 0..chains {
            header.push_str(&format!(",heat_{chain}"));
        }
        writeln!(file, "{header}")?;
        for row in &self.rows {
            let mut line = format!(
                "{},{},{:.6},{:.6}",
                row.generation, row.cold_chain, row.cold_posterior, row.cold_likelihood
            );
            for heat in &row.heats {
                line.push_str(&format!(",{heat:.6}"));
            }
            writeln!(file, "{line}")?;
        }
        Ok(())
    }
}

/// Structured summary of a completed coupled run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Version of this report schema.
    pub schema: SchemaVersion,
    /// Reproducibility descriptor for the run.
    pub provenance: RunProvenance,
    /// Optional run label captured from the configuration.
    pub label: Option<String>,
    /// Number of coupled chains.
    pub chains: usize,
    /// Burn-in generations completed.
    pub burnin_generations: u64,
    /// Sampling generations completed.
    pub sampling_generations: u64,
    /// Heats of every chain at the end of the run.
    pub final_heats: Vec<f64>,
    /// Chain holding heat 1.0 at the end of the run.
    pub cold_chain: usize,
    /// Accepted fraction over every attempt in the last statistics epoch.
    pub swap_rate: f64,
    /// Accepted fraction per adjacent rank pair, coldest pair first.
    pub pair_rates: Vec<f64>,
    /// Lifetime acceptance rate per move of the cold chain.
    pub move_acceptance: BTreeMap<String, f64>,
    /// Human-readable description of the coupling strategy.
    pub strategy: String,
}

impl RunReport {
    /// Writes the report to a JSON file.
    pub fn write(&self, path: &Path) -> Result<(), Mc3Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                Mc3Error::Serde(
                    ErrorInfo::new("report-mkdir", err.to_string())
                        .with_context("path", parent.display().to_string()),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            Mc3Error::Serde(
                ErrorInfo::new("report-serialize", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        fs::write(path, json).map_err(|err| {
            Mc3Error::Serde(
                ErrorInfo::new("report-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Loads a report from disk.
    pub fn load(path: &Path) -> Result<Self, Mc3Error> {
        let contents = fs::read_to_string(path).map_err(|err| {
            Mc3Error::Serde(
                ErrorInfo::new("report-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            Mc3Error::Serde(
                ErrorInfo::new("report-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }
}
