use mc3_core::errors::ErrorInfo;
use mc3_core::Mc3Error;
use serde::{Deserialize, Serialize};

/// YAML-configurable parameters governing a coupled-chain run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoupledConfig {
    /// Number of sampling generations to execute (post burn-in).
    pub generations: usize,
    /// Number of burn-in generations discarded before sampling starts.
    #[serde(default)]
    pub burnin: usize,
    /// Heat ladder shape.
    #[serde(default)]
    pub ladder: LadderConfig,
    /// Swap topology and trigger settings.
    #[serde(default)]
    pub swap: SwapConfig,
    /// Adaptive tuning behaviour during burn-in.
    #[serde(default)]
    pub tuning: TuningConfig,
    /// Interval in generations between trace records.
    #[serde(default = "default_report_interval")]
    pub report_interval: usize,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
}

fn default_report_interval() -> usize {
    1
}

impl Default for CoupledConfig {
    fn default() -> Self {
        Self {
            generations: 1000,
            burnin: 0,
            ladder: LadderConfig::default(),
            swap: SwapConfig::default(),
            tuning: TuningConfig::default(),
            report_interval: default_report_interval(),
            seed_policy: SeedPolicy::default(),
        }
    }
}

impl CoupledConfig {
    /// Parses a configuration from YAML text and validates it.
    pub fn from_yaml_str(text: &str) -> Result<Self, Mc3Error> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|err| {
                Mc3Error::Serde(ErrorInfo::new("config-parse", err.to_string()))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), Mc3Error> {
        if self.ladder.chains == 0 {
            return Err(Mc3Error::Config(ErrorInfo::new(
                "chains-zero",
                "at least one chain is required",
            )));
        }
        if !(self.ladder.delta > 0.0) {
            return Err(Mc3Error::Config(
                ErrorInfo::new("delta-nonpositive", "heat increment must be positive")
                    .with_context("delta", self.ladder.delta.to_string()),
            ));
        }
        if let Some(heats) = &self.ladder.heats {
            if heats.len() != self.ladder.chains {
                return Err(Mc3Error::Config(
                    ErrorInfo::new("heats-length", "explicit heats must cover every chain")
                        .with_context("chains", self.ladder.chains.to_string())
                        .with_context("heats", heats.len().to_string())
                        .with_hint("supply exactly one heat per chain"),
                ));
            }
            validate_heat_values(heats)?;
        }
        if self.swap.interval == 0 || self.swap.interval2 == Some(0) {
            return Err(Mc3Error::Config(ErrorInfo::new(
                "swap-interval-zero",
                "swap intervals must be at least one generation",
            )));
        }
        if !(self.tuning.target > 0.0 && self.tuning.target < 1.0) {
            return Err(Mc3Error::Config(
                ErrorInfo::new("tune-target-range", "swap target rate must lie in (0, 1)")
                    .with_context("target", self.tuning.target.to_string()),
            ));
        }
        if self.report_interval == 0 {
            return Err(Mc3Error::Config(ErrorInfo::new(
                "report-interval-zero",
                "report interval must be at least one generation",
            )));
        }
        Ok(())
    }

    /// Trigger intervals for the first and the second swap round.
    ///
    /// The second round inherits the first interval when none is configured.
    pub fn swap_intervals(&self) -> (u64, u64) {
        let first = self.swap.interval as u64;
        let second = self.swap.interval2.map(|i| i as u64).unwrap_or(first);
        (first, second)
    }
}

/// Rejects heat vectors the ladder cannot represent.
pub fn validate_heat_values(heats: &[f64]) -> Result<(), Mc3Error> {
    for &heat in heats {
        if !(heat > 0.0 && heat.is_finite()) {
            return Err(Mc3Error::Config(
                ErrorInfo::new("heats-positive", "every heat must be a positive finite value")
                    .with_context("heat", heat.to_string()),
            ));
        }
    }
    let mut sorted = heats.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    if sorted.first() != Some(&1.0) {
        return Err(Mc3Error::Config(
            ErrorInfo::new("heats-cold", "the largest heat must be exactly 1.0")
                .with_hint("the cold chain samples the untempered posterior"),
        ));
    }
    if sorted.windows(2).any(|pair| pair[0] == pair[1]) {
        return Err(Mc3Error::Config(ErrorInfo::new(
            "heats-duplicate",
            "heats must be pairwise distinct",
        )));
    }
    Ok(())
}

/// Heat ladder construction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LadderConfig {
    /// Number of coupled chains, including the cold one.
    #[serde(default = "default_chains")]
    pub chains: usize,
    /// Heat increment: chain `i` starts at `1 / (1 + delta * i)`.
    #[serde(default = "default_delta")]
    pub delta: f64,
    /// Explicit ladder overriding the increment rule (sorted on load).
    #[serde(default)]
    pub heats: Option<Vec<f64>>,
}

fn default_chains() -> usize {
    4
}

fn default_delta() -> f64 {
    0.2
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            chains: default_chains(),
            delta: default_delta(),
            heats: None,
        }
    }
}

/// Swap trigger and topology settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapConfig {
    /// Generations between swap rounds.
    #[serde(default = "default_swap_interval")]
    pub interval: usize,
    /// Separate interval for the random round when both topologies run.
    #[serde(default)]
    pub interval2: Option<usize>,
    /// Which chains are eligible to exchange heats.
    #[serde(default)]
    pub method: SwapMethod,
    /// How many exchanges one trigger attempts.
    #[serde(default)]
    pub mode: SwapMode,
}

fn default_swap_interval() -> usize {
    10
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            interval: default_swap_interval(),
            interval2: None,
            method: SwapMethod::default(),
            mode: SwapMode::default(),
        }
    }
}

/// Supported swap pair topologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwapMethod {
    /// Exchange between chains adjacent in the heat ordering.
    Neighbor,
    /// Exchange between arbitrary chain pairs.
    Random,
    /// Run a neighbor round and an independent random round.
    Both,
}

impl Default for SwapMethod {
    fn default() -> Self {
        SwapMethod::Neighbor
    }
}

/// How many pairs one swap trigger attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwapMode {
    /// One attempted pair per trigger.
    Single,
    /// A full sweep over the topology's pair set per trigger.
    Multiple,
}

impl Default for SwapMode {
    fn default() -> Self {
        SwapMode::Single
    }
}

/// Adaptive tuning performed during burn-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningConfig {
    /// Whether the heat ladder adapts toward the target swap rate.
    #[serde(default)]
    pub tune_heats: bool,
    /// Target acceptance rate for adjacent-rank swaps.
    #[serde(default = "default_tune_target")]
    pub target: f64,
    /// Burn-in generations between tuning passes (0 disables them).
    #[serde(default = "default_tune_interval")]
    pub interval: usize,
    /// Whether chains retune their own proposal distributions.
    #[serde(default = "default_tune_moves")]
    pub tune_moves: bool,
}

fn default_tune_target() -> f64 {
    0.23
}

fn default_tune_interval() -> usize {
    100
}

fn default_tune_moves() -> bool {
    true
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            tune_heats: false,
            target: default_tune_target(),
            interval: default_tune_interval(),
            tune_moves: default_tune_moves(),
        }
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in run reports.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0xC01D_5EED_C01D_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}
