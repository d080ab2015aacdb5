use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args as ClapArgs, Parser, Subcommand};
use mc3_engine::checkpoint::checkpoint_path;
use mc3_engine::report::{ladder_summary, operator_summary};
use mc3_engine::{CoupledChains, CoupledConfig, EngineCheckpoint, LocalChannel};
use mc3_sampler::{GaussianMixture, MetropolisChain, StandardGaussian, TargetDensity};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "mc3-run", about = "Coupled-chain sampler CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a coupled run from a YAML configuration.
    Run(RunArgs),
    /// Print the coupling strategy a configuration would use.
    Describe(DescribeArgs),
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// YAML configuration describing the coupled run.
    #[arg(long)]
    config: PathBuf,
    /// Output directory for run artefacts.
    #[arg(long)]
    out: PathBuf,
    /// Master seed overriding the configured one.
    #[arg(long)]
    seed: Option<u64>,
    /// Store a checkpoint every N sampling generations.
    #[arg(long = "checkpoint-every")]
    checkpoint_every: Option<usize>,
    /// Resume sampling from a stored checkpoint, skipping burn-in.
    #[arg(long)]
    resume: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct DescribeArgs {
    /// YAML configuration describing the coupled run.
    #[arg(long)]
    config: PathBuf,
}

/// Demo posterior selected by the optional `target` section of the run
/// configuration. Unknown keys in the engine section are ignored here and
/// vice versa, so one file configures both layers.
#[derive(Debug, Deserialize)]
struct TargetFile {
    #[serde(default)]
    target: TargetSpec,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum TargetSpec {
    Gaussian {
        #[serde(default = "default_dimension")]
        dimension: usize,
    },
    TwoWells {
        #[serde(default = "default_dimension")]
        dimension: usize,
        #[serde(default = "default_separation")]
        separation: f64,
        #[serde(default = "default_scale")]
        scale: f64,
    },
}

fn default_dimension() -> usize {
    2
}

fn default_separation() -> f64 {
    6.0
}

fn default_scale() -> f64 {
    1.0
}

impl Default for TargetSpec {
    fn default() -> Self {
        TargetSpec::TwoWells {
            dimension: default_dimension(),
            separation: default_separation(),
            scale: default_scale(),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_coupled(args),
        Command::Describe(args) => describe(args),
    }
}

fn run_coupled(args: RunArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let contents = fs::read_to_string(&args.config)?;
    let mut config = CoupledConfig::from_yaml_str(&contents)?;
    if let Some(seed) = args.seed {
        config.seed_policy.master_seed = seed;
    }
    let TargetFile { target } = serde_yaml::from_str(&contents)?;

    match target {
        TargetSpec::Gaussian { dimension } => {
            execute(StandardGaussian::new(dimension), config, &args)?
        }
        TargetSpec::TwoWells {
            dimension,
            separation,
            scale,
        } => execute(
            GaussianMixture::two_wells(dimension, separation, scale),
            config,
            &args,
        )?,
    }

    // Keep the configuration next to the artefacts it produced.
    fs::copy(&args.config, args.out.join("config.yaml")).ok();

    Ok(())
}

fn execute<T: TargetDensity + Send + Sync>(
    target: T,
    config: CoupledConfig,
    args: &RunArgs,
) -> Result<(), Box<dyn Error>> {
    let base =
        MetropolisChain::with_default_moves(Arc::new(target), config.seed_policy.master_seed)?;
    let burnin = config.burnin;
    let generations = config.generations;
    let mut engine = CoupledChains::new(config, base, LocalChannel::new())?;

    let mut remaining = generations;
    if let Some(path) = &args.resume {
        engine.restore(Some(EngineCheckpoint::load(path)?))?;
        remaining = generations.saturating_sub(engine.pool().sampling_generation() as usize);
        println!(
            "resumed at sampling generation {}",
            engine.pool().sampling_generation()
        );
    } else {
        engine.burnin(burnin)?;
        println!("completed {burnin} burn-in generations");
    }

    match args.checkpoint_every.filter(|&every| every > 0) {
        Some(every) => {
            let checkpoint_dir = args.out.join("checkpoints");
            while remaining > 0 {
                let step = remaining.min(every);
                engine.run(step)?;
                remaining -= step;
                if let Some(snapshot) = engine.checkpoint()? {
                    let generation = engine.pool().sampling_generation();
                    snapshot.store(&checkpoint_path(&checkpoint_dir, generation))?;
                    println!("checkpoint stored at generation {generation}");
                }
            }
        }
        None => engine.run(remaining)?,
    }
    println!(
        "sampling complete after {} generations",
        engine.pool().sampling_generation()
    );

    let report = engine
        .report()?
        .ok_or("the coordinating worker produced no report")?;
    report.write(&args.out.join("report.json"))?;
    engine.trace().write_csv(args.out.join("trace.csv"))?;

    let records = engine.cold_tuning_records()?.unwrap_or_default();
    print!("{}", operator_summary(&records));
    println!();
    print!("{}", ladder_summary(engine.ladder()));

    Ok(())
}

fn describe(args: DescribeArgs) -> Result<(), Box<dyn Error>> {
    let contents = fs::read_to_string(&args.config)?;
    let config = CoupledConfig::from_yaml_str(&contents)?;
    let seed = config.seed_policy.master_seed;
    let base = MetropolisChain::with_default_moves(Arc::new(StandardGaussian::new(1)), seed)?;
    let engine = CoupledChains::new(config, base, LocalChannel::new())?;
    print!("{}", engine.strategy_description());
    println!();
    print!("{}", ladder_summary(engine.ladder()));
    Ok(())
}
