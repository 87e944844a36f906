use crate::allocator::StrategyKind;
use crate::bench;
use crate::config::BenchConfig;
use crate::errors::Result;
use crate::logging::init_logging;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, error, info};

/// Compare bump-arena reclamation against per-object allocation.
#[derive(Debug, Parser)]
#[command(name = "tlab-bench")]
#[command(about = "Micro-benchmark for batched (TLAB) vs. direct object allocation")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one strategy.
    Run {
        /// Strategy to run ("arena" or "direct"); defaults to the config file's.
        #[arg(long)]
        strategy: Option<StrategyKind>,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Run both strategies on the same settings and report the speedup.
    Compare {
        #[command(flatten)]
        overrides: Overrides,
    },
}

#[derive(Debug, Args)]
struct Overrides {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Bytes per object.
    #[arg(long)]
    object_size: Option<usize>,
    /// Objects per reclamation cycle.
    #[arg(long)]
    reclaim_interval: Option<usize>,
    /// Bytes per arena.
    #[arg(long)]
    arena_capacity: Option<usize>,
    /// Objects requested over the whole run.
    #[arg(long)]
    iterations: Option<u64>,
    /// Independent contexts, one per thread.
    #[arg(long)]
    threads: Option<usize>,
    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

impl Overrides {
    fn resolve(&self) -> Result<BenchConfig> {
        let mut config = match &self.config {
            Some(path) => BenchConfig::load(path)?,
            None => BenchConfig::default(),
        };

        if let Some(object_size) = self.object_size {
            config.object_size = object_size;
        }
        if let Some(reclaim_interval) = self.reclaim_interval {
            config.reclaim_interval = reclaim_interval;
        }
        if let Some(arena_capacity) = self.arena_capacity {
            config.arena_capacity = Some(arena_capacity);
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = Some(level.clone());
        }

        Ok(config)
    }
}

/// Parse arguments, run, and return the process exit code.
pub fn main() -> i32 {
    let cli = Cli::parse();
    match execute(cli) {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "Benchmark failed");
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    let (overrides, strategy) = match &cli.command {
        Command::Run { strategy, overrides } => (overrides, *strategy),
        Command::Compare { overrides } => (overrides, None),
    };

    let mut config = overrides.resolve()?;
    if let Some(strategy) = strategy {
        config.strategy = strategy;
    }

    let _guard = init_logging(config.log_config()?);

    debug!(?config, "Configuration resolved");
    config.validate()?;

    match cli.command {
        Command::Run { .. } => {
            info!(strategy = %config.strategy, iterations = config.iterations, "Starting run");
            let report = bench::run_config(&config)?;
            if overrides.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
        }
        Command::Compare { .. } => {
            info!(iterations = config.iterations, "Starting comparison");
            let comparison = bench::compare(&config)?;
            if overrides.json {
                println!("{}", serde_json::to_string_pretty(&comparison)?);
            } else {
                println!("{}", comparison);
            }
        }
    }

    Ok(())
}
