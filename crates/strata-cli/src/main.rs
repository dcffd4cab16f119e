//! CLI frontend for the strata ECS runtime: runs and benchmarks a demo
//! particle world.

mod commands;
mod demo;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "strata",
    about = "strata: an entity component system runtime",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log world activity at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the demo particle world and print a summary
    Run {
        /// Number of ticks to run (overrides the config file)
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Particles spawned before the first tick
        #[arg(short, long)]
        entities: Option<usize>,

        /// RNG seed for deterministic runs
        #[arg(short, long)]
        seed: Option<u64>,

        /// Seconds of world time per tick
        #[arg(short, long)]
        delta: Option<f32>,

        /// JSON config file (see `strata config`)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Time ticks for several population sizes
    Bench {
        /// Comma-separated initial populations
        #[arg(long, value_delimiter = ',', default_value = "1000,10000")]
        sizes: Vec<usize>,

        /// Ticks to time per size
        #[arg(short, long, default_value = "100")]
        ticks: u64,
    },

    /// Print the default simulation config as JSON
    Config,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            ticks,
            entities,
            seed,
            delta,
            config,
        } => commands::run::run(commands::run::RunArgs {
            ticks,
            entities,
            seed,
            delta,
            config: config.as_deref(),
        }),
        Commands::Bench { sizes, ticks } => commands::bench::run(&sizes, ticks),
        Commands::Config => commands::config::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
