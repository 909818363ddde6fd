//! Glint CLI - light patterns across a cluster of boards.
//!
//! # Usage
//!
//! ```bash
//! # Whole cluster in one process, sweep over stack-up three times
//! glint simulate 50 0 3
//!
//! # Orchestrator and followers on separate boards, rotation until Ctrl+C
//! glint orchestrate --bind 0.0.0.0:7400
//! glint follow --rank 7 --connect 10.0.0.1:7400
//! ```
//!
//! Launch parameters are positional: `[RATE] [MODE] [ITERATIONS] [MASK]`.

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use glint_core::{GlintConfig, LaunchParams, Rank};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "glint")]
#[command(about = "Glint - synchronised light patterns across a cluster", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to GLINT_CONFIG_PATH, then built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

/// Positional launch parameters shared by every subcommand.
#[derive(Args, Debug, Clone, Copy)]
struct LaunchArgs {
    /// Step length in milliseconds
    #[arg(default_value_t = 100, allow_negative_numbers = true)]
    rate: i64,

    /// Mode selector 0-14; anything else runs every engine in rotation
    #[arg(allow_negative_numbers = true)]
    mode: Option<i64>,

    /// Ticks per session; negative runs until interrupted
    #[arg(default_value_t = -1, allow_negative_numbers = true)]
    iterations: i64,

    /// Channel mask: 1 red, 2 green, 4 blue
    #[arg(default_value_t = 7, allow_negative_numbers = true)]
    mask: i64,
}

impl LaunchArgs {
    fn validate(self) -> LaunchParams {
        LaunchParams::new(self.rate, self.mode, self.iterations, self.mask)
            .unwrap_or_else(|e| Cli::command().error(ErrorKind::ValueValidation, e).exit())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the whole cluster in one process with in-memory outputs
    Simulate {
        #[command(flatten)]
        launch: LaunchArgs,

        /// Number of nodes including the orchestrator
        #[arg(short, long)]
        nodes: Option<usize>,

        /// Print every orchestrator-side channel operation
        #[arg(long)]
        trace: bool,
    },

    /// Run rank 0 and wait for followers over TCP
    Orchestrate {
        #[command(flatten)]
        launch: LaunchArgs,

        /// Address to listen on
        #[arg(short, long)]
        bind: Option<String>,

        /// Number of nodes including the orchestrator
        #[arg(short, long)]
        nodes: Option<usize>,
    },

    /// Join a cluster as a follower
    Follow {
        #[command(flatten)]
        launch: LaunchArgs,

        /// This node's rank, 1 or higher
        #[arg(short, long)]
        rank: Rank,

        /// Orchestrator address
        #[arg(long)]
        connect: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = GlintConfig::load(cli.config.as_deref())?;

    init_logging(cli.verbose, &config.general().log_level);
    tracing::debug!(version = glint::VERSION, "Starting glint");

    use glint::commands;

    match cli.command {
        Commands::Simulate {
            launch,
            nodes,
            trace,
        } => commands::simulate(&config, launch.validate(), nodes, trace).await,
        Commands::Orchestrate {
            launch,
            bind,
            nodes,
        } => commands::orchestrate(&config, launch.validate(), bind, nodes).await,
        Commands::Follow {
            launch,
            rank,
            connect,
        } => commands::follow(&config, launch.validate(), rank, connect).await,
    }
}

fn init_logging(verbose: bool, level: &str) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = if verbose {
        EnvFilter::new("glint=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("glint={},warn", level)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
