//! `profscope` command-line entry point.

mod cli_logger;
mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use std::path::PathBuf;

use cli_logger::CliLogger;
use cmd::{FlameArgs, PairDiffArgs};
use profscope::{Config, DEFAULT_CONFIG_FILE};

#[derive(Debug, Parser)]
#[command(name = "profscope", version, about = "Flame graphs and overviews from recorded profiling events")]
struct Cli {
    /// Config file; a missing file means defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[arg(long, global = true)]
    json: bool,
    #[arg(long, global = true)]
    no_color: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert an exported event container into flame-graph JSON.
    Flame(FlameArgs),
    /// Pair the event types two containers both sampled.
    PairDiff(PairDiffArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let logger = CliLogger::new(cli.json, cli.no_color);
    if let Err(err) = run(&cli, &logger) {
        logger.print_error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn run(cli: &Cli, logger: &CliLogger) -> Result<()> {
    let config = Config::load_optional(&cli.config);
    match &cli.command {
        Command::Flame(args) => {
            let summary = cmd::flame_command(&config, args)?;
            logger.print_flame_summary(&summary)
        }
        Command::PairDiff(args) => {
            let pairs = cmd::pair_diff_command(&config, args)?;
            logger.print_diff_pairs(&pairs)
        }
    }
}
