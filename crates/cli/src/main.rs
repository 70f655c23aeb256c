use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::Path;

mod commands;

use commands::{CalcArgs, WatchArgs};

#[derive(Parser)]
#[command(name = "liq-sizer")]
#[command(
    about = "Live liquidation price and position sizing for crypto futures",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the live price and print sizing on every refresh
    Watch(WatchArgs),
    /// Size a position once from the given values
    Calc(CalcArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Log to a file when asked so log lines don't interleave with snapshots
    match &cli.command {
        Commands::Watch(WatchArgs {
            log_file: Some(path),
            ..
        }) => init_file_logging(path)?,
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .init();
        }
    }

    match cli.command {
        Commands::Watch(args) => commands::run_watch(args).await?,
        Commands::Calc(args) => commands::run_calc(&args)?,
    }

    Ok(())
}

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

fn init_file_logging(path: &Path) -> anyhow::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}
