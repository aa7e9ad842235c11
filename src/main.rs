//! # Run a scan over saved snapshots
//! optscan scan --config config/default.toml --snapshots data/chains.json
//!
//! # Inspect the position cache
//! optscan cache --config config/default.toml

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};

use optscan::cache::PositionCache;
use optscan::config::ScanConfig;
use optscan::data::OptionChainSnapshot;
use optscan::scan::run_scan;
use optscan::strategy::registry;

#[derive(Parser)]
#[command(name = "optscan")]
#[command(about = "Options chain scanner with pluggable strategies")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every enabled strategy over a snapshot file
    Scan {
        /// Path to a JSON file holding an array of chain snapshots
        #[arg(short, long)]
        snapshots: String,
    },

    /// List cached positions and their status
    Cache,
}

fn load_config(path: &str) -> anyhow::Result<ScanConfig> {
    if std::path::Path::new(path).exists() {
        ScanConfig::from_path(path).with_context(|| format!("loading config from {}", path))
    } else {
        tracing::info!(path, "config file not found, using defaults");
        Ok(ScanConfig::default())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Scan { snapshots } => {
            let raw = std::fs::read_to_string(&snapshots)
                .with_context(|| format!("reading snapshots from {}", snapshots))?;
            let snapshots: Vec<OptionChainSnapshot> =
                serde_json::from_str(&raw).context("parsing snapshot file")?;

            let strategies = registry::build(&config, None);
            let mut cache = PositionCache::load(&config.cache_path);
            let report = run_scan(&strategies, &snapshots, &mut cache, &[], Utc::now());
            cache.save().context("saving position cache")?;

            println!(
                "{} signals from {} strategies over {} snapshots",
                report.signals.len(),
                strategies.len(),
                snapshots.len()
            );
            for (strategy, signal) in &report.signals {
                println!(
                    "  [{}] {} {} {} {} {}",
                    strategy,
                    signal.symbol,
                    signal.direction,
                    signal.option_type.as_str(),
                    signal.strike,
                    signal.expiry
                );
            }
            println!("{} exit recommendations", report.exits.len());
            for exit in &report.exits {
                println!(
                    "  [{}] {} {} {} {}: {}",
                    exit.strategy, exit.symbol, exit.direction, exit.strike, exit.expiry,
                    exit.reason
                );
            }
        }
        Commands::Cache => {
            let cache = PositionCache::load(&config.cache_path);
            println!("{} cached positions", cache.len());
            let mut positions: Vec<_> = cache.entries().collect();
            positions.sort_by_key(|p| p.key());
            for position in positions {
                println!(
                    "  {:?} {} {} {} {} (opened {}, last seen {})",
                    position.status,
                    position.symbol,
                    position.direction,
                    position.strike,
                    position.expiry,
                    position.opened_at.format("%Y-%m-%d"),
                    position.last_seen.format("%Y-%m-%d %H:%M"),
                );
            }
        }
    }

    Ok(())
}
