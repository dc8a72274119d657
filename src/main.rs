use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use currency_rates::config::{default_config_path, ResolvedConfig};
use currency_rates::market_data::build_aggregator;
use serde_json::json;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "currency-rates")]
#[command(about = "Consolidated fiat and crypto exchange rates")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one aggregation cycle and print the snapshot as JSON
    Rates,
    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .json(),
        )
        .init();

    let cli = Cli::parse();

    let config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;

    match cli.command {
        Command::Rates => {
            let aggregator = build_aggregator(&config)?;
            let snapshot = aggregator.current_rates().await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Command::Config => {
            let output = json!({
                "config_file": cli.config.display().to_string(),
                "data_dir": config.data_dir.display().to_string(),
                "upstream": {
                    "base_url": config.upstream.base_url,
                    "fiat_path": config.upstream.fiat_path,
                    "crypto_path": config.upstream.crypto_path,
                    "api_key": "[REDACTED]",
                    "api_key_header": config.upstream.api_key_header,
                },
                "http": config.http,
                "storage": config.storage,
                "server": config.server,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
