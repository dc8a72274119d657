use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use currency_rates::config::{default_config_path, ResolvedConfig};
use currency_rates::market_data::build_aggregator;
use currency_rates_server::{router, AppState};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "currency-rates-server")]
#[command(about = "Serve consolidated currency rates over HTTP")]
struct Cli {
    /// Path to config file.
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Override `server.bind` (e.g. "0.0.0.0:8080").
    #[arg(long)]
    bind: Option<String>,
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
    let aggregator = build_aggregator(&config)?;

    let bind = cli.bind.unwrap_or_else(|| config.server.bind.clone());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!(bind = %bind, backend = ?config.storage.backend, "currency-rates-server listening");

    axum::serve(listener, router(AppState::new(aggregator)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Server error")?;

    Ok(())
}
