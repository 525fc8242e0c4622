//! Mission control CLI
//!
//! Serves the Stratolink website, LoRaWAN webhook and telemetry dashboard.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mission_control::activation::hash_pin;
use mission_control::{load_config, Config};
use tracing::Level;

#[derive(Parser)]
#[command(name = "mission-control")]
#[command(about = "Balloon tracking website, activation and telemetry dashboard")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP port (overrides config file)
    #[arg(long)]
    port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the Argon2 hash of a 6-digit activation PIN for a device record
    HashPin {
        /// The PIN printed on the tracker label
        pin: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, port={:?}, log_level={:?}",
        args.config,
        args.port,
        args.log_level
    );

    if let Some(Command::HashPin { pin }) = &args.command {
        println!("{}", hash_pin(pin)?);
        return Ok(());
    }

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    config.resolve_secrets()?;

    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Starting mission control");
    tracing::debug!(
        "Database: {}, webhook secret: {}, poll interval: {}, demo feed: {}",
        config.database.type_name(),
        if config.webhook.secret.is_some() { "set" } else { "none" },
        humantime::format_duration(config.dashboard.poll_interval),
        config.demo.enabled
    );

    mission_control::run(config).await?;

    Ok(())
}
