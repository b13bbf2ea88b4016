//! Lending Server
//!
//! REST API server for the peer-to-peer loan lifecycle.

use clap::Parser;
use lending_server::config::{build_config, CliArgs as ConfigCliArgs};
use lending_server::server::Server;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Lending Server - REST API for loan proposal, approval, funding and disbursement
#[derive(Parser, Debug)]
#[command(name = "lending_server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long, value_name = "FILE", env = "LENDING_CONFIG")]
    config: Option<PathBuf>,

    /// Host address to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Do not mail agreement letters when a loan is funded
    #[arg(long)]
    disable_notifier: bool,
}

impl From<Args> for ConfigCliArgs {
    fn from(args: Args) -> Self {
        ConfigCliArgs {
            config_file: args.config,
            host: args.host,
            port: args.port,
            log_level: args.log_level,
            disable_notifier: args.disable_notifier,
        }
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cli_args: ConfigCliArgs = args.into();
    let config = build_config(&cli_args)?;

    init_tracing(config.log_level.as_filter_str());

    tracing::info!("Lending Server v{}", lending_server::VERSION);
    tracing::info!(
        host = %config.host,
        port = %config.port,
        log_level = %config.log_level,
        environment = %config.environment,
        notifier_enabled = %config.notifier_enabled,
        dependency_timeout_ms = %config.dependency_timeout_ms,
        borrowers = config.borrowers.len(),
        investors = config.investors.len(),
        "Server configuration loaded"
    );

    let server = Server::new(config);
    tracing::info!(address = %server.socket_addr()?, "Starting server");

    server.run().await?;

    Ok(())
}
