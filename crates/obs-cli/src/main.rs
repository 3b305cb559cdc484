//! obsctl: remote control for OBS Studio over obs-websocket v5.
//!
//! # Usage
//!
//! ```text
//! obsctl [OPTIONS] <COMMAND>
//!
//! obsctl scenes list
//! obsctl --url ws://studio-pc:4455 --password secret scenes switch "Live"
//! obsctl inputs volume "Mic/Aux" 0.5
//! obsctl record stop
//! obsctl call GetVersion
//! obsctl watch CurrentProgramSceneChanged InputMuteStateChanged
//! obsctl sample
//! ```
//!
//! Connection settings come from flags, then `OBS_*` environment variables,
//! then the config file (`obsctl config path` prints where it lives).  Logs
//! go to stderr at the configured level; `RUST_LOG` overrides it.

use anyhow::Context;
use clap::Parser;
use obs_cli::cli::{Cli, Command};
use obs_cli::commands;
use obs_client::infrastructure::storage::config::load_config_from;
use obs_client::{ConnectOptions, ObsClient};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = cli.config_path()?;
    let file = load_config_from(&config_path)
        .with_context(|| format!("cannot load {}", config_path.display()))?;
    let config = cli.apply_overrides(file);

    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    let mut stdout = std::io::stdout();

    if let Command::Config { action } = &cli.command {
        return commands::config(action, &config_path, &config, &mut stdout);
    }

    // ── Connect, run, always disconnect ───────────────────────────────────────
    let client = ObsClient::new(config.to_session_config())?;
    let handshake = client
        .connect(ConnectOptions::none())
        .await
        .with_context(|| format!("cannot connect to {}", config.connection.url))?;
    info!(
        obs_websocket = %handshake.obs_websocket_version,
        rpc_version = handshake.rpc_version,
        "connected"
    );

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let result = commands::execute(&cli.command, &client, &mut stdout, shutdown).await;

    if let Err(e) = client.disconnect().await {
        warn!(error = %e, "disconnect failed");
    }
    result
}
