//! confluxd - room session coordinator.
//!
//! Rooms, membership, presence with reconnection grace, and event fan-out
//! over a WebSocket surface, plus an administrative HTTP listener.

mod config;
mod error;
mod http;
mod metrics;
mod network;
mod proto;
mod state;
mod telemetry;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LogFormat};
use crate::network::Gateway;
use crate::state::{Coordinator, Settings};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Logging is configured from the file, so load errors go to stderr.
    let config = Config::load(&config_path).map_err(|e| {
        eprintln!("failed to load config {config_path}: {e}");
        e
    })?;
    init_tracing(config.server.log_format);

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(path = %config_path, error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {config_path}", errors.len());
    }

    info!(
        server = %config.server.name,
        listen = %config.listen.address,
        grace_secs = config.rooms.grace_period_secs,
        "Starting confluxd"
    );

    metrics::init();
    let coordinator = Coordinator::spawn(Settings::from_config(&config));

    match &config.http {
        Some(http_config) => {
            let state = http::AdminState::new(coordinator.clone(), config.server.name.clone());
            let addr = http_config.address;
            tokio::spawn(async move {
                http::run_http_server(addr, state).await;
            });
        }
        None => info!("Admin HTTP surface disabled"),
    }

    let gateway = Gateway::bind(&config.listen, config.limits.clone(), coordinator).await?;

    tokio::select! {
        result = gateway.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
            Ok(())
        }
    }
}
