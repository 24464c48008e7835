//! Ride the Bus lobby server.
//!
//! Every lobby runs as its own actor task, reached through a code-addressed
//! `LobbyManager`. Nothing is persisted; a restart drops all lobbies.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use log::info;
use pico_args::Arguments;
use ride_the_bus::LobbyManager;
use rtb_server::{api, config::ServerConfig, logging, metrics};

const HELP: &str = "\
Run a Ride the Bus lobby server

USAGE:
  rtb_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address     [default: env SERVER_BIND or 127.0.0.1:3000]
  --metrics    IP:PORT     Prometheus exporter address    [default: env METRICS_BIND, disabled if unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                  Server bind address (e.g., 0.0.0.0:3000)
  METRICS_BIND                 Prometheus exporter bind address
  ROUND_DURATION_SECS          Seconds players get to guess each round
  DISTRIBUTION_DURATION_SECS   Seconds players get to hand out sips
  IDLE_CLOSE_AFTER_SECS        Close lobbies with no screens attached after this long
  SHUTDOWN_GRACE_SECS          How long a closing lobby stays up
  RUST_LOG                     Log filter (e.g., info,ride_the_bus=debug)
";

struct Args {
    bind: Option<SocketAddr>,
    metrics: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        metrics: pargs.opt_value_from_str("--metrics")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.metrics)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics exposed at http://{addr}/metrics");
    }

    info!(
        "Lobby timers: round {}s, hand-out {}s, idle close {}s, shutdown grace {}s",
        config.lobby.round_duration_secs,
        config.lobby.distribution_duration_secs,
        config.lobby.idle_close_after_secs,
        config.lobby.shutdown_grace_secs,
    );

    let lobby_manager = Arc::new(LobbyManager::new(config.lobby.clone()));
    if config.metrics_bind.is_some() {
        metrics::track_active_lobbies(lobby_manager.watch_lobby_count());
    }
    let app = api::create_router(api::AppState::new(lobby_manager.clone()));

    info!("Starting HTTP/WebSocket server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!(
        "Shutting down server with {} open lobbies...",
        lobby_manager.lobby_count().await
    );

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install CTRL+C signal handler: {e}");
        std::future::pending::<()>().await;
    }
}
