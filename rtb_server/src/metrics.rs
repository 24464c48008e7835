//! Prometheus metrics for monitoring lobby and push-channel health.
//!
//! Metrics are exposed in Prometheus text format on a separate listener.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Command counts by outcome
//! - **WebSocket Metrics**: Active connections, snapshots pushed
//! - **Game Metrics**: Lobbies created, guesses and hand-outs submitted
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use rtb_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::lobbies_created_total();
//! metrics::websocket_connections_active(3);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tokio::{sync::watch, task::JoinHandle};

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record a lobby command and how it ended.
pub fn commands_total(command: &str, status: u16) {
    metrics::counter!("commands_total",
        "command" => command.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// Set current active WebSocket connections count.
pub fn websocket_connections_active(count: u64) {
    metrics::gauge!("websocket_connections_active").set(count as f64);
}

/// Increment total WebSocket connections counter.
pub fn websocket_connections_total() {
    metrics::counter!("websocket_connections_total").increment(1);
}

/// Increment snapshots pushed counter.
pub fn snapshots_pushed_total() {
    metrics::counter!("snapshots_pushed_total").increment(1);
}

// ============================================================================
// Game Metrics
// ============================================================================

/// Increment lobbies created counter.
pub fn lobbies_created_total() {
    metrics::counter!("lobbies_created_total").increment(1);
}

/// Set current live lobbies count.
pub fn active_lobbies(count: usize) {
    metrics::gauge!("active_lobbies").set(count as f64);
}

/// Keep the `active_lobbies` gauge in step with the manager's live count,
/// including lobbies that close on their own. Ends when the manager is gone.
pub fn track_active_lobbies(mut count: watch::Receiver<usize>) -> JoinHandle<()> {
    tokio::spawn(async move {
        active_lobbies(*count.borrow_and_update());
        while count.changed().await.is_ok() {
            active_lobbies(*count.borrow_and_update());
        }
    })
}

/// Increment accepted guesses counter.
pub fn guesses_submitted_total() {
    metrics::counter!("guesses_submitted_total").increment(1);
}

/// Increment accepted hand-outs counter.
pub fn distributions_submitted_total() {
    metrics::counter!("distributions_submitted_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ride_the_bus::LobbyManager;
    use std::time::Duration;

    #[tokio::test]
    async fn test_lobby_tracker_stops_with_manager() {
        let manager = LobbyManager::default();
        let tracker = track_active_lobbies(manager.watch_lobby_count());

        let lobby = manager.create_lobby(None).await.unwrap();
        manager.remove_lobby(&lobby.code).await.unwrap();
        assert!(!tracker.is_finished());

        drop(manager);
        tokio::time::timeout(Duration::from_secs(5), tracker)
            .await
            .expect("tracker outlived the manager")
            .unwrap();
    }
}
