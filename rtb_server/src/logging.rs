//! Structured logging configuration.
//!
//! Server-side events go through `tracing`; the game library logs through the
//! `log` facade, which the subscriber installed here picks up as well.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the RUST_LOG env var.
///
/// # Example
///
/// ```no_run
/// use rtb_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a command the game refused
///
/// Validation failures are routine and logged at debug; anything that
/// reached an invariant check is a bug and logged at error.
pub fn log_command_rejected(code: &str, command: &str, status: u16, message: &str) {
    if status >= 500 {
        tracing::error!(
            lobby = code,
            command = command,
            status = status,
            "Command failed: {}",
            message
        );
    } else {
        tracing::debug!(
            lobby = code,
            command = command,
            status = status,
            "Command rejected: {}",
            message
        );
    }
}

/// Log a push channel opening or closing
pub fn log_push_channel(code: &str, player_id: Option<&str>, event: &str) {
    tracing::info!(
        lobby = code,
        player_id = player_id,
        event = event,
        "Push channel {}",
        event
    );
}
