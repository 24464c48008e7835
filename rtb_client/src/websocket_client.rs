//! Push-channel client with fixed-delay reconnect.

use anyhow::{Context, Result};
use chrono::Utc;
use futures_util::StreamExt;
use ride_the_bus::{NUM_ROUNDS, Phase, PlayerId, ServerMessage, SessionSnapshot, ViewState};
use std::{fmt::Write, sync::Arc, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Wait between a dropped push channel and the next attempt
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Keeps a lobby's push channel open, forwarding every snapshot
pub struct WebSocketClient {
    ws_url: String,
    reconnect_delay: Duration,
}

impl WebSocketClient {
    /// Create a new WebSocket client
    pub fn new(ws_url: String) -> Self {
        Self {
            ws_url,
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Run in the background until `snapshots` is dropped.
    ///
    /// A lost connection is retried after the reconnect delay, forever. The
    /// first frame after every reconnect is the lobby's current snapshot, so
    /// nothing needs replaying.
    pub fn spawn(self, snapshots: mpsc::Sender<Arc<SessionSnapshot>>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(snapshots).await })
    }

    async fn run(self, snapshots: mpsc::Sender<Arc<SessionSnapshot>>) {
        loop {
            match connect_async(&self.ws_url).await {
                Ok((ws_stream, _)) => {
                    let (_write, mut read) = ws_stream.split();
                    while let Some(msg) = read.next().await {
                        match msg {
                            Ok(Message::Text(text)) => match parse_frame(&text) {
                                Ok(session) => {
                                    if snapshots.send(session).await.is_err() {
                                        return;
                                    }
                                }
                                Err(e) => eprintln!("Ignoring frame: {e:#}"),
                            },
                            Ok(Message::Close(_)) => break,
                            Err(e) => {
                                eprintln!("WebSocket error: {}", e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    eprintln!(
                        "Push channel closed, reconnecting in {}s...",
                        self.reconnect_delay.as_secs()
                    );
                }
                Err(e) => {
                    eprintln!(
                        "Failed to connect ({e}), retrying in {}s...",
                        self.reconnect_delay.as_secs()
                    );
                }
            }

            if snapshots.is_closed() {
                return;
            }
            sleep(self.reconnect_delay).await;
        }
    }
}

/// Decode one pushed text frame
pub fn parse_frame(text: &str) -> Result<Arc<SessionSnapshot>> {
    let ServerMessage::Session { session } =
        serde_json::from_str(text).context("Failed to parse server message")?;
    Ok(session)
}

/// Render a projected view for the terminal
pub fn render_view(view: &ViewState, me: Option<&PlayerId>) -> String {
    let mut out = String::new();
    let rule = "═".repeat(60);

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "RIDE THE BUS  {}  [{}]", view.code, view.phase);
    let _ = writeln!(out, "{rule}");

    match view.phase {
        Phase::Guessing(_) => {
            let _ = write!(out, "Round {}/{NUM_ROUNDS}", view.round);
        }
        Phase::Distribution => {
            let _ = write!(out, "Hand out your sips");
        }
        Phase::Waiting | Phase::Result => {}
    }
    if let Some(deadline) = view.deadline {
        let left = (deadline - Utc::now()).num_seconds().max(0);
        let _ = write!(out, "  ({left}s left)");
    }
    if view.deadline.is_some() || matches!(view.phase, Phase::Guessing(_)) {
        let _ = writeln!(out);
    }

    let cards: Vec<String> = view.revealed_cards.iter().map(|c| c.to_string()).collect();
    if !cards.is_empty() {
        let _ = writeln!(out, "Cards: {}", cards.join(" "));
    }

    if let Some(at) = view.shutting_down_at {
        let _ = writeln!(out, "Lobby closing at {}", at.format("%H:%M:%S"));
    }

    let _ = writeln!(out, "{}", "─".repeat(60));
    for player in &view.players {
        let marker = if me == Some(&player.id) { "→" } else { " " };
        let mut flags = Vec::new();
        if player.is_spectator {
            flags.push("out".to_string());
        }
        if player.ready {
            flags.push("ready".to_string());
        }
        if player.pending_tap_out {
            flags.push("tapping out".to_string());
        }
        if !player.connected {
            flags.push("offline".to_string());
        }
        if let (Some(guess), Some(correct)) = (player.last_guess, player.last_guess_correct) {
            flags.push(format!("{guess} {}", if correct { "✓" } else { "✗" }));
        }
        if player.drink_now > 0 {
            flags.push(format!("drink {}", player.drink_now));
        }
        if player.give_out_remaining > 0 {
            flags.push(format!("give {}", player.give_out_remaining));
        }

        let _ = writeln!(
            out,
            "{marker} {:<16} total {:>3}  {}",
            player.nickname,
            player.lifetime_drank,
            flags.join(", ")
        );
    }

    let _ = writeln!(out, "{rule}");
    out
}
