//! WebSocket push channel for lobby snapshots.
//!
//! The channel is one-way. Every committed change to a lobby is pushed to
//! each open connection as a full session snapshot; clients act through the
//! HTTP command API and never need to send anything here.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /api/lobbies/{code}/ws?playerId=...&name=...`
//! 2. Server subscribes before upgrading, so an unknown lobby or a bad resume
//!    token is refused with a plain HTTP error
//! 3. The current snapshot is pushed straight away, then one per change
//! 4. When either side goes away the subscription is dropped and the lobby
//!    republishes if the player's `connected` flag changed
//!
//! The `playerId`/`name` pair is optional. Without it the connection is a
//! spectator screen such as the host's TV.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:3000/api/lobbies/BRAVE-OTTER-JUMPS/ws');
//!
//! ws.onmessage = (event) => {
//!   const data = JSON.parse(event.data);
//!   if (data.type === 'session') {
//!     render(data.session);
//!   }
//! };
//! ```

use axum::{
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use log::{error, warn};
use ride_the_bus::{PlayerId, ResumeToken, ServerMessage, Subscription};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{
    AppState,
    lobbies::{ErrorResponse, status_for},
};
use crate::{logging, metrics};

static ACTIVE_CONNECTIONS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsQuery {
    pub player_id: Option<PlayerId>,
    pub name: Option<String>,
}

impl WsQuery {
    /// Both halves of the resume token, or neither.
    fn identity(self) -> Result<Option<ResumeToken>, &'static str> {
        match (self.player_id, self.name) {
            (Some(player_id), Some(name)) => Ok(Some(ResumeToken { player_id, name })),
            (None, None) => Ok(None),
            _ => Err("playerId and name must be sent together"),
        }
    }
}

/// Upgrade to a WebSocket streaming snapshots for one lobby.
///
/// # Path Parameters
///
/// - `code`: Lobby code, in any case
///
/// # Query Parameters
///
/// - `playerId`, `name`: Resume token of the player on this screen (optional)
///
/// # Response
///
/// `101 Switching Protocols` on success. Otherwise the same status and
/// `{"error": ...}` body the command API would give.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(code): Path<String>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let identity = match query.identity() {
        Ok(identity) => identity,
        Err(message) => {
            logging::log_command_rejected(&code, "subscribe", 400, message);
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(ErrorResponse {
                    error: message.to_string(),
                }),
            )
                .into_response();
        }
    };

    let subscription = match state.feed.subscribe(&code, identity).await {
        Ok(subscription) => subscription,
        Err(e) => {
            let status = status_for(&e);
            logging::log_command_rejected(&code, "subscribe", status.as_u16(), &e.to_string());
            return (status, axum::Json(ErrorResponse { error: e.to_string() })).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, subscription, state))
}

/// Pump snapshots into the socket until either end goes away.
async fn handle_socket(socket: WebSocket, mut subscription: Subscription, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let code = subscription.code.clone();
    let subscriber_id = subscription.id;
    let player_id = subscription.player_id.clone();
    let player = player_id.as_ref().map(PlayerId::as_str);

    logging::log_push_channel(&code, player, "opened");
    metrics::websocket_connections_total();
    metrics::websocket_connections_active(ACTIVE_CONNECTIONS.fetch_add(1, Ordering::Relaxed) + 1);

    let push_code = code.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(session) = subscription.recv().await {
            let json = match serde_json::to_string(&ServerMessage::Session { session }) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize snapshot for lobby {push_code}: {e}");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                return;
            }
            metrics::snapshots_pushed_total();
        }

        // Lobby closed or this subscriber fell behind
        let _ = sender.send(Message::Close(None)).await;
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket receive error: {e}");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.feed.unsubscribe(&code, subscriber_id).await;

    metrics::websocket_connections_active(
        ACTIVE_CONNECTIONS
            .fetch_sub(1, Ordering::Relaxed)
            .saturating_sub(1),
    );
    logging::log_push_channel(&code, player, "closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_requires_both_halves() {
        let query = WsQuery {
            player_id: Some(PlayerId::from("player_abc")),
            name: None,
        };
        assert!(query.identity().is_err());

        let query = WsQuery {
            player_id: Some(PlayerId::from("player_abc")),
            name: Some("alice".to_string()),
        };
        let token = query.identity().unwrap().unwrap();
        assert_eq!(token.name, "alice");

        assert_eq!(WsQuery::default().identity(), Ok(None));
    }
}
