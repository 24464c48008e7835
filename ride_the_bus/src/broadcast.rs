//! Snapshot fan-out to a lobby's subscribers.
//!
//! A [`Broadcaster`] lives inside a lobby actor and is only touched from
//! there, so publishes go out in commit order. Each subscriber gets a bounded
//! channel; one that can't keep up is dropped and has to reconnect.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::Arc,
};
use tokio::sync::mpsc;

use crate::game::{GameError, SessionSnapshot, entities::PlayerId};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// `{playerId, name}` a client keeps so it can reclaim its seat after a
/// reconnect.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeToken {
    pub player_id: PlayerId,
    pub name: String,
}

/// Frames pushed from server to client.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Session { session: Arc<SessionSnapshot> },
}

/// The receiving end of a lobby subscription.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub code: String,
    pub player_id: Option<PlayerId>,
    receiver: mpsc::Receiver<Arc<SessionSnapshot>>,
}

impl Subscription {
    /// Waits for the next snapshot. `None` once the lobby is gone or this
    /// subscriber was evicted.
    pub async fn recv(&mut self) -> Option<Arc<SessionSnapshot>> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Arc<SessionSnapshot>> {
        self.receiver.try_recv().ok()
    }
}

/// Anything that can hand out snapshot subscriptions by lobby code.
#[async_trait]
pub trait SnapshotFeed: Send + Sync {
    async fn subscribe(
        &self,
        code: &str,
        identity: Option<ResumeToken>,
    ) -> Result<Subscription, GameError>;

    async fn unsubscribe(&self, code: &str, subscriber_id: SubscriberId);
}

#[derive(Debug)]
struct Subscriber {
    sender: mpsc::Sender<Arc<SessionSnapshot>>,
    player_id: Option<PlayerId>,
}

#[derive(Debug)]
pub struct Broadcaster {
    code: String,
    buffer: usize,
    next_id: u64,
    subscribers: HashMap<SubscriberId, Subscriber>,
}

impl Broadcaster {
    pub fn new(code: String, buffer: usize) -> Self {
        Self {
            code,
            buffer: buffer.max(1),
            next_id: 0,
            subscribers: HashMap::new(),
        }
    }

    /// Registers a subscriber without sending it anything yet.
    pub fn subscribe(&mut self, player_id: Option<PlayerId>) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.insert(
            id,
            Subscriber {
                sender,
                player_id: player_id.clone(),
            },
        );
        log::debug!("{}: {id} subscribed as {player_id:?}", self.code);
        Subscription {
            id,
            code: self.code.clone(),
            player_id,
            receiver,
        }
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            log::debug!("{}: {id} unsubscribed", self.code);
        }
        removed
    }

    /// Sends to one subscriber. Returns `false` if it had to be dropped.
    pub fn send_to(&mut self, id: SubscriberId, snapshot: Arc<SessionSnapshot>) -> bool {
        let Some(subscriber) = self.subscribers.get(&id) else {
            return false;
        };
        if subscriber.sender.try_send(snapshot).is_ok() {
            return true;
        }
        log::warn!("{}: {id} couldn't take its first snapshot, dropping", self.code);
        self.subscribers.remove(&id);
        false
    }

    /// Pushes `snapshot` to everyone. Returns how many subscribers were
    /// dropped for being closed or too slow.
    pub fn publish(&mut self, snapshot: &Arc<SessionSnapshot>) -> usize {
        let before = self.subscribers.len();
        let code = &self.code;
        self.subscribers.retain(|id, subscriber| {
            match subscriber.sender.try_send(Arc::clone(snapshot)) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!("{code}: {id} channel full, evicting");
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::debug!("{code}: {id} disconnected, removing");
                    false
                }
            }
        });
        before - self.subscribers.len()
    }

    /// Forgets subscribers whose receiving side has gone away.
    pub fn prune_closed(&mut self) -> usize {
        let before = self.subscribers.len();
        self.subscribers.retain(|_, s| !s.sender.is_closed());
        before - self.subscribers.len()
    }

    /// Players with at least one live, verified subscription.
    pub fn connected_players(&self) -> BTreeSet<PlayerId> {
        self.subscribers
            .values()
            .filter(|s| !s.sender.is_closed())
            .filter_map(|s| s.player_id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Drops every subscriber, closing their channels.
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Session, entities::Player};
    use chrono::Utc;

    fn snapshot() -> Arc<SessionSnapshot> {
        let host = Player::new(PlayerId::from("host_1"), "Host".into());
        Arc::new(Session::new("CODE".into(), host, Utc::now()).snapshot())
    }

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let mut broadcaster = Broadcaster::new("CODE".into(), 4);
        let mut a = broadcaster.subscribe(None);
        let mut b = broadcaster.subscribe(Some(PlayerId::from("player_1")));
        assert_eq!(broadcaster.publish(&snapshot()), 0);
        assert!(a.try_recv().is_some());
        assert!(b.try_recv().is_some());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_closed_subscriber_is_removed() {
        let mut broadcaster = Broadcaster::new("CODE".into(), 4);
        let sub = broadcaster.subscribe(Some(PlayerId::from("player_1")));
        drop(sub);
        assert!(broadcaster.connected_players().is_empty());
        assert_eq!(broadcaster.publish(&snapshot()), 1);
        assert!(broadcaster.is_empty());
    }

    #[test]
    fn test_slow_subscriber_is_evicted() {
        let mut broadcaster = Broadcaster::new("CODE".into(), 1);
        let mut slow = broadcaster.subscribe(None);
        let mut fast = broadcaster.subscribe(None);
        broadcaster.publish(&snapshot());
        assert!(fast.try_recv().is_some());
        assert_eq!(broadcaster.publish(&snapshot()), 1);
        assert_eq!(broadcaster.len(), 1);
        assert!(fast.try_recv().is_some());
        assert!(slow.try_recv().is_some());
        assert!(slow.try_recv().is_none());
    }

    #[test]
    fn test_connected_players_tracks_identities() {
        let mut broadcaster = Broadcaster::new("CODE".into(), 4);
        let p1 = PlayerId::from("player_1");
        let first = broadcaster.subscribe(Some(p1.clone()));
        let _second = broadcaster.subscribe(Some(p1.clone()));
        let _anon = broadcaster.subscribe(None);
        assert_eq!(broadcaster.connected_players(), BTreeSet::from([p1.clone()]));
        broadcaster.unsubscribe(first.id);
        assert_eq!(broadcaster.connected_players(), BTreeSet::from([p1]));
    }

    #[test]
    fn test_server_message_shape() {
        let msg = ServerMessage::Session {
            session: snapshot(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "session");
        assert_eq!(json["session"]["code"], "CODE");
    }
}
