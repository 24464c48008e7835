//! Lobby actor implementation with async message handling.

use super::{
    config::LobbyConfig,
    messages::{JoinAccepted, LobbyMessage, LobbyResult, PlayerRef},
};
use crate::{
    broadcast::{Broadcaster, ResumeToken, Subscription},
    game::{GameError, GameSettings, Session, SessionSnapshot, entities::PlayerId},
};
use chrono::{DateTime, Utc};
use std::{future, sync::Arc};
use tokio::{
    sync::mpsc,
    time::{Duration, Instant, interval, sleep_until},
};

const INBOX_CAPACITY: usize = 100;
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(5);

/// Lobby actor handle for sending messages
#[derive(Clone, Debug)]
pub struct LobbyHandle {
    sender: mpsc::Sender<LobbyMessage>,
    code: String,
}

impl LobbyHandle {
    pub fn new(sender: mpsc::Sender<LobbyMessage>, code: String) -> Self {
        Self { sender, code }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Send a message to the lobby
    pub async fn send(&self, message: LobbyMessage) -> LobbyResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| GameError::LobbyNotFound)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Lobby actor owning a single session, its subscribers and its timers
pub struct LobbyActor {
    session: Session,
    config: LobbyConfig,
    settings: GameSettings,
    inbox: mpsc::Receiver<LobbyMessage>,
    broadcaster: Broadcaster,
    /// Last snapshot sent out
    current: Arc<SessionSnapshot>,
    /// When the last subscriber left, if none are left
    idle_since: Option<DateTime<Utc>>,
    is_closed: bool,
}

impl LobbyActor {
    /// Create a new lobby actor around `session`
    pub fn new(session: Session, config: LobbyConfig) -> (Self, LobbyHandle) {
        let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);
        let code = session.code.clone();
        let current = Arc::new(session.snapshot());
        let idle_since = Some(session.created_at);

        let actor = Self {
            settings: config.game_settings(),
            broadcaster: Broadcaster::new(code.clone(), config.subscriber_buffer),
            session,
            config,
            inbox,
            current,
            idle_since,
            is_closed: false,
        };

        (actor, LobbyHandle::new(sender, code))
    }

    /// Run the lobby actor event loop
    pub async fn run(mut self) {
        log::info!("Lobby {} starting", self.session.code);

        let mut housekeeping = interval(HOUSEKEEPING_INTERVAL);

        loop {
            let wake = self.next_wake().map(to_instant);
            let timer = async move {
                match wake {
                    Some(at) => sleep_until(at).await,
                    None => future::pending().await,
                }
            };

            tokio::select! {
                message = self.inbox.recv() => match message {
                    Some(message) => self.handle_message(message),
                    None => break,
                },

                () = timer => self.on_timer(Utc::now()),

                _ = housekeeping.tick() => self.housekeeping(Utc::now()),
            }

            if self.is_closed {
                break;
            }
        }

        self.broadcaster.clear();
        log::info!("Lobby {} closed", self.session.code);
    }

    fn handle_message(&mut self, message: LobbyMessage) {
        match message {
            LobbyMessage::Join {
                name,
                player_id,
                response,
            } => {
                let result = self
                    .apply(|s, _, settings| s.join(&name, player_id.as_ref(), settings))
                    .map(|player_id| JoinAccepted {
                        player_id,
                        session: Arc::clone(&self.current),
                    });
                let _ = response.send(result);
            }

            LobbyMessage::GetSession { response } => {
                let _ = response.send(Ok(Arc::clone(&self.current)));
            }

            LobbyMessage::StartGame {
                requester,
                response,
            } => {
                let result = self.apply(|s, now, settings| s.start_game(&requester, now, settings));
                let _ = response.send(result.map(|()| Arc::clone(&self.current)));
            }

            LobbyMessage::RestartGame {
                requester,
                response,
            } => {
                let result = self.apply(|s, _, _| s.restart_game(&requester));
                let _ = response.send(result.map(|()| Arc::clone(&self.current)));
            }

            LobbyMessage::SubmitChoice {
                player,
                choice,
                round,
                response,
            } => {
                let result = self.apply(|s, now, settings| {
                    let id = resolve(s, &player, settings)?;
                    s.submit_guess(&id, &choice, round, now, settings)
                });
                let _ = response.send(result.map(|_| Arc::clone(&self.current)));
            }

            LobbyMessage::SubmitDistribution {
                player,
                allocations,
                response,
            } => {
                let result = self.apply(|s, _, settings| {
                    let id = resolve(s, &player, settings)?;
                    s.submit_distribution(&id, &allocations)
                });
                let _ = response.send(result.map(|()| Arc::clone(&self.current)));
            }

            LobbyMessage::RequestTapOut { player, response } => {
                let result = self.apply(|s, _, settings| {
                    let id = resolve(s, &player, settings)?;
                    s.request_tap_out(&id)
                });
                let _ = response.send(result.map(|()| Arc::clone(&self.current)));
            }

            LobbyMessage::Subscribe { identity, response } => {
                let result = self.handle_subscribe(identity);
                let _ = response.send(result);
            }

            LobbyMessage::Unsubscribe { subscriber_id } => {
                if self.broadcaster.unsubscribe(subscriber_id) && self.sync_connected() {
                    self.publish();
                }
                self.track_idle(Utc::now());
            }

            LobbyMessage::Shutdown {
                requester,
                response,
            } => {
                let grace = self.config.shutdown_grace();
                let result = self.apply(|s, now, _| s.close(&requester, now, grace));
                let _ = response.send(result.map(|()| Arc::clone(&self.current)));
            }

            LobbyMessage::Close { response } => {
                self.is_closed = true;
                let _ = response.send(());
            }
        }
    }

    /// Runs `op` against a copy of the session and commits it only if both
    /// the operation and the invariant check pass.
    fn apply<T>(
        &mut self,
        op: impl FnOnce(&mut Session, DateTime<Utc>, &GameSettings) -> Result<T, GameError>,
    ) -> LobbyResult<T> {
        let mut working = self.session.clone();
        let value = op(&mut working, Utc::now(), &self.settings)
            .and_then(|value| working.game.check_invariants().map(|()| value));

        match value {
            Ok(value) => {
                self.session = working;
                self.publish();
                Ok(value)
            }
            Err(err @ GameError::InvariantViolation(_)) => {
                log::error!(
                    "Lobby {}: {err}, resetting game",
                    self.session.code
                );
                self.session.reset_game();
                self.publish();
                Err(err)
            }
            Err(err) => {
                log::debug!("Lobby {}: rejected command: {err}", self.session.code);
                Err(err)
            }
        }
    }

    fn handle_subscribe(&mut self, identity: Option<ResumeToken>) -> LobbyResult<Subscription> {
        let player_id = match identity {
            Some(token) => {
                self.session.verify_identity(
                    &token.player_id,
                    &token.name,
                    self.settings.max_name_length,
                )?;
                Some(token.player_id)
            }
            None => None,
        };

        let subscription = self.broadcaster.subscribe(player_id);
        if self.sync_connected() {
            self.publish();
        } else {
            self.broadcaster
                .send_to(subscription.id, Arc::clone(&self.current));
            self.track_idle(Utc::now());
        }
        Ok(subscription)
    }

    /// Broadcast the committed session to every subscriber
    fn publish(&mut self) {
        self.sync_connected();
        loop {
            let snapshot = Arc::new(self.session.snapshot());
            self.current = Arc::clone(&snapshot);
            let dropped = self.broadcaster.publish(&snapshot);
            // Dropping a subscriber can disconnect a player, which is itself news.
            if dropped == 0 || !self.sync_connected() {
                break;
            }
        }
        self.track_idle(Utc::now());
    }

    /// Mirrors live verified subscriptions onto `Player::connected`.
    /// Returns whether anything changed.
    fn sync_connected(&mut self) -> bool {
        let connected = self.broadcaster.connected_players();
        let ids: Vec<PlayerId> = self.session.players.iter().map(|p| p.id.clone()).collect();
        let mut changed = false;
        for id in ids {
            changed |= self.session.set_connected(&id, connected.contains(&id));
        }
        changed
    }

    fn track_idle(&mut self, now: DateTime<Utc>) {
        if !self.broadcaster.is_empty() {
            self.idle_since = None;
        } else if self.idle_since.is_none() {
            log::debug!("Lobby {} has no subscribers", self.session.code);
            self.idle_since = Some(now);
        }
    }

    fn idle_deadline(&self) -> Option<DateTime<Utc>> {
        if self.session.is_shutting_down() {
            return None;
        }
        self.idle_since
            .map(|since| since + self.config.idle_close_after())
    }

    /// Earliest instant something is due: a game timer, idle close or teardown.
    fn next_wake(&self) -> Option<DateTime<Utc>> {
        let teardown = self
            .session
            .shutting_down_at
            .filter(|_| self.session.is_shutting_down());
        [
            self.session.game.next_deadline(),
            self.idle_deadline(),
            teardown,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn on_timer(&mut self, now: DateTime<Utc>) {
        if let Some(at) = self.session.shutting_down_at
            && self.session.is_shutting_down()
            && now >= at
        {
            log::info!("Lobby {} grace period over", self.session.code);
            self.is_closed = true;
            return;
        }

        if self.idle_deadline().is_some_and(|at| now >= at) {
            log::info!(
                "Lobby {} idle for {}s, shutting down",
                self.session.code,
                self.config.idle_close_after_secs
            );
            let grace = self.config.shutdown_grace();
            let _ = self.apply(|s, now, _| {
                s.begin_shutdown(now, grace);
                Ok(())
            });
            return;
        }

        if self.session.game.next_deadline().is_some_and(|at| now >= at) {
            let _ = self.apply(|s, now, settings| s.handle_deadline(now, settings));
        }
    }

    fn housekeeping(&mut self, now: DateTime<Utc>) {
        if self.broadcaster.prune_closed() > 0 && self.sync_connected() {
            self.publish();
        }
        self.track_idle(now);
    }
}

fn resolve(
    session: &Session,
    player: &PlayerRef,
    settings: &GameSettings,
) -> LobbyResult<PlayerId> {
    let limit = settings.max_name_length;
    match player {
        PlayerRef::Id(id) => session.resolve_player(Some(id), None, limit),
        PlayerRef::Nickname(name) => session.resolve_player(None, Some(name), limit),
    }
}

fn to_instant(at: DateTime<Utc>) -> Instant {
    let delay = (at - Utc::now()).to_std().unwrap_or_default();
    Instant::now() + delay
}
