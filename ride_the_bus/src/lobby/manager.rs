//! Lobby manager for spawning and addressing lobby actors by code.

use super::{
    actor::{LobbyActor, LobbyHandle},
    codes::{generate_code, normalize_code, random_host_name},
    config::LobbyConfig,
    messages::{JoinAccepted, LobbyMessage, LobbyResult, PlayerRef},
};
use crate::{
    broadcast::{ResumeToken, SnapshotFeed, SubscriberId, Subscription},
    game::{
        GameError, Session, SessionSnapshot,
        constants::MAX_CODE_GENERATION_ATTEMPTS,
        entities::{Player, PlayerId, sanitize_name},
    },
};
use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use tokio::sync::{RwLock, oneshot, watch};

/// A freshly opened lobby and the host's identity in it
#[derive(Debug, Clone)]
pub struct CreatedLobby {
    pub code: String,
    pub host_id: PlayerId,
    pub session: Arc<SessionSnapshot>,
}

/// Lobby manager for managing every live lobby
pub struct LobbyManager {
    config: LobbyConfig,

    /// Active lobby handles by normalized code
    lobbies: Arc<RwLock<HashMap<String, LobbyHandle>>>,

    /// Live lobby count, republished on every insert and removal
    count: Arc<watch::Sender<usize>>,
}

impl LobbyManager {
    pub fn new(config: LobbyConfig) -> Self {
        Self {
            config,
            lobbies: Arc::new(RwLock::new(HashMap::new())),
            count: Arc::new(watch::Sender::new(0)),
        }
    }

    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    /// Create and spawn a new lobby
    ///
    /// # Arguments
    ///
    /// * `host_name` - Display name for the host, random if absent or blank
    pub async fn create_lobby(&self, host_name: Option<&str>) -> LobbyResult<CreatedLobby> {
        let host_name = host_name
            .map(|name| sanitize_name(name, self.config.max_name_length))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(random_host_name);
        let host = Player::new(PlayerId::host(), host_name);
        let host_id = host.id.clone();

        // Hold the write lock across code selection so two creators can't
        // claim the same code.
        let mut lobbies = self.lobbies.write().await;
        let code = (0..MAX_CODE_GENERATION_ATTEMPTS)
            .map(|_| generate_code())
            .find(|candidate| !lobbies.contains_key(candidate))
            .ok_or_else(|| {
                GameError::InvariantViolation("unable to generate a unique lobby code".to_string())
            })?;

        let session = Session::new(code.clone(), host, Utc::now());
        let snapshot = Arc::new(session.snapshot());
        let (actor, handle) = LobbyActor::new(session, self.config.clone());
        lobbies.insert(code.clone(), handle);
        self.count.send_replace(lobbies.len());
        drop(lobbies);

        // Spawn actor task; its entry goes away when it stops
        let registry = Arc::clone(&self.lobbies);
        let count = Arc::clone(&self.count);
        let task_code = code.clone();
        tokio::spawn(async move {
            actor.run().await;
            let mut lobbies = registry.write().await;
            if lobbies.get(&task_code).is_some_and(LobbyHandle::is_closed) {
                lobbies.remove(&task_code);
                count.send_replace(lobbies.len());
            }
        });

        log::info!("Created lobby {code}");

        Ok(CreatedLobby {
            code,
            host_id,
            session: snapshot,
        })
    }

    /// Get a lobby handle by code, in any case and with stray whitespace
    pub async fn get_lobby(&self, code: &str) -> Option<LobbyHandle> {
        let lobbies = self.lobbies.read().await;
        lobbies.get(&normalize_code(code)).cloned()
    }

    pub async fn lobby_count(&self) -> usize {
        self.lobbies.read().await.len()
    }

    /// Follow the live lobby count. The value changes whenever a lobby is
    /// created, removed or reaped after closing on its own.
    pub fn watch_lobby_count(&self) -> watch::Receiver<usize> {
        self.count.subscribe()
    }

    /// Send a message built around a fresh oneshot and wait for the answer
    async fn request<T>(
        &self,
        code: &str,
        build: impl FnOnce(oneshot::Sender<LobbyResult<T>>) -> LobbyMessage,
    ) -> LobbyResult<T> {
        let handle = self
            .get_lobby(code)
            .await
            .ok_or(GameError::LobbyNotFound)?;

        let (tx, rx) = oneshot::channel();
        handle.send(build(tx)).await?;
        rx.await.map_err(|_| GameError::LobbyNotFound)?
    }

    pub async fn join_lobby(
        &self,
        code: &str,
        name: String,
        player_id: Option<PlayerId>,
    ) -> LobbyResult<JoinAccepted> {
        self.request(code, |response| LobbyMessage::Join {
            name,
            player_id,
            response,
        })
        .await
    }

    pub async fn get_session(&self, code: &str) -> LobbyResult<Arc<SessionSnapshot>> {
        self.request(code, |response| LobbyMessage::GetSession { response })
            .await
    }

    pub async fn start_game(
        &self,
        code: &str,
        requester: PlayerId,
    ) -> LobbyResult<Arc<SessionSnapshot>> {
        self.request(code, |response| LobbyMessage::StartGame {
            requester,
            response,
        })
        .await
    }

    pub async fn restart_game(
        &self,
        code: &str,
        requester: PlayerId,
    ) -> LobbyResult<Arc<SessionSnapshot>> {
        self.request(code, |response| LobbyMessage::RestartGame {
            requester,
            response,
        })
        .await
    }

    pub async fn submit_choice(
        &self,
        code: &str,
        player: PlayerRef,
        choice: String,
        round: Option<u8>,
    ) -> LobbyResult<Arc<SessionSnapshot>> {
        self.request(code, |response| LobbyMessage::SubmitChoice {
            player,
            choice,
            round,
            response,
        })
        .await
    }

    pub async fn submit_distribution(
        &self,
        code: &str,
        player: PlayerRef,
        allocations: BTreeMap<PlayerId, u32>,
    ) -> LobbyResult<Arc<SessionSnapshot>> {
        self.request(code, |response| LobbyMessage::SubmitDistribution {
            player,
            allocations,
            response,
        })
        .await
    }

    pub async fn request_tap_out(
        &self,
        code: &str,
        player: PlayerRef,
    ) -> LobbyResult<Arc<SessionSnapshot>> {
        self.request(code, |response| LobbyMessage::RequestTapOut { player, response })
            .await
    }

    /// Host-initiated close: the lobby announces `shutting_down` and is
    /// torn down once the grace period runs out.
    pub async fn close_lobby(
        &self,
        code: &str,
        requester: PlayerId,
    ) -> LobbyResult<Arc<SessionSnapshot>> {
        self.request(code, |response| LobbyMessage::Shutdown {
            requester,
            response,
        })
        .await
    }

    /// Tear a lobby down immediately
    pub async fn remove_lobby(&self, code: &str) -> LobbyResult<()> {
        let code = normalize_code(code);
        let handle = {
            let mut lobbies = self.lobbies.write().await;
            let handle = lobbies.remove(&code).ok_or(GameError::LobbyNotFound)?;
            self.count.send_replace(lobbies.len());
            handle
        };

        let (tx, rx) = oneshot::channel();
        if handle.send(LobbyMessage::Close { response: tx }).await.is_ok() {
            let _ = rx.await;
        }

        log::info!("Removed lobby {code}");
        Ok(())
    }
}

#[async_trait]
impl SnapshotFeed for LobbyManager {
    async fn subscribe(
        &self,
        code: &str,
        identity: Option<ResumeToken>,
    ) -> Result<Subscription, GameError> {
        self.request(code, |response| LobbyMessage::Subscribe { identity, response })
            .await
    }

    async fn unsubscribe(&self, code: &str, subscriber_id: SubscriberId) {
        if let Some(handle) = self.get_lobby(code).await {
            let _ = handle
                .send(LobbyMessage::Unsubscribe { subscriber_id })
                .await;
        }
    }
}

impl Default for LobbyManager {
    fn default() -> Self {
        Self::new(LobbyConfig::default())
    }
}
