//! Lobby actor message types.

use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::oneshot;

use crate::{
    broadcast::{ResumeToken, SubscriberId, Subscription},
    game::{GameError, SessionSnapshot, entities::PlayerId},
};

pub type LobbyResult<T> = Result<T, GameError>;
pub type SnapshotResponse = oneshot::Sender<LobbyResult<Arc<SessionSnapshot>>>;

/// How a command names the player it acts for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PlayerRef {
    Id(PlayerId),
    Nickname(String),
}

impl PlayerRef {
    /// Prefers the id when a client sends both.
    pub fn from_parts(player_id: Option<PlayerId>, nickname: Option<String>) -> Option<Self> {
        player_id
            .map(Self::Id)
            .or_else(|| nickname.map(Self::Nickname))
    }
}

#[derive(Clone, Debug)]
pub struct JoinAccepted {
    pub player_id: PlayerId,
    pub session: Arc<SessionSnapshot>,
}

/// Messages that can be sent to a LobbyActor
#[derive(Debug)]
pub enum LobbyMessage {
    /// Join, or rejoin under an existing id
    Join {
        name: String,
        player_id: Option<PlayerId>,
        response: oneshot::Sender<LobbyResult<JoinAccepted>>,
    },

    /// Current snapshot
    GetSession { response: SnapshotResponse },

    StartGame {
        requester: PlayerId,
        response: SnapshotResponse,
    },

    RestartGame {
        requester: PlayerId,
        response: SnapshotResponse,
    },

    /// Guess for the current round
    SubmitChoice {
        player: PlayerRef,
        choice: String,
        round: Option<u8>,
        response: SnapshotResponse,
    },

    SubmitDistribution {
        player: PlayerRef,
        allocations: BTreeMap<PlayerId, u32>,
        response: SnapshotResponse,
    },

    RequestTapOut {
        player: PlayerRef,
        response: SnapshotResponse,
    },

    /// Start receiving snapshots, optionally as a verified player
    Subscribe {
        identity: Option<ResumeToken>,
        response: oneshot::Sender<LobbyResult<Subscription>>,
    },

    Unsubscribe { subscriber_id: SubscriberId },

    /// Host-initiated graceful close
    Shutdown {
        requester: PlayerId,
        response: SnapshotResponse,
    },

    /// Tear down right away
    Close { response: oneshot::Sender<()> },
}
